//! Response-producing collaborators used by the dispatcher.

use async_trait::async_trait;
use proto::{ChatError, FileAttachment, Message, SessionId};

/// Input handed to a [`Responder`] for one user turn
#[derive(Debug, Clone)]
pub struct ResponseRequest {
    /// Session the reply will be appended to.
    pub session_id: SessionId,
    /// Text the user just sent.
    pub content: String,
    /// Files attached to the user message.
    pub attachments: Vec<FileAttachment>,
    /// Conversation so far, including the user message.
    pub history: Vec<Message>,
}

/// Produces the assistant text for a user message
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn respond(&self, req: ResponseRequest) -> Result<String, ChatError>;
}
