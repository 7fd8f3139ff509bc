use api::{ChatApi, CompletionMessage, CompletionRequest};
use async_trait::async_trait;
use proto::ChatError;
use tracing::{debug, error};

use crate::responder::{ResponseRequest, Responder};

/// Delegates replies to the remote chat completion endpoint
pub struct RemoteResponder {
    api: ChatApi,
}

impl RemoteResponder {
    pub fn new(api: ChatApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Responder for RemoteResponder {
    fn name(&self) -> &str {
        "remote"
    }

    async fn respond(&self, req: ResponseRequest) -> Result<String, ChatError> {
        let request = CompletionRequest {
            message: req.content,
            session_id: req.session_id.to_string(),
            attachments: req.attachments,
            messages: req.history.iter().map(CompletionMessage::from).collect(),
        };
        let response = self.api.complete(&request).await.map_err(|e| {
            error!(session_id = %request.session_id, error = %e, "Completion request failed");
            ChatError::from(e)
        })?;

        if response.content.trim().is_empty() {
            return Err(ChatError::Responder(
                "remote API returned an empty reply".to_string(),
            ));
        }
        debug!(
            session_id = %request.session_id,
            chars = response.content.chars().count(),
            "Completion received"
        );
        Ok(response.content)
    }
}
