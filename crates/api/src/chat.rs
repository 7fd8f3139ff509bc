//! Chat and message resources of the remote chat API.

use std::sync::Arc;

use proto::{ApiError, FileAttachment};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::endpoints;

/// Default page size for [`ChatApi::chat_messages`].
pub const DEFAULT_MESSAGE_PAGE: u32 = 50;

// ── Resource models ───────────────────────────────────────────────────────────

/// Chat thread as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatModel {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Opaque client-defined payload.
    #[serde(default)]
    pub chat: Value,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatForm {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatUpdateForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

/// Filters for listing chats.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

/// Author of a stored message. The backend also stores system prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl From<proto::Role> for MessageRole {
    fn from(role: proto::Role) -> Self {
        match role {
            proto::Role::User => Self::User,
            proto::Role::Assistant => Self::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageModel {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub content: String,
    pub role: MessageRole,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub content: String,
    pub role: MessageRole,
}

/// Filters for listing messages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Acknowledgement returned by delete endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: String,
}

/// One prior turn sent as completion context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<&proto::Message> for CompletionMessage {
    fn from(message: &proto::Message) -> Self {
        Self {
            role: message.role().into(),
            content: message.content().to_string(),
        }
    }
}

/// Completion request for the latest user turn.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub message: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<FileAttachment>,
    /// Conversation so far, oldest first, ending with the latest user turn.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<CompletionMessage>,
}

/// Assistant text produced for a [`CompletionRequest`].
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(alias = "response", alias = "reply")]
    pub content: String,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Typed wrapper over the chat/message endpoints.
#[derive(Clone)]
pub struct ChatApi {
    client: Arc<ApiClient>,
}

impl ChatApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list_chats(&self, query: &ChatQuery) -> Result<Vec<ChatModel>, ApiError> {
        self.client.get_with_query(endpoints::CHATS, query).await
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<ChatModel, ApiError> {
        self.client.get(&endpoints::chat_by_id(chat_id)).await
    }

    pub async fn create_chat(&self, form: &ChatForm) -> Result<ChatModel, ApiError> {
        self.client.post(endpoints::CHATS, form).await
    }

    pub async fn update_chat(
        &self,
        chat_id: &str,
        form: &ChatUpdateForm,
    ) -> Result<ChatModel, ApiError> {
        self.client
            .patch(&endpoints::chat_by_id(chat_id), form)
            .await
    }

    pub async fn delete_chat(&self, chat_id: &str) -> Result<DeleteResponse, ApiError> {
        self.client.delete(&endpoints::chat_by_id(chat_id)).await
    }

    pub async fn list_messages(&self, query: &MessageQuery) -> Result<Vec<MessageModel>, ApiError> {
        self.client.get_with_query(endpoints::MESSAGES, query).await
    }

    pub async fn create_message(&self, form: &MessageForm) -> Result<MessageModel, ApiError> {
        self.client.post(endpoints::MESSAGES, form).await
    }

    /// Messages of one chat, oldest first as returned by the backend.
    pub async fn chat_messages(
        &self,
        chat_id: &str,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<MessageModel>, ApiError> {
        let query = MessageQuery {
            skip: Some(skip),
            limit: Some(limit),
            ..Default::default()
        };
        self.client
            .get_with_query(&endpoints::chat_messages(chat_id), &query)
            .await
    }

    /// Asks the backend for an assistant reply to one user message.
    pub async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, ApiError> {
        debug!(
            session_id = %req.session_id,
            attachments = req.attachments.len(),
            "Requesting completion"
        );
        self.client.post(endpoints::COMPLETION, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_response_accepts_alternate_field_names() {
        let a: CompletionResponse =
            serde_json::from_str(r#"{"content":"hi"}"#).expect("content");
        let b: CompletionResponse =
            serde_json::from_str(r#"{"response":"hi"}"#).expect("response");
        assert_eq!(a.content, b.content);
    }

    #[test]
    fn chat_query_omits_unset_filters() {
        let query = ChatQuery {
            limit: Some(10),
            ..Default::default()
        };
        let json = serde_json::to_value(&query).expect("serialize");
        assert_eq!(json, serde_json::json!({"limit": 10}));
    }

    #[test]
    fn message_role_maps_from_chat_role() {
        assert_eq!(MessageRole::from(proto::Role::User), MessageRole::User);
        assert_eq!(
            MessageRole::from(proto::Role::Assistant),
            MessageRole::Assistant
        );
    }
}
