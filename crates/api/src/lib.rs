//! REST collaborator plumbing for the chat client.

pub mod chat;
pub mod client;
pub mod endpoints;

/// Chat/message resource client and its models.
pub use chat::{
    ChatApi, ChatForm, ChatModel, ChatQuery, ChatUpdateForm, CompletionMessage, CompletionRequest,
    CompletionResponse, DEFAULT_MESSAGE_PAGE, MessageForm, MessageModel, MessageQuery,
    MessageRole,
};
/// Shared HTTP client.
pub use client::{ApiClient, ApiSettings, DEFAULT_PREFIX, DEFAULT_TIMEOUT_MS};
