use thiserror::Error;

use crate::message::SessionId;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// REST collaborator errors (unreachable server or non-2xx response)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Server rejected the caller's identity (401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Requested resource does not exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected schema.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Request exceeded the configured timeout.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Credentials were rejected by the auth collaborator.
    #[error("Authentication failed: {0}")]
    InvalidCredentials(String),

    /// Input was rejected before reaching the network.
    #[error("{0}")]
    Validation(String),

    /// Operation requires a logged-in user.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Collaborator call failed.
    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Chat session and dispatch errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Referenced session is not in the store.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Message input was rejected before dispatch.
    #[error("Invalid message: {0}")]
    Validation(String),

    /// Response-producing collaborator failed.
    #[error("Responder failed: {0}")]
    Responder(String),

    /// Remote chat API failure.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Responder did not answer within the given milliseconds.
    #[error("No response after {0}ms")]
    Timeout(u64),
}

/// Internal proto errors
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Invalid role string value.
    #[error("Invalid role: {0}")]
    InvalidRole(String),
}
