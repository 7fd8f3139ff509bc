use serde::{Deserialize, Serialize};

use crate::message::{MessageId, Role, SessionId};

/// Default label shown while a navigation transition is in progress.
pub const DEFAULT_LOADING_TEXT: &str = "Loading...";

/// Change notification published by the session store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new session was inserted at the head of the list.
    Created { session_id: SessionId },
    /// The active session changed.
    Selected { session_id: SessionId },
    /// A session was removed; `was_active` tells whether selection was cleared.
    Deleted {
        session_id: SessionId,
        was_active: bool,
    },
    /// A message was appended to a session.
    MessageAppended {
        session_id: SessionId,
        message_id: MessageId,
        role: Role,
    },
}

impl SessionEvent {
    /// Session the event refers to.
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::Created { session_id }
            | Self::Selected { session_id }
            | Self::Deleted { session_id, .. }
            | Self::MessageAppended { session_id, .. } => session_id,
        }
    }
}

/// Delivery state of a dispatched user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Waiting for the assistant reply.
    Pending,
    /// Reply appended to the session.
    Committed,
    /// No reply will arrive.
    Failed(String),
}

impl DeliveryStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Navigation transition indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationLoadingState {
    pub is_loading: bool,
    pub loading_text: String,
}

impl Default for NavigationLoadingState {
    fn default() -> Self {
        Self {
            is_loading: false,
            loading_text: DEFAULT_LOADING_TEXT.to_string(),
        }
    }
}
