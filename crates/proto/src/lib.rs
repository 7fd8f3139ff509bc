//! Shared types for the chat client core.
//!
//! This crate defines the serializable session/message/user model and
//! strongly-typed error enums shared across the workspace.

pub mod error;
pub mod event;
pub mod message;
pub mod session;
pub mod user;

/// Re-export of all error types.
pub use error::*;
/// Re-export of change notifications and UI state snapshots.
pub use event::{DEFAULT_LOADING_TEXT, DeliveryStatus, NavigationLoadingState, SessionEvent};
/// Re-export of message identity types.
pub use message::{FileAttachment, Message, MessageId, Role, SessionId};
/// Re-export of the session model.
pub use session::{DEFAULT_SESSION_TITLE, Session, TITLE_MAX_CHARS, title_from_content};
/// Re-export of user identity and auth payloads.
pub use user::{
    AuthState, LoginCredentials, PasswordUpdate, ProfileUpdate, RegisterData, UserProfile,
    UserRole, UserStatus,
};
