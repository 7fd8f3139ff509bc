//! Endpoint paths, relative to the configured API prefix.

/// Authentication endpoints.
pub mod auth {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const LOGOUT: &str = "/auth/logout";
    pub const ME: &str = "/auth/me";
    pub const PROFILE: &str = "/auth/me/profile";
    pub const PASSWORD: &str = "/auth/me/password";
}

pub const CHATS: &str = "/chats";
pub const MESSAGES: &str = "/messages";
/// Single-turn completion used by the remote responder.
pub const COMPLETION: &str = "/chat";

pub fn chat_by_id(id: &str) -> String {
    format!("{CHATS}/{id}")
}

pub fn chat_messages(chat_id: &str) -> String {
    format!("{CHATS}/{chat_id}/messages")
}
