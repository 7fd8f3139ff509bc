//! Chat session: a conversation thread with an append-only message log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Message, SessionId};

/// Title given to a session before its first message arrives.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";
/// Maximum number of characters taken from the first message for the title.
pub const TITLE_MAX_CHARS: usize = 50;

/// A single conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    title: String,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session titled "New Chat".
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a message, refreshing `updated_at` and deriving the title from
    /// the first message.
    ///
    /// `updated_at` never moves backwards even if the wall clock does.
    pub fn push_message(&mut self, message: Message) {
        if self.messages.is_empty() {
            self.title = title_from_content(message.content());
        }
        self.messages.push(message);
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the first [`TITLE_MAX_CHARS`] characters of `content`.
pub fn title_from_content(content: &str) -> String {
    content.chars().take(TITLE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_empty_with_default_title() {
        let session = Session::new();
        assert!(session.is_empty());
        assert_eq!(session.title(), DEFAULT_SESSION_TITLE);
        assert_eq!(session.created_at(), session.updated_at());
    }

    #[test]
    fn first_message_sets_title_and_second_keeps_it() {
        let mut session = Session::new();
        session.push_message(Message::user("What were Q3 sales by region?", Vec::new()));
        assert_eq!(session.title(), "What were Q3 sales by region?");

        session.push_message(Message::assistant("Here is the breakdown"));
        assert_eq!(session.title(), "What were Q3 sales by region?");
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn title_is_truncated_by_characters_not_bytes() {
        let long: String = "é".repeat(80);
        let title = title_from_content(&long);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);

        let short = title_from_content("hi");
        assert_eq!(short, "hi");
    }

    #[test]
    fn updated_at_never_precedes_created_at() {
        let mut session = Session::new();
        for i in 0..5 {
            let before = session.updated_at();
            session.push_message(Message::user(format!("m{i}"), Vec::new()));
            assert!(session.updated_at() >= before);
            assert!(session.updated_at() >= session.created_at());
        }
    }
}
