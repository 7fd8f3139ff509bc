//! Offline responder that fakes a thinking delay and answers with canned text.

use std::time::Duration;

use async_trait::async_trait;
use proto::{ChatError, FileAttachment};
use rand::Rng;
use tracing::debug;

use crate::responder::{ResponseRequest, Responder};

pub const DEFAULT_MIN_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 3_000;

const LEAD_SENTENCES: [&str; 5] = [
    "That's a great question! Let me help you with that.",
    "I understand what you're looking for. Here's my analysis:",
    "Based on your input, I can provide several insights:",
    "Let me break this down for you step by step:",
    "That's an interesting challenge. Here's how I would approach it:",
];

const FOLLOW_UP: &str =
    "I can help you explore this topic further. What specific aspect would you like to dive deeper into?";

/// Answers after a random delay in `[min_delay, max_delay]`
#[derive(Debug, Clone)]
pub struct SimulatedResponder {
    min_delay: Duration,
    max_delay: Duration,
}

impl SimulatedResponder {
    /// Bounds are swapped when given in the wrong order.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        if min_delay <= max_delay {
            Self {
                min_delay,
                max_delay,
            }
        } else {
            Self {
                min_delay: max_delay,
                max_delay: min_delay,
            }
        }
    }

    /// No delay at all.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    fn pick(&self) -> (Duration, &'static str) {
        let mut rng = rand::thread_rng();
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        let delay = Duration::from_millis(rng.gen_range(min..=max));
        let lead = LEAD_SENTENCES[rng.gen_range(0..LEAD_SENTENCES.len())];
        (delay, lead)
    }
}

impl Default for SimulatedResponder {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        )
    }
}

#[async_trait]
impl Responder for SimulatedResponder {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn respond(&self, req: ResponseRequest) -> Result<String, ChatError> {
        let (delay, lead) = self.pick();
        debug!(
            session_id = %req.session_id,
            delay_ms = delay.as_millis() as u64,
            "Simulating reply"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(compose_reply(lead, &req.content, &req.attachments))
    }
}

/// Canned reply echoing the user's text and naming each attachment.
pub fn compose_reply(lead: &str, content: &str, attachments: &[FileAttachment]) -> String {
    let mut reply = format!("{lead}\n\nRegarding: \"{content}\"");
    if !attachments.is_empty() {
        let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
        reply.push_str(&format!("\n\nAttached files: {}", names.join(", ")));
    }
    reply.push_str("\n\n");
    reply.push_str(FOLLOW_UP);
    reply
}

#[cfg(test)]
mod tests {
    use proto::SessionId;

    use super::*;

    fn request(content: &str, attachments: Vec<FileAttachment>) -> ResponseRequest {
        ResponseRequest {
            session_id: SessionId::from("s1"),
            content: content.to_string(),
            attachments,
            history: Vec::new(),
        }
    }

    #[test]
    fn reply_echoes_content_and_lists_attachments() {
        let files = vec![
            FileAttachment::new("sales.csv", "text/csv", 120, "/files/sales.csv"),
            FileAttachment::new("chart.png", "image/png", 4096, "/files/chart.png"),
        ];
        let reply = compose_reply(LEAD_SENTENCES[0], "Summarize Q3", &files);
        assert!(reply.starts_with(LEAD_SENTENCES[0]));
        assert!(reply.contains("Regarding: \"Summarize Q3\""));
        assert!(reply.contains("Attached files: sales.csv, chart.png"));
        assert!(reply.ends_with(FOLLOW_UP));
    }

    #[test]
    fn reply_without_attachments_has_no_file_line() {
        let reply = compose_reply(LEAD_SENTENCES[1], "hi", &[]);
        assert!(!reply.contains("Attached files"));
    }

    #[test]
    fn new_orders_bounds() {
        let responder =
            SimulatedResponder::new(Duration::from_millis(300), Duration::from_millis(100));
        assert_eq!(responder.min_delay, Duration::from_millis(100));
        assert_eq!(responder.max_delay, Duration::from_millis(300));
    }

    #[tokio::test]
    async fn instant_responder_uses_a_canned_lead() {
        let reply = SimulatedResponder::instant()
            .respond(request("Hello", Vec::new()))
            .await
            .expect("reply");
        assert!(LEAD_SENTENCES.iter().any(|lead| reply.starts_with(lead)));
        assert!(reply.contains("\"Hello\""));
    }

    #[tokio::test]
    async fn delay_stays_within_bounds() {
        let responder =
            SimulatedResponder::new(Duration::from_millis(20), Duration::from_millis(40));
        let started = tokio::time::Instant::now();
        responder
            .respond(request("ping", Vec::new()))
            .await
            .expect("reply");
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
