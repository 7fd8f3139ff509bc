//! Message dispatch: user turn in, assistant turn out.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use proto::{ChatError, DeliveryStatus, FileAttachment, Message, MessageId, SessionId};
use tracing::{debug, error, info, warn};

use crate::responder::{ResponseRequest, Responder};
use crate::store::SessionStore;

/// Default bound on a single responder call.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

const SESSION_GONE: &str = "session deleted before reply";

/// Tunables for [`MessageDispatcher`]
#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    /// When no session is active, `false` only creates one and returns;
    /// `true` creates it and sends in the same call.
    pub send_on_create: bool,
    /// `None` waits on the responder forever.
    pub response_timeout: Option<Duration>,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            send_on_create: false,
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
        }
    }
}

/// Result of one [`MessageDispatcher::send_message`] call
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// No session was active; one was created and nothing was sent.
    SessionCreated(SessionId),
    /// User message and assistant reply were both appended.
    Replied {
        session_id: SessionId,
        message_id: MessageId,
        reply: Message,
    },
    /// The reply arrived after its session was deleted and was discarded.
    Dropped {
        session_id: SessionId,
        message_id: MessageId,
    },
    /// No reply was appended.
    Failed { error: ChatError },
}

/// Decrements the in-flight counter when a dispatch ends, however it ends.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Appends user messages to the active session and the responder's reply after them
pub struct MessageDispatcher {
    store: Arc<SessionStore>,
    responder: RwLock<Arc<dyn Responder>>,
    options: DispatcherOptions,
    in_flight: AtomicUsize,
    error: RwLock<Option<String>>,
    /// Keyed by user message; entries of deleted sessions are pruned on the next dispatch.
    deliveries: Mutex<HashMap<MessageId, Delivery>>,
}

struct Delivery {
    session_id: SessionId,
    status: DeliveryStatus,
}

impl MessageDispatcher {
    pub fn new(
        store: Arc<SessionStore>,
        responder: Arc<dyn Responder>,
        options: DispatcherOptions,
    ) -> Self {
        Self {
            store,
            responder: RwLock::new(responder),
            options,
            in_flight: AtomicUsize::new(0),
            error: RwLock::new(None),
            deliveries: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.options
    }

    /// Replaces the responder used by subsequent dispatches.
    pub fn set_responder(&self, responder: Arc<dyn Responder>) {
        info!(responder = responder.name(), "Responder switched");
        *self.responder.write() = responder;
    }

    /// True while at least one dispatch awaits its reply.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Most recent dispatch failure, cleared when the next dispatch starts.
    pub fn error(&self) -> Option<String> {
        self.error.read().clone()
    }

    pub fn clear_error(&self) {
        *self.error.write() = None;
    }

    pub fn delivery_status(&self, message_id: &MessageId) -> Option<DeliveryStatus> {
        self.deliveries
            .lock()
            .get(message_id)
            .map(|d| d.status.clone())
    }

    /// Sends a user message to the active session and waits for the reply.
    ///
    /// Errors never escape: they are reported in the outcome and stored in
    /// [`error`](Self::error).
    pub async fn send_message(
        &self,
        content: &str,
        attachments: Vec<FileAttachment>,
    ) -> DispatchOutcome {
        if content.trim().is_empty() && attachments.is_empty() {
            return self.fail(ChatError::Validation(
                "message must have content or attachments".to_string(),
            ));
        }

        let session_id = match self.store.active_session_id() {
            Some(id) => id,
            None => {
                let session = self.store.create_session();
                if !self.options.send_on_create {
                    info!(session_id = %session.id(), "No active session; created one without sending");
                    return DispatchOutcome::SessionCreated(session.id().clone());
                }
                session.id().clone()
            }
        };

        self.clear_error();
        self.prune_deliveries();
        let user_message = Message::user(content, attachments.clone());
        let message_id = user_message.id().clone();
        if let Err(e) = self.store.append_message(&session_id, user_message) {
            return self.fail(e);
        }

        let _guard = InFlight::enter(&self.in_flight);
        self.set_delivery(&session_id, &message_id, DeliveryStatus::Pending);

        let history = self
            .store
            .session(&session_id)
            .map(|s| s.messages().to_vec())
            .unwrap_or_default();
        let request = ResponseRequest {
            session_id: session_id.clone(),
            content: content.to_string(),
            attachments,
            history,
        };

        let responder = Arc::clone(&*self.responder.read());
        debug!(
            session_id = %session_id,
            message_id = %message_id,
            responder = responder.name(),
            "Dispatching message"
        );

        let result = match self.options.response_timeout {
            Some(limit) => tokio::time::timeout(limit, responder.respond(request))
                .await
                .unwrap_or(Err(ChatError::Timeout(limit.as_millis() as u64))),
            None => responder.respond(request).await,
        };

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                error!(session_id = %session_id, message_id = %message_id, error = %e, "Dispatch failed");
                self.set_delivery(&session_id, &message_id, DeliveryStatus::Failed(e.to_string()));
                return self.fail(e);
            }
        };

        let reply = Message::assistant(text);
        match self.store.append_message(&session_id, reply.clone()) {
            Ok(()) => {
                self.set_delivery(&session_id, &message_id, DeliveryStatus::Committed);
                DispatchOutcome::Replied {
                    session_id,
                    message_id,
                    reply,
                }
            }
            Err(ChatError::SessionNotFound(_)) => {
                warn!(session_id = %session_id, message_id = %message_id, "Reply dropped: session no longer exists");
                self.set_delivery(
                    &session_id,
                    &message_id,
                    DeliveryStatus::Failed(SESSION_GONE.to_string()),
                );
                DispatchOutcome::Dropped {
                    session_id,
                    message_id,
                }
            }
            Err(e) => {
                self.set_delivery(&session_id, &message_id, DeliveryStatus::Failed(e.to_string()));
                self.fail(e)
            }
        }
    }

    fn set_delivery(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        status: DeliveryStatus,
    ) {
        self.deliveries.lock().insert(
            message_id.clone(),
            Delivery {
                session_id: session_id.clone(),
                status,
            },
        );
    }

    /// Forgets settled deliveries whose session no longer exists.
    fn prune_deliveries(&self) {
        let mut deliveries = self.deliveries.lock();
        let before = deliveries.len();
        deliveries.retain(|_, d| d.status.is_pending() || self.store.contains(&d.session_id));
        let pruned = before - deliveries.len();
        if pruned > 0 {
            debug!(pruned, "Pruned deliveries of deleted sessions");
        }
    }

    fn fail(&self, error: ChatError) -> DispatchOutcome {
        *self.error.write() = Some(error.to_string());
        DispatchOutcome::Failed { error }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use proto::Role;

    use super::*;
    use crate::simulated::SimulatedResponder;

    struct MockResponder {
        queue: Mutex<VecDeque<Result<String, ChatError>>>,
    }

    impl MockResponder {
        fn new(replies: Vec<Result<String, ChatError>>) -> Self {
            Self {
                queue: Mutex::new(VecDeque::from(replies)),
            }
        }
    }

    #[async_trait]
    impl Responder for MockResponder {
        fn name(&self) -> &str {
            "mock"
        }

        async fn respond(&self, _req: ResponseRequest) -> Result<String, ChatError> {
            self.queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::Responder("no mock reply left".to_string())))
        }
    }

    struct SlowResponder {
        delay: Duration,
    }

    #[async_trait]
    impl Responder for SlowResponder {
        fn name(&self) -> &str {
            "slow"
        }

        async fn respond(&self, req: ResponseRequest) -> Result<String, ChatError> {
            tokio::time::sleep(self.delay).await;
            Ok(format!("late reply to {}", req.content))
        }
    }

    fn dispatcher(responder: Arc<dyn Responder>, options: DispatcherOptions) -> MessageDispatcher {
        MessageDispatcher::new(Arc::new(SessionStore::new()), responder, options)
    }

    #[tokio::test]
    async fn first_send_without_active_session_only_creates_it() {
        let d = dispatcher(
            Arc::new(SimulatedResponder::instant()),
            DispatcherOptions::default(),
        );

        let outcome = d.send_message("Hello", Vec::new()).await;
        let DispatchOutcome::SessionCreated(session_id) = outcome else {
            panic!("expected session creation, got {outcome:?}");
        };
        assert_eq!(d.store().active_session_id(), Some(session_id.clone()));
        assert!(d.store().session(&session_id).expect("session").is_empty());

        let outcome = d.send_message("What next?", Vec::new()).await;
        assert!(matches!(outcome, DispatchOutcome::Replied { .. }));
        let session = d.store().session(&session_id).expect("session");
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(session.messages()[0].content(), "What next?");
        assert_eq!(session.title(), "What next?");
    }

    #[tokio::test]
    async fn send_on_create_sends_in_the_same_call() {
        let d = dispatcher(
            Arc::new(MockResponder::new(vec![Ok("hi there".to_string())])),
            DispatcherOptions {
                send_on_create: true,
                ..Default::default()
            },
        );

        let outcome = d.send_message("Hello", Vec::new()).await;
        let DispatchOutcome::Replied {
            session_id, reply, ..
        } = outcome
        else {
            panic!("expected reply, got {outcome:?}");
        };
        assert_eq!(reply.content(), "hi there");
        assert_eq!(d.store().session(&session_id).expect("session").messages().len(), 2);
    }

    #[tokio::test]
    async fn successful_dispatch_commits_delivery_and_clears_loading() {
        let d = dispatcher(
            Arc::new(MockResponder::new(vec![Ok("answer".to_string())])),
            DispatcherOptions::default(),
        );
        d.store().create_session();

        let outcome = d.send_message("question", Vec::new()).await;
        let DispatchOutcome::Replied { message_id, .. } = outcome else {
            panic!("expected reply, got {outcome:?}");
        };
        assert_eq!(d.delivery_status(&message_id), Some(DeliveryStatus::Committed));
        assert!(!d.is_loading());
        assert!(d.error().is_none());
    }

    #[tokio::test]
    async fn responder_failure_surfaces_error_without_assistant_message() {
        let d = dispatcher(
            Arc::new(MockResponder::new(vec![Err(ChatError::Responder(
                "backend down".to_string(),
            ))])),
            DispatcherOptions::default(),
        );
        let session = d.store().create_session();

        let outcome = d.send_message("question", Vec::new()).await;
        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        assert!(d.error().expect("error").contains("backend down"));
        assert!(!d.is_loading());

        let stored = d.store().session(session.id()).expect("session");
        assert_eq!(stored.messages().len(), 1);
        assert_eq!(stored.messages()[0].role(), Role::User);
        let status = d
            .delivery_status(stored.messages()[0].id())
            .expect("delivery");
        assert!(matches!(status, DeliveryStatus::Failed(_)));
    }

    #[tokio::test]
    async fn next_dispatch_clears_previous_error() {
        let d = dispatcher(
            Arc::new(MockResponder::new(vec![
                Err(ChatError::Responder("flaky".to_string())),
                Ok("recovered".to_string()),
            ])),
            DispatcherOptions::default(),
        );
        d.store().create_session();

        d.send_message("one", Vec::new()).await;
        assert!(d.error().is_some());
        d.send_message("two", Vec::new()).await;
        assert!(d.error().is_none());
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_mutation() {
        let d = dispatcher(
            Arc::new(SimulatedResponder::instant()),
            DispatcherOptions::default(),
        );

        let outcome = d.send_message("   ", Vec::new()).await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Failed {
                error: ChatError::Validation(_)
            }
        ));
        assert!(d.store().is_empty());
        assert!(d.error().is_some());
    }

    #[tokio::test]
    async fn attachments_alone_are_enough_to_send() {
        let d = dispatcher(
            Arc::new(SimulatedResponder::instant()),
            DispatcherOptions::default(),
        );
        d.store().create_session();

        let files = vec![FileAttachment::new("q3.csv", "text/csv", 64, "/files/q3.csv")];
        let outcome = d.send_message("", files).await;
        let DispatchOutcome::Replied { reply, .. } = outcome else {
            panic!("expected reply, got {outcome:?}");
        };
        assert!(reply.content().contains("q3.csv"));
    }

    #[tokio::test]
    async fn slow_responder_times_out() {
        let d = dispatcher(
            Arc::new(SlowResponder {
                delay: Duration::from_secs(5),
            }),
            DispatcherOptions {
                response_timeout: Some(Duration::from_millis(50)),
                ..Default::default()
            },
        );
        d.store().create_session();

        let outcome = d.send_message("anyone?", Vec::new()).await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Failed {
                error: ChatError::Timeout(50)
            }
        ));
        assert_eq!(d.error().as_deref(), Some("No response after 50ms"));
        assert!(!d.is_loading());
    }

    #[tokio::test]
    async fn reply_for_deleted_session_is_dropped() {
        let d = Arc::new(dispatcher(
            Arc::new(SlowResponder {
                delay: Duration::from_millis(100),
            }),
            DispatcherOptions::default(),
        ));
        let session = d.store().create_session();

        let task = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.send_message("hello", Vec::new()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(d.is_loading());
        d.store().delete_session(session.id()).expect("delete");

        let outcome = task.await.expect("join");
        let DispatchOutcome::Dropped { message_id, .. } = outcome else {
            panic!("expected dropped reply, got {outcome:?}");
        };
        assert_eq!(
            d.delivery_status(&message_id),
            Some(DeliveryStatus::Failed(SESSION_GONE.to_string()))
        );
        assert!(d.store().is_empty());
        assert!(!d.is_loading());
    }

    #[tokio::test]
    async fn concurrent_dispatches_keep_loading_until_last_finishes() {
        let d = Arc::new(dispatcher(
            Arc::new(SlowResponder {
                delay: Duration::from_millis(60),
            }),
            DispatcherOptions::default(),
        ));
        let session = d.store().create_session();

        let first = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.send_message("a", Vec::new()).await }
        });
        let second = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.send_message("b", Vec::new()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(d.is_loading());

        first.await.expect("join");
        second.await.expect("join");
        assert!(!d.is_loading());
        assert_eq!(d.store().session(session.id()).expect("session").messages().len(), 4);
    }

    #[tokio::test]
    async fn deliveries_of_deleted_sessions_are_forgotten() {
        let d = dispatcher(
            Arc::new(MockResponder::new(vec![
                Ok("one".to_string()),
                Ok("two".to_string()),
                Ok("three".to_string()),
            ])),
            DispatcherOptions::default(),
        );
        let doomed = d.store().create_session();
        let DispatchOutcome::Replied { message_id: old, .. } =
            d.send_message("a", Vec::new()).await
        else {
            panic!("expected reply");
        };
        let kept_session = d.store().create_session();
        let DispatchOutcome::Replied { message_id: kept, .. } =
            d.send_message("b", Vec::new()).await
        else {
            panic!("expected reply");
        };
        d.store().delete_session(doomed.id()).expect("delete");
        assert_eq!(d.delivery_status(&old), Some(DeliveryStatus::Committed));

        d.store().select_session(kept_session.id()).expect("select");
        d.send_message("c", Vec::new()).await;

        assert_eq!(d.delivery_status(&old), None);
        assert_eq!(d.delivery_status(&kept), Some(DeliveryStatus::Committed));
    }

    #[tokio::test]
    async fn set_responder_applies_to_next_dispatch() {
        let d = dispatcher(
            Arc::new(MockResponder::new(Vec::new())),
            DispatcherOptions::default(),
        );
        d.store().create_session();
        d.set_responder(Arc::new(MockResponder::new(vec![Ok("swapped".to_string())])));

        let outcome = d.send_message("hi", Vec::new()).await;
        let DispatchOutcome::Replied { reply, .. } = outcome else {
            panic!("expected reply, got {outcome:?}");
        };
        assert_eq!(reply.content(), "swapped");
    }
}
