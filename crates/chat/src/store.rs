use parking_lot::RwLock;
use proto::{ChatError, Message, Session, SessionEvent, SessionId};
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 256;

#[derive(Default)]
struct StoreState {
    /// Newest first.
    sessions: Vec<Session>,
    active: Option<SessionId>,
}

impl StoreState {
    fn position(&self, id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }
}

/// In-memory list of chat sessions plus the active selection
pub struct SessionStore {
    state: RwLock<StoreState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            events,
        }
    }

    /// Creates an empty session at the head of the list and makes it active.
    pub fn create_session(&self) -> Session {
        let session = Session::new();
        {
            let mut state = self.state.write();
            state.sessions.insert(0, session.clone());
            state.active = Some(session.id().clone());
        }
        info!(session_id = %session.id(), "Session created");
        self.publish(SessionEvent::Created {
            session_id: session.id().clone(),
        });
        session
    }

    /// Makes `id` the active session.
    ///
    /// Unknown ids leave the selection untouched.
    pub fn select_session(&self, id: &SessionId) -> Result<(), ChatError> {
        {
            let mut state = self.state.write();
            if state.position(id).is_none() {
                return Err(ChatError::SessionNotFound(id.clone()));
            }
            state.active = Some(id.clone());
        }
        debug!(session_id = %id, "Session selected");
        self.publish(SessionEvent::Selected {
            session_id: id.clone(),
        });
        Ok(())
    }

    /// Removes a session. Deleting the active session clears the selection;
    /// no other session is selected in its place.
    pub fn delete_session(&self, id: &SessionId) -> Result<(), ChatError> {
        let was_active = {
            let mut state = self.state.write();
            let idx = state
                .position(id)
                .ok_or_else(|| ChatError::SessionNotFound(id.clone()))?;
            state.sessions.remove(idx);
            let was_active = state.active.as_ref() == Some(id);
            if was_active {
                state.active = None;
            }
            was_active
        };
        info!(session_id = %id, was_active, "Session deleted");
        self.publish(SessionEvent::Deleted {
            session_id: id.clone(),
            was_active,
        });
        Ok(())
    }

    /// Appends a message to the session's log.
    pub fn append_message(&self, id: &SessionId, message: Message) -> Result<(), ChatError> {
        let message_id = message.id().clone();
        let role = message.role();
        {
            let mut state = self.state.write();
            let idx = state
                .position(id)
                .ok_or_else(|| ChatError::SessionNotFound(id.clone()))?;
            state.sessions[idx].push_message(message);
        }
        debug!(session_id = %id, message_id = %message_id, %role, "Message appended");
        self.publish(SessionEvent::MessageAppended {
            session_id: id.clone(),
            message_id,
            role,
        });
        Ok(())
    }

    /// Snapshot of every session, newest first.
    pub fn sessions(&self) -> Vec<Session> {
        self.state.read().sessions.clone()
    }

    pub fn session(&self, id: &SessionId) -> Option<Session> {
        let state = self.state.read();
        state.position(id).map(|idx| state.sessions[idx].clone())
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.state.read().position(id).is_some()
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.state.read().active.clone()
    }

    pub fn active_session(&self) -> Option<Session> {
        let state = self.state.read();
        let id = state.active.as_ref()?;
        state.position(id).map(|idx| state.sessions[idx].clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().sessions.is_empty()
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proto::{DEFAULT_SESSION_TITLE, Role};

    use super::*;

    #[test]
    fn created_sessions_are_unique_and_latest_is_active() {
        let store = SessionStore::new();
        let mut ids = HashSet::new();
        for _ in 0..20 {
            let session = store.create_session();
            assert!(ids.insert(session.id().clone()));
            assert_eq!(store.active_session_id().as_ref(), Some(session.id()));
        }
        assert_eq!(store.len(), 20);
    }

    #[test]
    fn new_sessions_are_inserted_at_head() {
        let store = SessionStore::new();
        let first = store.create_session();
        let second = store.create_session();
        let ids: Vec<_> = store.sessions().iter().map(|s| s.id().clone()).collect();
        assert_eq!(ids, vec![second.id().clone(), first.id().clone()]);
        assert_eq!(second.title(), DEFAULT_SESSION_TITLE);
    }

    #[test]
    fn contains_tracks_creation_and_deletion() {
        let store = SessionStore::new();
        let session = store.create_session();
        assert!(store.contains(session.id()));
        store.delete_session(session.id()).expect("delete");
        assert!(!store.contains(session.id()));
    }

    #[test]
    fn deleting_active_session_clears_selection() {
        let store = SessionStore::new();
        let older = store.create_session();
        let active = store.create_session();

        store.delete_session(active.id()).expect("delete");
        assert_eq!(store.active_session_id(), None);
        assert!(store.active_session().is_none());
        assert!(store.session(older.id()).is_some());
    }

    #[test]
    fn deleting_other_session_keeps_active() {
        let store = SessionStore::new();
        let other = store.create_session();
        let active = store.create_session();

        store.delete_session(other.id()).expect("delete");
        assert_eq!(store.active_session_id().as_ref(), Some(active.id()));
    }

    #[test]
    fn missing_session_operations_fail_without_mutation() {
        let store = SessionStore::new();
        let active = store.create_session();
        let ghost = SessionId::from("ghost");

        assert_eq!(
            store.select_session(&ghost),
            Err(ChatError::SessionNotFound(ghost.clone()))
        );
        assert!(store.delete_session(&ghost).is_err());
        assert!(
            store
                .append_message(&ghost, Message::user("hi", Vec::new()))
                .is_err()
        );
        assert_eq!(store.active_session_id().as_ref(), Some(active.id()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn select_switches_active_session() {
        let store = SessionStore::new();
        let first = store.create_session();
        store.create_session();

        store.select_session(first.id()).expect("select");
        assert_eq!(store.active_session_id().as_ref(), Some(first.id()));
    }

    #[test]
    fn first_append_sets_truncated_title_and_later_appends_keep_it() {
        let store = SessionStore::new();
        let session = store.create_session();
        let long = "x".repeat(80);

        store
            .append_message(session.id(), Message::user(long.clone(), Vec::new()))
            .expect("append");
        store
            .append_message(session.id(), Message::assistant("a different title?"))
            .expect("append");

        let stored = store.session(session.id()).expect("session");
        assert_eq!(stored.title(), &long[..50]);
    }

    #[test]
    fn append_keeps_order_and_moves_updated_at_forward() {
        let store = SessionStore::new();
        let session = store.create_session();
        let mut previous = session.updated_at();
        let mut expected = Vec::new();

        for i in 0..10 {
            let message = Message::user(format!("message {i}"), Vec::new());
            expected.push(message.id().clone());
            store.append_message(session.id(), message).expect("append");
            let updated = store.session(session.id()).expect("session").updated_at();
            assert!(updated >= previous);
            previous = updated;
        }

        let stored = store.session(session.id()).expect("session");
        let ids: Vec<_> = stored.messages().iter().map(|m| m.id().clone()).collect();
        assert_eq!(ids, expected);
        assert!(stored.updated_at() >= stored.created_at());
    }

    #[test]
    fn returned_sessions_are_snapshots() {
        let store = SessionStore::new();
        let session = store.create_session();
        store
            .append_message(session.id(), Message::user("hello", Vec::new()))
            .expect("append");

        assert!(session.is_empty());
        assert_eq!(store.session(session.id()).expect("session").messages().len(), 1);
    }

    #[tokio::test]
    async fn subscribers_receive_change_events_in_order() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        let session = store.create_session();
        let message = Message::user("hi", Vec::new());
        let message_id = message.id().clone();
        store.append_message(session.id(), message).expect("append");
        store.delete_session(session.id()).expect("delete");

        assert_eq!(
            rx.recv().await.expect("created"),
            SessionEvent::Created {
                session_id: session.id().clone()
            }
        );
        assert_eq!(
            rx.recv().await.expect("appended"),
            SessionEvent::MessageAppended {
                session_id: session.id().clone(),
                message_id,
                role: Role::User,
            }
        );
        assert_eq!(
            rx.recv().await.expect("deleted"),
            SessionEvent::Deleted {
                session_id: session.id().clone(),
                was_active: true,
            }
        );
    }
}
