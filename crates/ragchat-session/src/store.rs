use crate::session::{SessionState, SessionStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Exclusive handle to one session's state.
///
/// The lock is async so it can be held across collaborator calls.
pub type SessionHandle = Arc<tokio::sync::Mutex<SessionState>>;

/// Session-keyed registry of [`SessionState`]s.
///
/// The map lock only guards lookup and insertion and is never held across
/// an await point, so independent sessions never wait on each other.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh session and returns its id.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.handle(id);
        id
    }

    /// Returns the handle for `id`, creating an empty session if needed.
    pub fn handle(&self, id: Uuid) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(id)
            .or_insert_with(|| {
                debug!(session_id = %id, "Session created");
                Arc::new(tokio::sync::Mutex::new(SessionState::new(id)))
            })
            .clone()
    }

    /// Returns the handle for `id` if the session exists.
    pub fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.lock().get(&id).cloned()
    }

    /// Drops a session. In-flight requests holding its handle finish normally.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().remove(&id).is_some()
    }

    /// Ids of all registered sessions.
    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions.lock().keys().copied().collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Status of `id`, waiting for any in-flight request on it to finish.
    pub async fn status(&self, id: Uuid) -> Option<SessionStatus> {
        let handle = self.get(id)?;
        let state = handle.lock().await;
        Some(state.status())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_get_or_create() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        assert!(registry.get(id).is_none());

        let a = registry.handle(id);
        let b = registry.handle(id);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_and_remove() {
        let registry = SessionRegistry::new();
        let id = registry.create();
        assert_eq!(registry.ids(), vec![id]);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_status_of_unknown_session() {
        let registry = SessionRegistry::new();
        assert!(registry.status(Uuid::new_v4()).await.is_none());
        let id = registry.create();
        let status = registry.status(id).await.unwrap();
        assert!(!status.ready);
    }
}
