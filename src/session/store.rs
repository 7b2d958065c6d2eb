use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, Weak},
    time::Duration,
};

use tracing::trace;

use crate::{
    common::MemCache,
    config::SessionConfig,
    session::{Session, SessionId},
};

/// In-memory registry of sessions, keyed by session id.
///
/// Sessions are created lazily on first reference and are kept for the
/// lifetime of the store. With an idle timeout, a session nobody touched for
/// that long is dropped, but never while something still holds it: a running
/// execution keeps its session, and every lookup during the run resolves to
/// that same object.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: MemCache<SessionId, Arc<Session>>,
    /// Every session handed out, so held ones survive idle expiry.
    live: Arc<Mutex<HashMap<SessionId, Weak<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop sessions that stayed unused and unreferenced for `idle`.
    pub fn with_idle_timeout(idle: Duration) -> Self {
        Self {
            sessions: MemCache::with_time_to_idle(idle),
            live: Arc::default(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        match config.idle_timeout() {
            Some(idle) => Self::with_idle_timeout(idle),
            None => Self::new(),
        }
    }

    /// Generate a fresh session id.
    pub fn new_session_id() -> SessionId {
        uuid::Uuid::new_v4().to_string()
    }

    /// Get the session for `id`, creating it if it does not exist yet.
    ///
    /// Concurrent callers for one id always receive the same session.
    pub fn get_or_create(
        &self,
        id: &str,
    ) -> Arc<Session> {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = live.get(id).and_then(Weak::upgrade) {
            self.sessions.set(id.to_string(), session.clone());
            return session;
        }

        live.retain(|_, session| session.strong_count() > 0);
        let session = self.sessions.get_or_insert_with(id.to_string(), || {
            trace!(session_id = id, "creating session");
            Arc::new(Session::new(id))
        });
        live.insert(id.to_string(), Arc::downgrade(&session));
        session
    }

    pub fn get(
        &self,
        id: &str,
    ) -> Option<Arc<Session>> {
        let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        live.get(id).and_then(Weak::upgrade).or_else(|| self.sessions.get(&id.to_string()))
    }

    pub fn remove(
        &self,
        id: &str,
    ) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        live.remove(id);
        self.sessions.remove(&id.to_string());
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|(id, _)| id.as_ref().clone()).collect()
    }
}
