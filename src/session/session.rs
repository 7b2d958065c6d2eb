use tokio::sync::Mutex;

use crate::{Result, session::Context, utils};

/// session id
pub type SessionId = String;

/// One conversation with the model.
///
/// The context sits behind an async lock. Every change is a
/// read-modify-replace performed while holding it, so concurrent runs on the
/// same session are serialized and none of their entries is lost.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    context: Mutex<Context>,
    created_at: i64,
}

impl Session {
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            context: Mutex::new(Context::new()),
            created_at: utils::time::time_millis(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation time in milliseconds.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Snapshot of the current context.
    pub async fn context(&self) -> Context {
        self.context.lock().await.clone()
    }

    /// Replace the context wholesale.
    pub async fn replace_context(
        &self,
        context: Context,
    ) {
        *self.context.lock().await = context;
    }

    /// Derive a new context from the current one and swap it in atomically.
    ///
    /// When `f` fails the current context is kept.
    pub async fn update<F>(
        &self,
        f: F,
    ) -> Result<Context>
    where
        F: FnOnce(&Context) -> Result<Context>,
    {
        let mut guard = self.context.lock().await;
        let next = f(&guard)?;
        *guard = next.clone();
        Ok(next)
    }
}
