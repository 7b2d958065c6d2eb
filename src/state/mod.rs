//! State contract for the execution engine.
//!
//! A state is a named unit of work. It receives the current payload, does its
//! work (possibly suspending on I/O) and answers with an outbound [`Signal`]
//! plus the payload to carry forward. Which state runs next is decided by the
//! [`TransitionTable`], never by the state itself.

mod signal;
mod transition;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::{Result, common::Payload, runtime::ExecutionContext};

pub use signal::Signal;
pub use transition::{TransitionRule, TransitionTable};

/// state id
pub type StateId = String;

#[async_trait]
pub trait State: Send + Sync {
    /// Returns the stable id the state is registered and looked up under.
    fn id(&self) -> &str;

    /// Returns a human-readable description of what the state does.
    fn description(&self) -> &str;

    /// Executes the state's action.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The [`ExecutionContext`] of the running execution.
    /// * `payload` - The payload produced by the previous state.
    ///
    /// # Returns
    ///
    /// Returns a [`Result<StateOutput>`] holding the outbound signal and the
    /// updated payload. An error aborts the execution.
    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        payload: Payload,
    ) -> Result<StateOutput>;
}

/// Output returned by a state's invoke method
#[derive(Debug, Clone, PartialEq)]
pub struct StateOutput {
    /// outbound signal used for the transition lookup
    pub signal: Signal,
    /// payload carried to the next state
    pub payload: Payload,
}

impl StateOutput {
    pub fn new(
        signal: impl Into<Signal>,
        payload: Payload,
    ) -> Self {
        Self {
            signal: signal.into(),
            payload,
        }
    }
}

type StateAction = dyn Fn(ExecutionContext, Payload) -> BoxFuture<'static, Result<StateOutput>> + Send + Sync;

/// A state registered as data: id, description and an async closure.
///
/// ```rust,ignore
/// let review = FnState::new("review", "Review the draft", |_ctx, payload| {
///     Box::pin(async move { Ok(StateOutput::new("approved", payload)) })
/// });
/// ```
#[derive(Clone)]
pub struct FnState {
    id: StateId,
    description: String,
    action: Arc<StateAction>,
}

impl FnState {
    pub fn new<F>(
        id: impl Into<StateId>,
        description: impl Into<String>,
        action: F,
    ) -> Self
    where
        F: Fn(ExecutionContext, Payload) -> BoxFuture<'static, Result<StateOutput>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: description.into(),
            action: Arc::new(action),
        }
    }
}

impl fmt::Debug for FnState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("FnState").field("id", &self.id).field("description", &self.description).finish()
    }
}

#[async_trait]
impl State for FnState {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        payload: Payload,
    ) -> Result<StateOutput> {
        (self.action)(ctx.clone(), payload).await
    }
}
