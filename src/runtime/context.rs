use crate::{
    common::Cancellation,
    state::{Signal, StateId},
};

/// Per-execution information handed to every state action.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    execution_id: String,
    state: StateId,
    signal: Signal,
    cancellation: Cancellation,
}

impl ExecutionContext {
    pub fn new(
        execution_id: impl Into<String>,
        state: impl Into<StateId>,
        signal: Signal,
        cancellation: Cancellation,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            state: state.into(),
            signal,
            cancellation,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// The state currently running.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// The signal that led into the current state.
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub(crate) fn advance(
        &mut self,
        state: StateId,
        signal: Signal,
    ) {
        self.state = state;
        self.signal = signal;
    }
}
