//! Event types for state machine executions.
//!
//! Events are broadcast while an execution runs so that subscribers can
//! observe progress, transitions, completion and failure without touching
//! the payload.

use crate::state::{Signal, StateId};

/// Event message containing the execution it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Execution that generated this event.
    pub execution_id: String,
    /// The actual event data.
    pub event: MachineEvent,
    /// Timestamp in milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// The execution resolved its initial state.
    Started {
        state: StateId,
        signal: Signal,
    },
    /// A state's action is about to run.
    Entered {
        state: StateId,
    },
    /// A rule moved the execution from one state to another.
    Transitioned {
        from: StateId,
        signal: Signal,
        to: StateId,
    },
    /// No rule matched; `state` is terminal for this execution.
    Completed {
        state: StateId,
        signal: Signal,
    },
    /// A state's action failed.
    Failed {
        state: StateId,
        error: String,
    },
    /// The execution was cancelled at or inside `state`.
    Cancelled {
        state: StateId,
    },
}

impl MachineEvent {
    pub fn str(&self) -> &str {
        match self {
            MachineEvent::Started {
                ..
            } => "Started",
            MachineEvent::Entered {
                ..
            } => "Entered",
            MachineEvent::Transitioned {
                ..
            } => "Transitioned",
            MachineEvent::Completed {
                ..
            } => "Completed",
            MachineEvent::Failed {
                ..
            } => "Failed",
            MachineEvent::Cancelled {
                ..
            } => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MachineEvent::Completed { .. } | MachineEvent::Failed { .. } | MachineEvent::Cancelled { .. }
        )
    }
}
