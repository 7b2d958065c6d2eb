//! Table-driven state machine engine.
//!
//! The engine owns the registered states and the transition table and runs
//! the execution loop:
//! - resolve the initial state
//! - invoke the current state's action with the current payload
//! - look up `(current state, outbound signal)` in the table
//! - advance on a match, stop on a miss (the current state is terminal)
//!
//! Steps run strictly one after another. Errors raised by a state abort the
//! run and reach the caller unchanged; the engine never retries. Retry or
//! branch-on-failure behaviour belongs in the table as explicit rules.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    BpmnGenError, Result, StateMachineBuilder,
    common::{BroadcastQueue, Cancellation, Payload},
    events::{MachineEvent, Message},
    runtime::ExecutionContext,
    state::{Signal, State, StateId, StateOutput, TransitionTable},
    utils,
};

/// Result of a finished execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Unique id of this run.
    pub execution_id: String,
    /// The terminal state.
    pub state: StateId,
    /// The signal the terminal state emitted.
    pub signal: Signal,
    /// The payload returned by the terminal state.
    pub payload: Payload,
    /// States in the order they ran, repeats included.
    pub path: Vec<StateId>,
}

/// A validated set of states and transition rules.
///
/// Build one with [`StateMachineBuilder`]; every rule is checked against the
/// registered states before the machine exists, so lookups at run time can
/// only miss, never point at an unknown state.
///
/// # Example
///
/// ```rust,ignore
/// let machine = StateMachine::builder()
///     .state(prepare)
///     .state(submit)
///     .rule("prepare", "next", "submit")
///     .build()?;
///
/// let execution = machine.execute("prepare", "start", Payload::new()).await?;
/// assert_eq!(execution.state, "submit");
/// ```
pub struct StateMachine {
    states: HashMap<StateId, Arc<dyn State>>,
    /// Registration order, for stable listings.
    order: Vec<StateId>,
    transitions: TransitionTable,
    events: Arc<BroadcastQueue<Message>>,
    max_transitions: usize,
}

impl StateMachine {
    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::new()
    }

    pub(crate) fn new(
        states: Vec<Arc<dyn State>>,
        transitions: TransitionTable,
        event_capacity: usize,
        max_transitions: usize,
    ) -> Self {
        let order = states.iter().map(|s| s.id().to_string()).collect();
        let states = states.into_iter().map(|s| (s.id().to_string(), s)).collect();

        Self {
            states,
            order,
            transitions,
            events: BroadcastQueue::new(event_capacity),
            max_transitions,
        }
    }

    /// Subscribe to the events of every execution started after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.events.subscribe()
    }

    pub fn state(
        &self,
        id: &str,
    ) -> Option<Arc<dyn State>> {
        self.states.get(id).cloned()
    }

    /// Registered state ids in registration order.
    pub fn state_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Output a human-readable representation of the machine
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== State Machine ===".to_string());
        lines.push(format!("States: {}, Rules: {}", self.states.len(), self.transitions.len()));
        lines.push(String::new());

        lines.push("--- States ---".to_string());
        for id in &self.order {
            let state = &self.states[id];
            lines.push(format!("[{}] {}", id, state.description()));
        }
        lines.push(String::new());

        lines.push("--- Transitions ---".to_string());
        let mut rules: Vec<_> = self.transitions.rules().collect();
        rules.sort_by(|a, b| (&a.from, &a.signal).cmp(&(&b.from, &b.signal)));
        for rule in rules {
            lines.push(format!("{} --[{}]--> {}", rule.from, rule.signal, rule.to));
        }

        lines.join("\n")
    }

    /// Run the machine from `initial` until a state has no matching rule.
    pub async fn execute(
        &self,
        initial: &str,
        signal: impl Into<Signal>,
        payload: Payload,
    ) -> Result<Execution> {
        self.execute_with_cancel(initial, signal, payload, Cancellation::new()).await
    }

    /// Like [`StateMachine::execute`], stopping with [`BpmnGenError::Cancelled`]
    /// once `cancellation` fires.
    ///
    /// Cancellation is observed between states and raced against the running
    /// action; an action interrupted this way is dropped at its await point.
    pub async fn execute_with_cancel(
        &self,
        initial: &str,
        signal: impl Into<Signal>,
        payload: Payload,
        cancellation: Cancellation,
    ) -> Result<Execution> {
        let signal = signal.into();
        let execution_id = utils::longid();

        let mut current = self.state(initial).ok_or_else(|| BpmnGenError::UnknownState(initial.to_string()))?;
        let mut ctx = ExecutionContext::new(execution_id.clone(), initial, signal.clone(), cancellation.clone());

        debug!(execution_id = %execution_id, state = initial, signal = %signal, "execution started");
        self.emit(
            &execution_id,
            MachineEvent::Started {
                state: initial.to_string(),
                signal,
            },
        );

        let mut payload = payload;
        let mut path: Vec<StateId> = Vec::new();
        let mut transitions = 0usize;

        loop {
            let state_id = current.id().to_string();

            if cancellation.is_cancelled() {
                return Err(self.cancelled(&execution_id, state_id));
            }

            path.push(state_id.clone());
            debug!(execution_id = %execution_id, state = %state_id, "entering state");
            self.emit(
                &execution_id,
                MachineEvent::Entered {
                    state: state_id.clone(),
                },
            );

            let result = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(self.cancelled(&execution_id, state_id)),
                result = current.invoke(&ctx, payload) => result,
            };

            let StateOutput {
                signal,
                payload: next_payload,
            } = match result {
                Ok(output) => output,
                Err(err) => {
                    warn!(execution_id = %execution_id, state = %state_id, error = %err, "state failed");
                    self.emit(
                        &execution_id,
                        MachineEvent::Failed {
                            state: state_id,
                            error: err.to_string(),
                        },
                    );
                    return Err(err);
                }
            };
            payload = next_payload;

            let Some(next_id) = self.transitions.next(&state_id, &signal) else {
                info!(execution_id = %execution_id, state = %state_id, signal = %signal, steps = path.len(), "execution completed");
                self.emit(
                    &execution_id,
                    MachineEvent::Completed {
                        state: state_id.clone(),
                        signal: signal.clone(),
                    },
                );
                return Ok(Execution {
                    execution_id,
                    state: state_id,
                    signal,
                    payload,
                    path,
                });
            };

            transitions += 1;
            if transitions > self.max_transitions {
                let err = BpmnGenError::TransitionLimit(self.max_transitions);
                warn!(execution_id = %execution_id, state = %state_id, "transition limit exceeded");
                self.emit(
                    &execution_id,
                    MachineEvent::Failed {
                        state: state_id,
                        error: err.to_string(),
                    },
                );
                return Err(err);
            }

            // rules are checked against the registered states at build time
            let next = self.state(next_id).ok_or_else(|| BpmnGenError::Config(format!("transition target '{next_id}' is not registered")))?;

            debug!(execution_id = %execution_id, from = %state_id, signal = %signal, to = %next_id, "transition");
            self.emit(
                &execution_id,
                MachineEvent::Transitioned {
                    from: state_id,
                    signal: signal.clone(),
                    to: next_id.clone(),
                },
            );

            ctx.advance(next_id.clone(), signal);
            current = next;
        }
    }

    fn cancelled(
        &self,
        execution_id: &str,
        state: StateId,
    ) -> BpmnGenError {
        warn!(execution_id = %execution_id, state = %state, "execution cancelled");
        self.emit(
            execution_id,
            MachineEvent::Cancelled {
                state: state.clone(),
            },
        );
        BpmnGenError::Cancelled(state)
    }

    fn emit(
        &self,
        execution_id: &str,
        event: MachineEvent,
    ) {
        // no subscribers is fine
        let _ = self.events.send(Message {
            execution_id: execution_id.to_string(),
            event,
            timestamp: utils::time::time_millis(),
        });
    }
}
