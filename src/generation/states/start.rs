use async_trait::async_trait;
use tracing::debug;

use crate::{
    BpmnGenError, Result,
    common::{Payload, PayloadKey},
    generation::signals,
    llm::ModelSelection,
    runtime::ExecutionContext,
    state::{State, StateOutput},
};

/// Entry state of a run.
///
/// Checks the inputs and seeds the model selection. A model or temperature
/// already present in the payload overrides the configured one for this run.
pub struct Start {
    selection: ModelSelection,
}

impl Start {
    pub fn new(selection: ModelSelection) -> Self {
        Self {
            selection,
        }
    }
}

#[async_trait]
impl State for Start {
    fn id(&self) -> &str {
        super::START
    }

    fn description(&self) -> &str {
        "Start BPMN model generation"
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        mut payload: Payload,
    ) -> Result<StateOutput> {
        let session_id: String = payload.require(PayloadKey::SessionId)?;
        if session_id.trim().is_empty() {
            return Err(BpmnGenError::Payload("session id must not be empty".to_string()));
        }
        let request: String = payload.require(PayloadKey::Request)?;
        if request.trim().is_empty() {
            return Err(BpmnGenError::Payload("request must not be empty".to_string()));
        }

        if payload.get::<String>(PayloadKey::Model).is_none() {
            payload.set(PayloadKey::Model, &self.selection.model);
        }
        if payload.get::<f32>(PayloadKey::Temperature).is_none() {
            payload.set(PayloadKey::Temperature, self.selection.temperature);
        }
        payload.set(PayloadKey::Attempt, 0u32);
        payload.remove(PayloadKey::ValidationErrors);

        debug!(execution_id = ctx.execution_id(), session_id = %session_id, "generation started");
        Ok(StateOutput::new(signals::ADVANCE, payload))
    }
}
