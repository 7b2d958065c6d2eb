use async_trait::async_trait;
use tracing::debug;

use crate::{
    Result,
    bpmn::{ArtifactValidator, FlowModel},
    common::{Payload, PayloadKey},
    generation::signals,
    runtime::ExecutionContext,
    state::{State, StateOutput},
};

pub struct ValidateArtifact {
    validator: ArtifactValidator,
}

impl ValidateArtifact {
    pub fn new(validator: ArtifactValidator) -> Self {
        Self {
            validator,
        }
    }
}

#[async_trait]
impl State for ValidateArtifact {
    fn id(&self) -> &str {
        super::VALIDATE_ARTIFACT
    }

    fn description(&self) -> &str {
        "Check the compiled flow model"
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        payload: Payload,
    ) -> Result<StateOutput> {
        let model: FlowModel = payload.require(PayloadKey::FlowModel)?;

        self.validator.validate(&model)?;
        debug!(execution_id = ctx.execution_id(), process_id = %model.process_id, "flow model validated");

        Ok(StateOutput::new(signals::ADVANCE, payload))
    }
}
