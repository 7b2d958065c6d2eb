use async_trait::async_trait;
use tracing::info;

use crate::{
    Result,
    bpmn::FlowModel,
    common::{Payload, PayloadKey},
    generation::signals,
    runtime::ExecutionContext,
    state::{State, StateOutput},
};

/// Terminal state. It has no outbound rule, so the run ends here.
pub struct Complete;

#[async_trait]
impl State for Complete {
    fn id(&self) -> &str {
        super::COMPLETE
    }

    fn description(&self) -> &str {
        "BPMN model generation completed"
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        payload: Payload,
    ) -> Result<StateOutput> {
        let session_id: String = payload.require(PayloadKey::SessionId)?;
        let model: FlowModel = payload.require(PayloadKey::FlowModel)?;

        info!(
            execution_id = ctx.execution_id(),
            session_id = %session_id,
            elements = model.elements.len(),
            flows = model.flows.len(),
            "generation completed"
        );
        Ok(StateOutput::new(signals::ADVANCE, payload))
    }
}
