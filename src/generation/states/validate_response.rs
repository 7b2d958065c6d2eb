use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    BpmnGenError, Result,
    common::{Payload, PayloadKey},
    generation::signals,
    llm::{ModelSchema, SchemaValidator},
    runtime::ExecutionContext,
    state::{State, StateOutput},
};

/// Parses the model reply into a graph.
///
/// With `retries > 0` a schema violation does not fail the run right away:
/// the violations and the attempt count are stored in the payload and the
/// `retry` signal is emitted, which the table routes back to
/// [`PrepareRequest`](super::PrepareRequest). Once the attempts are used up
/// the violation is returned as the error.
pub struct ValidateResponse {
    validator: Arc<dyn SchemaValidator>,
    schema: Arc<ModelSchema>,
    retries: u32,
}

impl ValidateResponse {
    pub fn new(
        validator: Arc<dyn SchemaValidator>,
        schema: Arc<ModelSchema>,
        retries: u32,
    ) -> Self {
        Self {
            validator,
            schema,
            retries,
        }
    }
}

#[async_trait]
impl State for ValidateResponse {
    fn id(&self) -> &str {
        super::VALIDATE_RESPONSE
    }

    fn description(&self) -> &str {
        "Validate the model reply against the graph schema"
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        mut payload: Payload,
    ) -> Result<StateOutput> {
        let raw: String = payload.require(PayloadKey::RawResponse)?;
        let attempt: u32 = payload.get(PayloadKey::Attempt).unwrap_or(0);

        match self.validator.validate(&raw, &self.schema) {
            Ok(graph) => {
                debug!(execution_id = ctx.execution_id(), nodes = graph.nodes.len(), edges = graph.edge_count(), "reply validated");
                payload.remove(PayloadKey::ValidationErrors);
                payload.set(PayloadKey::Graph, &graph);
                Ok(StateOutput::new(signals::ADVANCE, payload))
            }
            Err(BpmnGenError::SchemaValidationFailed(errors)) if attempt < self.retries => {
                warn!(execution_id = ctx.execution_id(), attempt = attempt + 1, retries = self.retries, errors = %errors, "reply rejected, re-prompting");
                payload.set(PayloadKey::ValidationErrors, errors);
                payload.set(PayloadKey::Attempt, attempt + 1);
                Ok(StateOutput::new(signals::RETRY, payload))
            }
            Err(err) => Err(err),
        }
    }
}
