use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{
    Result,
    common::{Payload, PayloadKey},
    generation::signals,
    llm::{ModelClient, ModelSelection},
    runtime::ExecutionContext,
    session::{Context, SessionStore},
    state::{State, StateOutput},
};

/// Sends the prepared context to the model.
///
/// The reply is appended to the payload context and to the session history;
/// the session append is a read-modify-write under the session lock so a
/// concurrent run on the same session cannot drop it.
pub struct SubmitToModel {
    sessions: SessionStore,
    client: Arc<dyn ModelClient>,
}

impl SubmitToModel {
    pub fn new(
        sessions: SessionStore,
        client: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            sessions,
            client,
        }
    }
}

#[async_trait]
impl State for SubmitToModel {
    fn id(&self) -> &str {
        super::SUBMIT_TO_MODEL
    }

    fn description(&self) -> &str {
        "Submit BPMN model generation request to the model"
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        mut payload: Payload,
    ) -> Result<StateOutput> {
        let session_id: String = payload.require(PayloadKey::SessionId)?;
        let context: Context = payload.require(PayloadKey::Context)?;
        let selection = ModelSelection::new(payload.require::<String>(PayloadKey::Model)?, payload.require::<f32>(PayloadKey::Temperature)?);

        debug!(execution_id = ctx.execution_id(), model = %selection.model, entries = context.len(), "submitting request");
        let reply = self.client.generate(&context, &selection).await?;
        trace!(execution_id = ctx.execution_id(), reply = %reply, "model replied");

        let session = self.sessions.get_or_create(&session_id);
        session.update(|current| Ok(current.clone().with_model_reply(reply.as_str()))).await?;

        payload.set(PayloadKey::Context, context.with_model_reply(reply.as_str()));
        payload.set(PayloadKey::RawResponse, reply);
        Ok(StateOutput::new(signals::ADVANCE, payload))
    }
}
