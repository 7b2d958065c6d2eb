//! BPMN generation pipeline.
//!
//! The pipeline is a [`StateMachine`] over seven states:
//!
//! ```text
//! Start -> PrepareRequest -> SubmitToModel -> ValidateResponse -> CompileArtifact -> ValidateArtifact -> Complete
//!                ^                                  |
//!                +------------- retry --------------+
//! ```
//!
//! Every forward step uses the `advance` signal. The `retry` edge is only
//! taken when re-prompting is enabled and the model reply failed schema
//! validation.

pub mod signals;
pub mod states;

use tokio::sync::broadcast;

use crate::{
    GenerationBuilder, Result, StateMachine,
    bpmn::FlowModel,
    common::{Cancellation, Payload, PayloadKey},
    events::Message,
    model::GraphModel,
    session::{SessionId, SessionStore},
    state::{StateId, TransitionRule},
};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub session_id: SessionId,
    pub execution_id: String,
    pub flow_model: FlowModel,
    /// The validated graph the model was compiled from.
    pub graph: GraphModel,
    /// The model reply that produced `graph`.
    pub raw_response: String,
    /// Number of re-prompts that were needed.
    pub retries: u32,
    /// States in the order they ran.
    pub path: Vec<StateId>,
}

/// The transition rules of the pipeline.
pub fn pipeline_rules() -> Vec<TransitionRule> {
    use states::*;

    vec![
        TransitionRule::new(START, signals::ADVANCE, PREPARE_REQUEST),
        TransitionRule::new(PREPARE_REQUEST, signals::ADVANCE, SUBMIT_TO_MODEL),
        TransitionRule::new(SUBMIT_TO_MODEL, signals::ADVANCE, VALIDATE_RESPONSE),
        TransitionRule::new(VALIDATE_RESPONSE, signals::ADVANCE, COMPILE_ARTIFACT),
        TransitionRule::new(VALIDATE_RESPONSE, signals::RETRY, PREPARE_REQUEST),
        TransitionRule::new(COMPILE_ARTIFACT, signals::ADVANCE, VALIDATE_ARTIFACT),
        TransitionRule::new(VALIDATE_ARTIFACT, signals::ADVANCE, COMPLETE),
    ]
}

/// Generates BPMN flow models from natural-language requests.
///
/// # Example
///
/// ```rust,ignore
/// let generation = BpmnGeneration::builder().config(Config::create("bpmngen.toml")?).build()?;
///
/// let session_id = SessionStore::new_session_id();
/// let result = generation.execute_model(&session_id, "an expense approval process").await?;
/// println!("{}", result.flow_model.describe());
/// ```
pub struct BpmnGeneration {
    machine: StateMachine,
    sessions: SessionStore,
}

impl BpmnGeneration {
    pub fn builder() -> GenerationBuilder {
        GenerationBuilder::new()
    }

    pub(crate) fn new(
        machine: StateMachine,
        sessions: SessionStore,
    ) -> Self {
        Self {
            machine,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Subscribe to the execution events of every run.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.machine.subscribe()
    }

    /// Run the pipeline for `request` within session `session_id`.
    ///
    /// The session is created on first use; later requests on the same
    /// session refine the process the model produced before.
    pub async fn execute_model(
        &self,
        session_id: &str,
        request: &str,
    ) -> Result<GenerationResult> {
        self.execute_model_with_cancel(session_id, request, Cancellation::new()).await
    }

    pub async fn execute_model_with_cancel(
        &self,
        session_id: &str,
        request: &str,
        cancellation: Cancellation,
    ) -> Result<GenerationResult> {
        let payload = Payload::new().with(PayloadKey::SessionId, session_id).with(PayloadKey::Request, request);
        self.execute_payload(payload, cancellation).await
    }

    /// Run the pipeline from an explicit payload, e.g. one that carries a
    /// prior context or a per-run model selection.
    pub async fn execute_payload(
        &self,
        payload: Payload,
        cancellation: Cancellation,
    ) -> Result<GenerationResult> {
        // held until the run ends, so every state resolves this same session
        let _session = payload.get::<String>(PayloadKey::SessionId).filter(|id| !id.trim().is_empty()).map(|id| self.sessions.get_or_create(&id));

        let execution = self.machine.execute_with_cancel(states::START, signals::START, payload, cancellation).await?;
        let payload = execution.payload;

        Ok(GenerationResult {
            session_id: payload.require(PayloadKey::SessionId)?,
            execution_id: execution.execution_id,
            flow_model: payload.require(PayloadKey::FlowModel)?,
            graph: payload.require(PayloadKey::Graph)?,
            raw_response: payload.require(PayloadKey::RawResponse)?,
            retries: payload.get(PayloadKey::Attempt).unwrap_or(0),
            path: execution.path,
        })
    }
}
