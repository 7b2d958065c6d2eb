use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    BpmnGenError, Result,
    common::{Payload, PayloadKey},
    generation::signals,
    llm::{ModelSchema, PromptGenerator, PromptPlaceholder, PromptSubstitution, PromptType},
    runtime::ExecutionContext,
    session::{Context, ContextPolicy, SessionStore},
    state::{State, StateOutput},
};

/// Placeholder for the current process when the model has not produced one.
const EMPTY_STATE: &str = "{}";

/// Renders the next prompt and records it in the session.
///
/// The session context is authoritative. A prior context in the payload is
/// only used to seed a session that has no history yet. The whole
/// read-render-replace runs under the session lock.
///
/// When the payload carries validation errors from a rejected reply, the
/// correction prompt is rendered instead of the generation prompt.
pub struct PrepareRequest {
    sessions: SessionStore,
    prompts: Arc<dyn PromptGenerator>,
    schema: Arc<ModelSchema>,
    policy: ContextPolicy,
}

impl PrepareRequest {
    pub fn new(
        sessions: SessionStore,
        prompts: Arc<dyn PromptGenerator>,
        schema: Arc<ModelSchema>,
        policy: ContextPolicy,
    ) -> Self {
        Self {
            sessions,
            prompts,
            schema,
            policy,
        }
    }

    fn render(
        &self,
        base: &Context,
        request: &str,
        errors: Option<&str>,
    ) -> Result<String> {
        let current_state = base.latest_model_entry().map(|e| e.content.as_str()).unwrap_or(EMPTY_STATE);

        let mut substitutions = vec![
            PromptSubstitution::new(PromptPlaceholder::SchemaContent, self.schema.content()),
            PromptSubstitution::new(PromptPlaceholder::CurrentState, current_state),
            PromptSubstitution::new(PromptPlaceholder::Prompt, request),
        ];
        let prompt_type = match errors {
            Some(errors) => {
                substitutions.push(PromptSubstitution::new(PromptPlaceholder::Errors, errors));
                PromptType::Correct
            }
            None => PromptType::Generate,
        };

        self.prompts
            .prompt(prompt_type, &substitutions)?
            .ok_or_else(|| BpmnGenError::PromptGenerationFailed(format!("no '{}' prompt available", prompt_type.as_ref())))
    }
}

#[async_trait]
impl State for PrepareRequest {
    fn id(&self) -> &str {
        super::PREPARE_REQUEST
    }

    fn description(&self) -> &str {
        "Prepare BPMN model generation request"
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        mut payload: Payload,
    ) -> Result<StateOutput> {
        let session_id: String = payload.require(PayloadKey::SessionId)?;
        let request: String = payload.require(PayloadKey::Request)?;
        let prior: Option<Context> = payload.get(PayloadKey::Context);
        let errors: Option<String> = payload.get(PayloadKey::ValidationErrors);

        let session = self.sessions.get_or_create(&session_id);
        let context = session
            .update(|current| {
                let base = match (current.is_empty(), prior) {
                    (true, Some(prior)) => prior,
                    _ => current.clone(),
                };
                let prompt = self.render(&base, &request, errors.as_deref())?;
                Ok(self.policy.with_prompt(base, prompt))
            })
            .await?;

        debug!(
            execution_id = ctx.execution_id(),
            session_id = %session_id,
            entries = context.len(),
            correction = errors.is_some(),
            "prompt prepared"
        );
        payload.set(PayloadKey::Context, &context);
        Ok(StateOutput::new(signals::ADVANCE, payload))
    }
}
