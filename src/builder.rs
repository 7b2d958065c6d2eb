use std::{collections::HashSet, sync::Arc};

use tracing::debug;

use crate::{
    BpmnGenError, Config, Result, StateMachine,
    bpmn::{ArtifactValidator, Compiler},
    generation::{BpmnGeneration, pipeline_rules, states},
    llm::{HttpModelClient, JsonSchemaValidator, ModelClient, ModelSchema, PromptGenerator, SchemaValidator, TemplatePromptGenerator},
    session::SessionStore,
    state::{Signal, State, StateId, TransitionRule, TransitionTable},
};

/// Default bound on transitions per execution.
const DEFAULT_MAX_TRANSITIONS: usize = 1024;
/// Size of the event broadcast buffer.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Collects states and rules and validates them into a [`StateMachine`].
///
/// Validation happens in [`StateMachineBuilder::build`]: duplicate or empty
/// state ids, rules naming unregistered states and ambiguous rules are all
/// reported as [`BpmnGenError::Config`].
pub struct StateMachineBuilder {
    states: Vec<Arc<dyn State>>,
    rules: Vec<TransitionRule>,
    max_transitions: usize,
    event_capacity: usize,
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            rules: Vec::new(),
            max_transitions: DEFAULT_MAX_TRANSITIONS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(
        self,
        state: impl State + 'static,
    ) -> Self {
        self.shared_state(Arc::new(state))
    }

    pub fn shared_state(
        mut self,
        state: Arc<dyn State>,
    ) -> Self {
        self.states.push(state);
        self
    }

    pub fn rule(
        mut self,
        from: impl Into<StateId>,
        signal: impl Into<Signal>,
        to: impl Into<StateId>,
    ) -> Self {
        self.rules.push(TransitionRule::new(from, signal, to));
        self
    }

    pub fn rules(
        mut self,
        rules: impl IntoIterator<Item = TransitionRule>,
    ) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn max_transitions(
        mut self,
        n: usize,
    ) -> Self {
        self.max_transitions = n;
        self
    }

    pub fn event_capacity(
        mut self,
        n: usize,
    ) -> Self {
        self.event_capacity = n;
        self
    }

    pub fn build(self) -> Result<StateMachine> {
        let mut ids = HashSet::new();
        for state in &self.states {
            if state.id().is_empty() {
                return Err(BpmnGenError::Config("state id must not be empty".to_string()));
            }
            if !ids.insert(state.id().to_string()) {
                return Err(BpmnGenError::Config(format!("state '{}' is registered twice", state.id())));
            }
        }

        if self.max_transitions == 0 {
            return Err(BpmnGenError::Config("max_transitions must be greater than 0".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(BpmnGenError::Config("event_capacity must be greater than 0".to_string()));
        }

        let mut table = TransitionTable::new();
        for rule in self.rules {
            if !ids.contains(&rule.from) {
                return Err(BpmnGenError::Config(format!("transition rule source '{}' is not a registered state", rule.from)));
            }
            if !ids.contains(&rule.to) {
                return Err(BpmnGenError::Config(format!("transition rule target '{}' is not a registered state", rule.to)));
            }
            table.add(rule)?;
        }

        Ok(StateMachine::new(self.states, table, self.event_capacity, self.max_transitions))
    }
}

/// Transitions of one pass through the pipeline, Start to Complete.
const PASS_TRANSITIONS: usize = 6;
/// Extra transitions per re-prompt: ValidateResponse, PrepareRequest, SubmitToModel.
const RETRY_TRANSITIONS: usize = 3;

/// Assembles a [`BpmnGeneration`] from a [`Config`] and optional collaborator
/// overrides.
///
/// Collaborators that are not set fall back to the bundled defaults:
/// [`HttpModelClient`] built from the `[model]` section,
/// [`TemplatePromptGenerator`], [`JsonSchemaValidator`] and the bundled graph
/// [`ModelSchema`].
#[derive(Default)]
pub struct GenerationBuilder {
    config: Config,
    model_client: Option<Arc<dyn ModelClient>>,
    prompt_generator: Option<Arc<dyn PromptGenerator>>,
    schema_validator: Option<Arc<dyn SchemaValidator>>,
    schema: Option<ModelSchema>,
    sessions: Option<SessionStore>,
}

impl GenerationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn model_client(
        mut self,
        client: Arc<dyn ModelClient>,
    ) -> Self {
        self.model_client = Some(client);
        self
    }

    pub fn prompt_generator(
        mut self,
        generator: Arc<dyn PromptGenerator>,
    ) -> Self {
        self.prompt_generator = Some(generator);
        self
    }

    pub fn schema_validator(
        mut self,
        validator: Arc<dyn SchemaValidator>,
    ) -> Self {
        self.schema_validator = Some(validator);
        self
    }

    pub fn schema(
        mut self,
        schema: ModelSchema,
    ) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Share an existing session store, e.g. between several pipelines.
    pub fn session_store(
        mut self,
        sessions: SessionStore,
    ) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn build(self) -> Result<BpmnGeneration> {
        let config = self.config;
        config.check()?;

        let retries = config.generation.response_retries as usize;
        let needed = PASS_TRANSITIONS + retries * RETRY_TRANSITIONS;
        if config.generation.max_transitions < needed {
            return Err(BpmnGenError::Config(format!(
                "max_transitions {} is too small for {} response retries, at least {} are needed",
                config.generation.max_transitions, retries, needed
            )));
        }

        let model_client = match self.model_client {
            Some(client) => client,
            None => Arc::new(HttpModelClient::from_config(&config.model)?),
        };
        let prompt_generator = self.prompt_generator.unwrap_or_else(|| Arc::new(TemplatePromptGenerator::new()));
        let schema_validator = self.schema_validator.unwrap_or_else(|| Arc::new(JsonSchemaValidator::new()));
        let schema = Arc::new(match self.schema {
            Some(schema) => schema,
            None => ModelSchema::graph()?,
        });
        let sessions = self.sessions.unwrap_or_else(|| SessionStore::from_config(&config.session));

        let machine = StateMachineBuilder::new()
            .state(states::Start::new(config.model.selection()))
            .state(states::PrepareRequest::new(sessions.clone(), prompt_generator, schema.clone(), config.generation.context_policy()))
            .state(states::SubmitToModel::new(sessions.clone(), model_client))
            .state(states::ValidateResponse::new(schema_validator, schema, config.generation.response_retries))
            .state(states::CompileArtifact::new(Compiler::new()))
            .state(states::ValidateArtifact::new(ArtifactValidator::new().strict_end_events(config.generation.strict_end_events)))
            .state(states::Complete)
            .rules(pipeline_rules())
            .max_transitions(config.generation.max_transitions)
            .build()?;

        debug!(model = %config.model.name, retries, "generation pipeline built");
        Ok(BpmnGeneration::new(machine, sessions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        generation::states::testing::ScriptedModelClient,
        state::{FnState, StateOutput},
    };

    fn noop(id: &'static str) -> FnState {
        FnState::new(id, "does nothing", |_, payload| Box::pin(async move { Ok(StateOutput::new("next", payload)) }))
    }

    #[test]
    fn test_build_valid_machine() {
        let machine = StateMachineBuilder::new().state(noop("a")).state(noop("b")).rule("a", "next", "b").build().unwrap();

        assert_eq!(machine.state_ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(machine.transitions().len(), 1);
    }

    #[test]
    fn test_rule_with_unknown_source() {
        let err = StateMachineBuilder::new().state(noop("a")).rule("ghost", "next", "a").build().err().unwrap();
        assert_eq!(err, BpmnGenError::Config("transition rule source 'ghost' is not a registered state".to_string()));
    }

    #[test]
    fn test_rule_with_unknown_target() {
        let err = StateMachineBuilder::new().state(noop("a")).rule("a", "next", "ghost").build().err().unwrap();
        assert_eq!(err, BpmnGenError::Config("transition rule target 'ghost' is not a registered state".to_string()));
    }

    #[test]
    fn test_ambiguous_rules() {
        let err = StateMachineBuilder::new()
            .state(noop("a"))
            .state(noop("b"))
            .state(noop("c"))
            .rule("a", "next", "b")
            .rule("a", "next", "c")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, BpmnGenError::Config(msg) if msg.contains("ambiguous")));
    }

    #[test]
    fn test_duplicate_state_id() {
        let err = StateMachineBuilder::new().state(noop("a")).state(noop("a")).build().err().unwrap();
        assert_eq!(err, BpmnGenError::Config("state 'a' is registered twice".to_string()));
    }

    #[test]
    fn test_generation_pipeline() {
        let generation = GenerationBuilder::new().model_client(ScriptedModelClient::replying("{}")).build().unwrap();

        let ids: Vec<_> = generation.machine().state_ids().collect();
        assert_eq!(
            ids,
            vec![
                states::START,
                states::PREPARE_REQUEST,
                states::SUBMIT_TO_MODEL,
                states::VALIDATE_RESPONSE,
                states::COMPILE_ARTIFACT,
                states::VALIDATE_ARTIFACT,
                states::COMPLETE
            ]
        );
        assert_eq!(generation.machine().transitions().len(), 7);
    }

    #[test]
    fn test_generation_transition_budget() {
        let mut config = Config::default();
        config.generation.response_retries = 30;

        let err = GenerationBuilder::new().config(config).model_client(ScriptedModelClient::replying("{}")).build().err().unwrap();
        assert!(matches!(err, BpmnGenError::Config(msg) if msg.contains("max_transitions")));
    }

    #[test]
    fn test_generation_rejects_out_of_range_config() {
        let build = |config: Config| GenerationBuilder::new().config(config).model_client(ScriptedModelClient::replying("{}")).build().err();

        let mut config = Config::default();
        config.model.temperature = 5.0;
        assert!(matches!(build(config), Some(BpmnGenError::Config(msg)) if msg.contains("temperature")));

        let mut config = Config::default();
        config.model.timeout_ms = 0;
        assert!(matches!(build(config), Some(BpmnGenError::Config(msg)) if msg.contains("timeout_ms")));

        let mut config = Config::default();
        config.session.idle_timeout_ms = Some(0);
        assert!(matches!(build(config), Some(BpmnGenError::Config(msg)) if msg.contains("idle_timeout_ms")));
    }

    #[test]
    fn test_zero_transition_limit() {
        let err = StateMachineBuilder::new().state(noop("a")).max_transitions(0).build().err().unwrap();
        assert!(matches!(err, BpmnGenError::Config(_)));
    }
}
