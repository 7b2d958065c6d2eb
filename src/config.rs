use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    BpmnGenError, Result,
    llm::{DEFAULT_MODEL, DEFAULT_TEMPERATURE, ModelSelection},
    session::ContextPolicy,
};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// generative model config
    pub model: ModelConfig,
    /// generation pipeline config
    pub generation: GenerationConfig,
    /// session store config
    pub session: SessionConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// model name, defaults to "gpt-4"
    pub name: String,
    /// sampling temperature, defaults to 0.7
    pub temperature: f32,
    /// chat completions endpoint
    pub endpoint: String,
    /// environment variable holding the api key
    pub api_key_env: String,
    /// request timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// send the whole session history with every prompt
    pub use_history: bool,
    /// how many times an invalid model reply is re-prompted, 0 disables the loop
    pub response_retries: u32,
    /// require every sink of the compiled model to be an end event
    pub strict_end_events: bool,
    /// transition limit of one pipeline run
    pub max_transitions: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// drop sessions unused for this many milliseconds, unset keeps them for good
    pub idle_timeout_ms: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 60_000,
        }
    }
}

impl ModelConfig {
    pub fn selection(&self) -> ModelSelection {
        ModelSelection::new(self.name.clone(), self.temperature)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read the api key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|key| !key.is_empty())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            use_history: true,
            response_retries: 0,
            strict_end_events: false,
            max_transitions: 64,
        }
    }
}

impl GenerationConfig {
    pub fn context_policy(&self) -> ContextPolicy {
        ContextPolicy::from_history_flag(self.use_history)
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| BpmnGenError::Config(format!("failed to load config file {:?}: {e}", path.as_ref())))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.check()?;
        Ok(config)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(BpmnGenError::Config(format!("model temperature {} is out of range [0, 2]", self.model.temperature)));
        }
        if self.model.timeout_ms == 0 {
            return Err(BpmnGenError::Config("model timeout_ms must be greater than 0".to_string()));
        }
        if self.generation.max_transitions == 0 {
            return Err(BpmnGenError::Config("generation max_transitions must be greater than 0".to_string()));
        }
        if self.session.idle_timeout_ms == Some(0) {
            return Err(BpmnGenError::Config("session idle_timeout_ms must be greater than 0".to_string()));
        }
        Ok(())
    }
}
