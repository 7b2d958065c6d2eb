//! Narrow interfaces to the generative model and its tooling.
//!
//! The pipeline states only talk to these traits, so they can run against
//! deterministic fakes in tests and against the bundled defaults otherwise:
//! - [`ModelClient`] / [`HttpModelClient`]
//! - [`PromptGenerator`] / [`TemplatePromptGenerator`]
//! - [`SchemaValidator`] / [`JsonSchemaValidator`]

mod http;
mod prompt;
mod schema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, session::Context};

pub use http::HttpModelClient;
pub use prompt::{PromptGenerator, PromptPlaceholder, PromptSubstitution, PromptType, TemplatePromptGenerator};
pub use schema::{JsonSchemaValidator, ModelSchema, SchemaValidator};

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Which model to ask and how.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelSelection {
    pub model: String,
    pub temperature: f32,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl ModelSelection {
    pub fn new(
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            temperature,
        }
    }
}

/// Client for a generative model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the whole `context` and return the model's raw reply.
    async fn generate(
        &self,
        context: &Context,
        selection: &ModelSelection,
    ) -> Result<String>;
}
