use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, InvalidHeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    BpmnGenError, Result,
    config::ModelConfig,
    llm::{ModelClient, ModelSelection},
    session::{Context, ContextRole},
};

/// OpenAI-compatible chat completions client.
///
/// Every prompt of the context becomes a `user` message and every model
/// reply an `assistant` message, in history order.
#[derive(Debug, Clone)]
pub struct HttpModelClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpModelClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Build a client from the `[model]` config section, reading the api key
    /// from its environment variable.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.api_key(), config.timeout())
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &self.api_key {
            headers.insert(
                AUTHORIZATION,
                format!("Bearer {api_key}").parse().map_err(|err: InvalidHeaderValue| BpmnGenError::Model(err.to_string()))?,
            );
        }
        Ok(headers)
    }

    fn request_body(
        context: &Context,
        selection: &ModelSelection,
    ) -> ChatRequest {
        let messages = context
            .entries()
            .iter()
            .map(|entry| ChatMessage {
                role: match entry.role {
                    ContextRole::Prompt => "user".to_string(),
                    ContextRole::Model => "assistant".to_string(),
                },
                content: entry.content.clone(),
            })
            .collect();

        ChatRequest {
            model: selection.model.clone(),
            temperature: selection.temperature,
            messages,
        }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn generate(
        &self,
        context: &Context,
        selection: &ModelSelection,
    ) -> Result<String> {
        let body = Self::request_body(context, selection);
        debug!(model = %selection.model, messages = body.messages.len(), "sending chat completion request");

        let response = self.client.post(&self.endpoint).headers(self.headers()?).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ChatErrorResponse>(&text).map(|e| e.error.message).unwrap_or(text);
            return Err(BpmnGenError::Model(format!("HTTP {status}: {message}")));
        }

        let response: ChatResponse = serde_json::from_str(&text).map_err(|e| BpmnGenError::Model(format!("failed to parse response: {e}")))?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BpmnGenError::Model("response contains no message content".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorResponse {
    error: ChatError,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
}
