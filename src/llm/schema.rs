use serde_json::Value;
use tracing::trace;

use crate::{BpmnGenError, Result, model::GraphModel};

const GRAPH_SCHEMA: &str = include_str!("../../resources/schema/graph.schema.json");

/// JSON schema the model reply must conform to.
///
/// `content` is the raw text handed to the prompt, `value` its parsed form
/// used for validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    content: String,
    value: Value,
}

impl ModelSchema {
    pub fn parse(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        let value = serde_json::from_str(&content).map_err(|e| BpmnGenError::Config(format!("invalid model schema: {e}")))?;
        Ok(Self {
            content,
            value,
        })
    }

    /// The bundled schema of the intermediate process graph.
    pub fn graph() -> Result<Self> {
        Self::parse(GRAPH_SCHEMA)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

pub trait SchemaValidator: Send + Sync {
    /// Parse `raw`, check it against `schema` and return the graph it describes.
    fn validate(
        &self,
        raw: &str,
        schema: &ModelSchema,
    ) -> Result<GraphModel>;
}

/// [`SchemaValidator`] built on `jsonschema`.
///
/// Model replies often wrap the document in a Markdown code fence or add a
/// sentence around it; both are tolerated. All schema violations are reported
/// together, joined by `"; "`.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self
    }

    fn parse_reply(raw: &str) -> Result<Value> {
        let text = strip_code_fence(raw);
        match serde_json::from_str(text) {
            Ok(value) => Ok(value),
            Err(err) => {
                // fall back to the outermost object in the text
                let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
                    return Err(BpmnGenError::SchemaValidationFailed(format!("reply is not valid JSON: {err}")));
                };
                if start >= end {
                    return Err(BpmnGenError::SchemaValidationFailed(format!("reply is not valid JSON: {err}")));
                }
                serde_json::from_str(&text[start..=end]).map_err(|e| BpmnGenError::SchemaValidationFailed(format!("reply is not valid JSON: {e}")))
            }
        }
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(
        &self,
        raw: &str,
        schema: &ModelSchema,
    ) -> Result<GraphModel> {
        let value = Self::parse_reply(raw)?;

        let validator = jsonschema::validator_for(schema.value()).map_err(|e| BpmnGenError::Config(format!("invalid model schema: {e}")))?;
        let violations: Vec<String> = validator.iter_errors(&value).map(|e| e.to_string()).collect();
        if !violations.is_empty() {
            trace!(violations = violations.len(), "reply violates the schema");
            return Err(BpmnGenError::SchemaValidationFailed(violations.join("; ")));
        }

        serde_json::from_value(value).map_err(|e| BpmnGenError::SchemaValidationFailed(format!("reply does not describe a graph: {e}")))
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string (`json`) on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
