//! Prompt rendering.
//!
//! Templates contain `${NAME}` placeholders that are replaced by the
//! substitutions passed to [`PromptGenerator::prompt`]. Substituted values are
//! inserted verbatim and never scanned for placeholders themselves.

use std::collections::HashMap;

use regex::{Captures, Regex};

use crate::{BpmnGenError, Result};

/// Format: `${NAME}`
const PLACEHOLDER_PATTERN: &str = r"\$\{([A-Za-z0-9_]+)\}";

const GENERATE_TEMPLATE: &str = include_str!("../../resources/prompts/generate.txt");
const CORRECT_TEMPLATE: &str = include_str!("../../resources/prompts/correct.txt");

/// Selects which template is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PromptType {
    /// Create or update a process from a request.
    Generate,
    /// Ask the model to fix a reply that failed schema validation.
    Correct,
}

/// Placeholders understood by the bundled templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptPlaceholder {
    SchemaContent,
    CurrentState,
    Prompt,
    Errors,
}

/// One `(placeholder, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSubstitution {
    pub placeholder: String,
    pub value: String,
}

impl PromptSubstitution {
    pub fn new(
        placeholder: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            placeholder: placeholder.as_ref().to_string(),
            value: value.into(),
        }
    }
}

pub trait PromptGenerator: Send + Sync {
    /// Render the prompt selected by `prompt_type`.
    ///
    /// Returns `Ok(None)` when no template is registered for the selector.
    fn prompt(
        &self,
        prompt_type: PromptType,
        substitutions: &[PromptSubstitution],
    ) -> Result<Option<String>>;
}

/// [`PromptGenerator`] backed by in-memory `${NAME}` templates.
#[derive(Debug, Clone)]
pub struct TemplatePromptGenerator {
    templates: HashMap<PromptType, String>,
}

impl Default for TemplatePromptGenerator {
    /// The bundled BPMN generation templates.
    fn default() -> Self {
        Self::empty().with_template(PromptType::Generate, GENERATE_TEMPLATE).with_template(PromptType::Correct, CORRECT_TEMPLATE)
    }
}

impl TemplatePromptGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator without any template.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn with_template(
        mut self,
        prompt_type: PromptType,
        template: impl Into<String>,
    ) -> Self {
        self.templates.insert(prompt_type, template.into());
        self
    }

    fn render(
        template: &str,
        substitutions: &[PromptSubstitution],
    ) -> Result<String> {
        let re = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| BpmnGenError::PromptGenerationFailed(e.to_string()))?;

        // later pairs win
        let values: HashMap<&str, &str> = substitutions.iter().map(|s| (s.placeholder.as_str(), s.value.as_str())).collect();

        let mut missing: Vec<String> = Vec::new();
        let rendered = re.replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match values.get(name) {
                Some(value) => value.to_string(),
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            return Err(BpmnGenError::PromptGenerationFailed(format!("unresolved placeholders: {}", missing.join(", "))));
        }
        Ok(rendered.into_owned())
    }
}

impl PromptGenerator for TemplatePromptGenerator {
    fn prompt(
        &self,
        prompt_type: PromptType,
        substitutions: &[PromptSubstitution],
    ) -> Result<Option<String>> {
        self.templates.get(&prompt_type).map(|template| Self::render(template, substitutions)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_substitutions() -> Vec<PromptSubstitution> {
        vec![
            PromptSubstitution::new(PromptPlaceholder::SchemaContent, "{\"type\":\"object\"}"),
            PromptSubstitution::new(PromptPlaceholder::CurrentState, "{}"),
            PromptSubstitution::new(PromptPlaceholder::Prompt, "an approval process"),
        ]
    }

    #[test]
    fn test_placeholder_names() {
        assert_eq!(PromptPlaceholder::SchemaContent.as_ref(), "SCHEMA_CONTENT");
        assert_eq!(PromptPlaceholder::CurrentState.as_ref(), "CURRENT_STATE");
        assert_eq!(PromptPlaceholder::Prompt.as_ref(), "PROMPT");
        assert_eq!(PromptPlaceholder::Errors.as_ref(), "ERRORS");
    }

    #[test]
    fn test_render_substitutions() {
        let generator = TemplatePromptGenerator::empty().with_template(PromptType::Generate, "schema=${SCHEMA_CONTENT} state=${CURRENT_STATE} ask=${PROMPT} again=${PROMPT}");

        let prompt = generator.prompt(PromptType::Generate, &generate_substitutions()).unwrap();
        assert_eq!(prompt.as_deref(), Some("schema={\"type\":\"object\"} state={} ask=an approval process again=an approval process"));
    }

    #[test]
    fn test_unknown_selector() {
        let generator = TemplatePromptGenerator::empty().with_template(PromptType::Generate, "${PROMPT}");
        assert_eq!(generator.prompt(PromptType::Correct, &generate_substitutions()).unwrap(), None);
    }

    #[test]
    fn test_unresolved_placeholder() {
        let generator = TemplatePromptGenerator::empty().with_template(PromptType::Generate, "${PROMPT} ${ERRORS} ${ERRORS}");
        let err = generator.prompt(PromptType::Generate, &generate_substitutions()).unwrap_err();
        assert_eq!(err, BpmnGenError::PromptGenerationFailed("unresolved placeholders: ERRORS".to_string()));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let generator = TemplatePromptGenerator::empty().with_template(PromptType::Generate, "${PROMPT}");
        let prompt = generator.prompt(PromptType::Generate, &[PromptSubstitution::new("PROMPT", "use ${ERRORS} literally")]).unwrap();
        assert_eq!(prompt.as_deref(), Some("use ${ERRORS} literally"));
    }

    #[test]
    fn test_bundled_templates() {
        let generator = TemplatePromptGenerator::new();

        let generate = generator.prompt(PromptType::Generate, &generate_substitutions()).unwrap().unwrap();
        assert!(generate.contains("an approval process"));
        assert!(!generate.contains("${"));

        let mut correct_substitutions = generate_substitutions();
        correct_substitutions.push(PromptSubstitution::new(PromptPlaceholder::Errors, "- missing property 'nodes'"));
        let correct = generator.prompt(PromptType::Correct, &correct_substitutions).unwrap().unwrap();
        assert!(correct.contains("missing property 'nodes'"));
    }
}
