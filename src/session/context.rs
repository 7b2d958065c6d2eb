//! Conversation history exchanged with the generative model.

use serde::{Deserialize, Serialize};

use crate::utils;

/// Who produced a context entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContextRole {
    /// A prompt sent to the model.
    Prompt,
    /// A reply produced by the model.
    Model,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub role: ContextRole,
    pub content: String,
    /// Timestamp in milliseconds.
    pub timestamp: i64,
}

impl ContextEntry {
    pub fn for_prompt(content: impl Into<String>) -> Self {
        Self::new(ContextRole::Prompt, content)
    }

    pub fn for_model(content: impl Into<String>) -> Self {
        Self::new(ContextRole::Model, content)
    }

    fn new(
        role: ContextRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: utils::time::time_millis(),
        }
    }
}

/// Ordered prompt/reply history of one session.
///
/// Appending never mutates in place: every `with_*` method consumes the
/// context and returns the extended one, which the owner then swaps in.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Context {
    entries: Vec<ContextEntry>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn with_entry(
        mut self,
        entry: ContextEntry,
    ) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_prompt(
        self,
        prompt: impl Into<String>,
    ) -> Self {
        self.with_entry(ContextEntry::for_prompt(prompt))
    }

    pub fn with_model_reply(
        self,
        reply: impl Into<String>,
    ) -> Self {
        self.with_entry(ContextEntry::for_model(reply))
    }

    /// The most recent reply produced by the model.
    pub fn latest_model_entry(&self) -> Option<&ContextEntry> {
        self.latest(ContextRole::Model)
    }

    pub fn latest_prompt_entry(&self) -> Option<&ContextEntry> {
        self.latest(ContextRole::Prompt)
    }

    fn latest(
        &self,
        role: ContextRole,
    ) -> Option<&ContextEntry> {
        self.entries.iter().rev().find(|e| e.role == role)
    }
}

/// How much history a new prompt is sent with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContextPolicy {
    /// Keep every prompt and reply.
    #[default]
    Full,
    /// Keep only the latest model reply followed by the new prompt.
    LatestOnly,
}

impl ContextPolicy {
    pub fn from_history_flag(use_history: bool) -> Self {
        if use_history { Self::Full } else { Self::LatestOnly }
    }

    /// Build the context that carries `prompt` on top of `context`.
    pub fn with_prompt(
        &self,
        context: Context,
        prompt: impl Into<String>,
    ) -> Context {
        match self {
            ContextPolicy::Full => context.with_prompt(prompt),
            ContextPolicy::LatestOnly => {
                let mut trimmed = Context::new();
                if let Some(latest) = context.latest_model_entry() {
                    trimmed = trimmed.with_entry(latest.clone());
                }
                trimmed.with_prompt(prompt)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_model_entry() {
        let context = Context::new().with_prompt("p1").with_model_reply("r1").with_prompt("p2").with_model_reply("r2").with_prompt("p3");

        assert_eq!(context.latest_model_entry().map(|e| e.content.as_str()), Some("r2"));
        assert_eq!(context.latest_prompt_entry().map(|e| e.content.as_str()), Some("p3"));
        assert_eq!(context.len(), 5);
    }

    #[test]
    fn test_latest_model_entry_empty() {
        assert!(Context::new().latest_model_entry().is_none());
    }

    #[test]
    fn test_full_policy_appends() {
        let context = Context::new().with_prompt("p1").with_model_reply("r1");
        let next = ContextPolicy::Full.with_prompt(context, "p2");

        let contents: Vec<_> = next.entries().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["p1", "r1", "p2"]);
    }

    #[test]
    fn test_latest_only_policy_trims() {
        let context = Context::new().with_prompt("p1").with_model_reply("r1").with_prompt("p2").with_model_reply("r2");
        let next = ContextPolicy::LatestOnly.with_prompt(context, "p3");

        let contents: Vec<_> = next.entries().iter().map(|e| (e.role, e.content.as_str())).collect();
        assert_eq!(contents, vec![(ContextRole::Model, "r2"), (ContextRole::Prompt, "p3")]);
    }

    #[test]
    fn test_latest_only_policy_without_reply() {
        let next = ContextPolicy::LatestOnly.with_prompt(Context::new(), "p1");
        assert_eq!(next.len(), 1);
        assert_eq!(next.entries()[0].role, ContextRole::Prompt);
    }
}
