//! Transition rules and the lookup table built from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    BpmnGenError, Result,
    state::{Signal, StateId},
};

/// `from` moves to `to` when it emits `signal`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: StateId,
    pub signal: Signal,
    pub to: StateId,
}

impl TransitionRule {
    pub fn new(
        from: impl Into<StateId>,
        signal: impl Into<Signal>,
        to: impl Into<StateId>,
    ) -> Self {
        Self {
            from: from.into(),
            signal: signal.into(),
            to: to.into(),
        }
    }
}

/// Mapping from `(state, signal)` to the next state.
///
/// At most one rule exists per key; adding a second one is a configuration
/// error rather than something resolved at run time.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    rules: HashMap<StateId, HashMap<Signal, StateId>>,
    len: usize,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        rule: TransitionRule,
    ) -> Result<()> {
        let by_signal = self.rules.entry(rule.from.clone()).or_default();
        if let Some(existing) = by_signal.get(&rule.signal) {
            return Err(BpmnGenError::Config(format!(
                "ambiguous transition from '{}' on '{}': already routed to '{}', cannot also route to '{}'",
                rule.from, rule.signal, existing, rule.to
            )));
        }
        by_signal.insert(rule.signal, rule.to);
        self.len += 1;
        Ok(())
    }

    /// The state that follows `from` on `signal`, `None` when `from` is terminal for it.
    pub fn next(
        &self,
        from: &str,
        signal: &Signal,
    ) -> Option<&StateId> {
        self.rules.get(from).and_then(|by_signal| by_signal.get(signal))
    }

    /// True when no rule leaves `state` at all.
    pub fn is_terminal(
        &self,
        state: &str,
    ) -> bool {
        self.rules.get(state).is_none_or(|by_signal| by_signal.is_empty())
    }

    pub fn rules(&self) -> impl Iterator<Item = TransitionRule> + '_ {
        self.rules.iter().flat_map(|(from, by_signal)| {
            by_signal.iter().map(move |(signal, to)| TransitionRule {
                from: from.clone(),
                signal: signal.clone(),
                to: to.clone(),
            })
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut table = TransitionTable::new();
        table.add(TransitionRule::new("a", "go", "b")).unwrap();
        table.add(TransitionRule::new("a", "retry", "a")).unwrap();

        assert_eq!(table.next("a", &Signal::from("go")), Some(&"b".to_string()));
        assert_eq!(table.next("a", &Signal::from("retry")), Some(&"a".to_string()));
        assert_eq!(table.next("a", &Signal::from("other")), None);
        assert_eq!(table.next("b", &Signal::from("go")), None);
        assert_eq!(table.len(), 2);
        assert!(table.is_terminal("b"));
        assert!(!table.is_terminal("a"));
    }

    #[test]
    fn test_duplicate_key_is_config_error() {
        let mut table = TransitionTable::new();
        table.add(TransitionRule::new("a", "go", "b")).unwrap();

        let err = table.add(TransitionRule::new("a", "go", "c")).unwrap_err();
        assert!(matches!(err, BpmnGenError::Config(_)));
        assert_eq!(table.next("a", &Signal::from("go")), Some(&"b".to_string()));
        assert_eq!(table.len(), 1);
    }
}
