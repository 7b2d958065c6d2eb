//! Key/value bag threaded through the state machine.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{BpmnGenError, Result};

/// Well-known payload keys shared by the generation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PayloadKey {
    SessionId,
    Request,
    Model,
    Temperature,
    Context,
    RawResponse,
    Graph,
    FlowModel,
    ValidationErrors,
    Attempt,
}

/// Extensible bag of typed entries.
///
/// Entries are stored as JSON values and read back through serde, so any
/// `Serialize + DeserializeOwned` type can travel between states. A state only
/// changes the entries it explicitly sets or removes.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Payload {
    entries: Map<String, Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an entry, replacing any previous value.
    ///
    /// A value that cannot be serialized is stored as `null` and logged; use
    /// [`Payload::try_set`] to handle that case.
    pub fn set<K, V>(
        &mut self,
        key: K,
        value: V,
    ) where
        K: AsRef<str>,
        V: Serialize,
    {
        let key = key.as_ref();
        if let Err(err) = self.try_set(key, value) {
            warn!(key, error = %err, "payload entry is not serializable, storing null");
            self.entries.insert(key.to_string(), Value::Null);
        }
    }

    /// Set an entry, failing with [`BpmnGenError::Convert`] when the value
    /// cannot be serialized. The previous value is kept in that case.
    pub fn try_set<K, V>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<()>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let value = serde_json::to_value(value)?;
        self.entries.insert(key.as_ref().to_string(), value);
        Ok(())
    }

    /// Builder-style [`Payload::set`].
    pub fn with<K, V>(
        mut self,
        key: K,
        value: V,
    ) -> Self
    where
        K: AsRef<str>,
        V: Serialize,
    {
        self.set(key, value);
        self
    }

    /// Get an entry, `None` when absent or not convertible to `T`.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: impl AsRef<str>,
    ) -> Option<T> {
        self.entries.get(key.as_ref()).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get an entry that a state cannot run without.
    pub fn require<T: DeserializeOwned>(
        &self,
        key: impl AsRef<str>,
    ) -> Result<T> {
        let key = key.as_ref();
        let value = self.entries.get(key).ok_or_else(|| BpmnGenError::Payload(format!("missing payload entry '{key}'")))?;
        serde_json::from_value(value.clone()).map_err(|e| BpmnGenError::Payload(format!("invalid payload entry '{key}': {e}")))
    }

    pub fn contains(
        &self,
        key: impl AsRef<str>,
    ) -> bool {
        self.entries.contains_key(key.as_ref())
    }

    pub fn remove(
        &mut self,
        key: impl AsRef<str>,
    ) -> Option<Value> {
        self.entries.remove(key.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(entries) => Self {
                entries,
            },
            _ => Self::default(),
        }
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        Value::Object(payload.entries)
    }
}
