use serde::{Deserialize, Serialize};

/// Outbound edge of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionModel {
    pub target_node: String,
    /// Condition text; only meaningful when the source is a gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ConnectionModel {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_node: target.into(),
            description: None,
        }
    }

    pub fn with_description(
        mut self,
        description: impl Into<String>,
    ) -> Self {
        self.description = Some(description.into());
        self
    }
}
