use serde::{Deserialize, Serialize};

use crate::{
    BpmnGenError, Result,
    model::{ElementKind, NodeModel},
};

/// Intermediate graph: nodes in a fixed order with their outbound edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
}

impl GraphModel {
    pub fn new(nodes: Vec<NodeModel>) -> Self {
        Self {
            nodes,
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<GraphModel>(s).map_err(|e| BpmnGenError::Convert(format!("invalid graph: {e}")))
    }

    pub fn node(
        &self,
        id: &str,
    ) -> Option<&NodeModel> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn start_nodes(&self) -> impl Iterator<Item = &NodeModel> {
        self.nodes.iter().filter(|n| n.element_type == ElementKind::StartEvent)
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.connected_to.len()).sum()
    }
}
