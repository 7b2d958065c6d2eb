//! Compiled flow-diagram model.

use serde::{Deserialize, Serialize};

use crate::model::ElementKind;

/// Kind of a generated flow element.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FlowElementKind {
    StartEvent,
    EndEvent,
    UserTask,
    ServiceTask,
    ScriptTask,
    ManualTask,
    BusinessRuleTask,
    ExclusiveGateway,
    InclusiveGateway,
}

impl FlowElementKind {
    pub fn is_gateway(&self) -> bool {
        matches!(self, FlowElementKind::ExclusiveGateway | FlowElementKind::InclusiveGateway)
    }
}

impl From<&ElementKind> for FlowElementKind {
    /// Unrecognized kinds fall back to a manual task.
    fn from(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::StartEvent => FlowElementKind::StartEvent,
            ElementKind::EndEvent => FlowElementKind::EndEvent,
            ElementKind::UserTask => FlowElementKind::UserTask,
            ElementKind::ServiceTask => FlowElementKind::ServiceTask,
            ElementKind::ScriptTask => FlowElementKind::ScriptTask,
            ElementKind::ManualTask => FlowElementKind::ManualTask,
            ElementKind::BusinessRuleTask => FlowElementKind::BusinessRuleTask,
            ElementKind::ExclusiveGateway => FlowElementKind::ExclusiveGateway,
            ElementKind::InclusiveGateway => FlowElementKind::InclusiveGateway,
            ElementKind::Unrecognized(_) => FlowElementKind::ManualTask,
        }
    }
}

/// A task, event or gateway of the compiled model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowElement {
    pub id: String,
    pub name: String,
    pub kind: FlowElementKind,
}

/// Directed connector between two flow elements.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SequenceFlow {
    pub id: String,
    pub source_ref: String,
    pub target_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Output of the graph compiler.
///
/// Elements are kept in emission order (breadth-first from the start
/// element), flows in creation order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowModel {
    pub process_id: String,
    pub elements: Vec<FlowElement>,
    pub flows: Vec<SequenceFlow>,
}

impl FlowModel {
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            elements: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn element(
        &self,
        id: &str,
    ) -> Option<&FlowElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn flow(
        &self,
        id: &str,
    ) -> Option<&SequenceFlow> {
        self.flows.iter().find(|f| f.id == id)
    }

    pub fn start_elements(&self) -> impl Iterator<Item = &FlowElement> {
        self.elements.iter().filter(|e| e.kind == FlowElementKind::StartEvent)
    }

    pub fn outgoing<'a>(
        &'a self,
        id: &'a str,
    ) -> impl Iterator<Item = &'a SequenceFlow> + 'a {
        self.flows.iter().filter(move |f| f.source_ref == id)
    }

    pub fn incoming<'a>(
        &'a self,
        id: &'a str,
    ) -> impl Iterator<Item = &'a SequenceFlow> + 'a {
        self.flows.iter().filter(move |f| f.target_ref == id)
    }

    /// Output a human-readable representation of the model
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("=== Process '{}' ===", self.process_id));
        lines.push(format!("Elements: {}, Flows: {}", self.elements.len(), self.flows.len()));
        lines.push(String::new());

        lines.push("--- Elements ---".to_string());
        for element in &self.elements {
            lines.push(format!("[{}] {} (kind: {})", element.id, element.name, element.kind.as_ref()));
        }
        lines.push(String::new());

        lines.push("--- Flows ---".to_string());
        for flow in &self.flows {
            match &flow.condition {
                Some(condition) => lines.push(format!("{} --[{}]--> {} (id: {})", flow.source_ref, condition, flow.target_ref, flow.id)),
                None => lines.push(format!("{} --> {} (id: {})", flow.source_ref, flow.target_ref, flow.id)),
            }
        }
        lines.push(String::new());

        lines.push("--- Structure ---".to_string());
        for element in &self.elements {
            let targets: Vec<&str> = self.outgoing(&element.id).map(|f| f.target_ref.as_str()).collect();
            if targets.is_empty() {
                lines.push(format!("{} -> (end)", element.id));
            } else {
                lines.push(format!("{} -> {}", element.id, targets.join(", ")));
            }
        }

        lines.join("\n")
    }
}
