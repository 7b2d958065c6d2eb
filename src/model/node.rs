use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ConnectionModel;

/// Element kind of a node in the intermediate graph.
///
/// Parsing is forgiving: case and the separators `-`, `_` and space are
/// ignored and the short forms (`user`, `exclusive`, ...) are accepted.
/// Anything else is kept verbatim as [`ElementKind::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    StartEvent,
    EndEvent,
    UserTask,
    ServiceTask,
    ScriptTask,
    ManualTask,
    BusinessRuleTask,
    ExclusiveGateway,
    InclusiveGateway,
    Unrecognized(String),
}

impl ElementKind {
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw.chars().filter(|c| !matches!(c, '-' | '_' | ' ')).flat_map(char::to_lowercase).collect();

        match normalized.as_str() {
            "startevent" | "start" => ElementKind::StartEvent,
            "endevent" | "end" => ElementKind::EndEvent,
            "usertask" | "user" => ElementKind::UserTask,
            "servicetask" | "service" => ElementKind::ServiceTask,
            "scripttask" | "script" => ElementKind::ScriptTask,
            "manualtask" | "manual" => ElementKind::ManualTask,
            "businessruletask" | "businessrule" => ElementKind::BusinessRuleTask,
            "exclusivegateway" | "exclusive" => ElementKind::ExclusiveGateway,
            "inclusivegateway" | "inclusive" => ElementKind::InclusiveGateway,
            _ => ElementKind::Unrecognized(raw.to_string()),
        }
    }

    /// Canonical BPMN name, or the raw text for unrecognized kinds.
    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::StartEvent => "startEvent",
            ElementKind::EndEvent => "endEvent",
            ElementKind::UserTask => "userTask",
            ElementKind::ServiceTask => "serviceTask",
            ElementKind::ScriptTask => "scriptTask",
            ElementKind::ManualTask => "manualTask",
            ElementKind::BusinessRuleTask => "businessRuleTask",
            ElementKind::ExclusiveGateway => "exclusiveGateway",
            ElementKind::InclusiveGateway => "inclusiveGateway",
            ElementKind::Unrecognized(raw) => raw,
        }
    }

    pub fn is_gateway(&self) -> bool {
        matches!(self, ElementKind::ExclusiveGateway | ElementKind::InclusiveGateway)
    }
}

impl From<String> for ElementKind {
    fn from(raw: String) -> Self {
        ElementKind::parse(&raw)
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ElementKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the intermediate graph produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeModel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub element_type: ElementKind,
    #[serde(default)]
    pub connected_to: Vec<ConnectionModel>,
}

impl NodeModel {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        element_type: ElementKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            element_type,
            connected_to: Vec::new(),
        }
    }

    /// Builder-style outbound edge without a description.
    pub fn to(
        mut self,
        target: impl Into<String>,
    ) -> Self {
        self.connected_to.push(ConnectionModel::new(target));
        self
    }

    /// Builder-style outbound edge carrying a description.
    pub fn to_when(
        mut self,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.connected_to.push(ConnectionModel::new(target).with_description(description));
        self
    }
}
