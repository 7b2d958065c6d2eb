//! Structural checks on a compiled [`FlowModel`].

use std::collections::{HashMap, HashSet};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::Bfs,
};

use crate::{
    BpmnGenError, Result,
    bpmn::{FlowElementKind, FlowModel},
};

/// Checks a compiled model for the properties every generated diagram must
/// have:
/// - exactly one start event, with no incoming flows
/// - unique element ids and unique flow ids
/// - every flow references existing elements
/// - every element is reachable from the start event
///
/// With `strict_end_events`, elements without outgoing flows must also be end
/// events and end events must not have outgoing flows.
#[derive(Debug, Clone, Default)]
pub struct ArtifactValidator {
    strict_end_events: bool,
}

impl ArtifactValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict_end_events(
        mut self,
        strict: bool,
    ) -> Self {
        self.strict_end_events = strict;
        self
    }

    pub fn validate(
        &self,
        model: &FlowModel,
    ) -> Result<()> {
        let violations = self.violations(model);
        if violations.is_empty() {
            return Ok(());
        }
        Err(BpmnGenError::ArtifactValidationFailed(violations.join("; ")))
    }

    /// Every violation found, in a stable order. Empty when the model is valid.
    pub fn violations(
        &self,
        model: &FlowModel,
    ) -> Vec<String> {
        let mut violations = Vec::new();

        let mut graph: DiGraph<&str, &str> = DiGraph::new();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();
        for element in &model.elements {
            if indices.contains_key(element.id.as_str()) {
                violations.push(format!("duplicate element id '{}'", element.id));
                continue;
            }
            indices.insert(element.id.as_str(), graph.add_node(element.id.as_str()));
        }

        let mut flow_ids = HashSet::new();
        for flow in &model.flows {
            if !flow_ids.insert(flow.id.as_str()) {
                violations.push(format!("duplicate flow id '{}'", flow.id));
            }
            match (indices.get(flow.source_ref.as_str()), indices.get(flow.target_ref.as_str())) {
                (Some(source), Some(target)) => {
                    graph.add_edge(*source, *target, flow.id.as_str());
                }
                (None, _) => violations.push(format!("flow '{}' references unknown source '{}'", flow.id, flow.source_ref)),
                (_, None) => violations.push(format!("flow '{}' references unknown target '{}'", flow.id, flow.target_ref)),
            }
        }

        let starts: Vec<_> = model.start_elements().collect();
        if starts.len() != 1 {
            violations.push(format!("expected exactly one start event, found {}", starts.len()));
        }

        if let [start] = starts.as_slice()
            && let Some(&start_idx) = indices.get(start.id.as_str())
        {
            if graph.neighbors_directed(start_idx, Direction::Incoming).next().is_some() {
                violations.push(format!("start event '{}' has incoming flows", start.id));
            }

            let mut reached = HashSet::new();
            let mut bfs = Bfs::new(&graph, start_idx);
            while let Some(idx) = bfs.next(&graph) {
                reached.insert(idx);
            }
            for idx in graph.node_indices().filter(|idx| !reached.contains(idx)) {
                violations.push(format!("element '{}' is not reachable from the start event", graph[idx]));
            }
        }

        if self.strict_end_events {
            for element in &model.elements {
                let Some(&idx) = indices.get(element.id.as_str()) else {
                    continue;
                };
                let has_outgoing = graph.neighbors_directed(idx, Direction::Outgoing).next().is_some();
                if !has_outgoing && element.kind != FlowElementKind::EndEvent {
                    violations.push(format!("element '{}' has no outgoing flows but is not an end event", element.id));
                }
                if has_outgoing && element.kind == FlowElementKind::EndEvent {
                    violations.push(format!("end event '{}' has outgoing flows", element.id));
                }
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bpmn::{FlowElement, SequenceFlow, compile},
        model::{ElementKind, GraphModel, NodeModel},
    };

    fn element(
        id: &str,
        kind: FlowElementKind,
    ) -> FlowElement {
        FlowElement {
            id: id.to_string(),
            name: id.to_string(),
            kind,
        }
    }

    fn flow(
        id: &str,
        source: &str,
        target: &str,
    ) -> SequenceFlow {
        SequenceFlow {
            id: id.to_string(),
            source_ref: source.to_string(),
            target_ref: target.to_string(),
            condition: None,
        }
    }

    fn linear() -> FlowModel {
        let mut model = FlowModel::new("process");
        model.elements = vec![element("start", FlowElementKind::StartEvent), element("task", FlowElementKind::UserTask), element("end", FlowElementKind::EndEvent)];
        model.flows = vec![flow("seq-0", "start", "task"), flow("seq-1", "task", "end")];
        model
    }

    #[test]
    fn test_valid_model() {
        assert!(ArtifactValidator::new().validate(&linear()).is_ok());
        assert!(ArtifactValidator::new().strict_end_events(true).validate(&linear()).is_ok());
    }

    #[test]
    fn test_compiled_model_is_valid() {
        let graph = GraphModel::new(vec![
            NodeModel::new("start", "Start", ElementKind::StartEvent).to("gate"),
            NodeModel::new("gate", "Gate", ElementKind::ExclusiveGateway).to_when("end", "yes").to_when("start", "no"),
            NodeModel::new("end", "End", ElementKind::EndEvent),
        ]);
        let model = compile(&graph).unwrap();

        // the loop back into the start event is legal for the compiler
        let violations = ArtifactValidator::new().violations(&model);
        assert_eq!(violations, vec!["start event 'start' has incoming flows".to_string()]);
    }

    #[test]
    fn test_dangling_flow() {
        let mut model = linear();
        model.flows.push(flow("seq-2", "task", "ghost"));

        let err = ArtifactValidator::new().validate(&model).unwrap_err();
        assert_eq!(err, BpmnGenError::ArtifactValidationFailed("flow 'seq-2' references unknown target 'ghost'".to_string()));
    }

    #[test]
    fn test_unreachable_element() {
        let mut model = linear();
        model.elements.push(element("island", FlowElementKind::ServiceTask));

        let violations = ArtifactValidator::new().violations(&model);
        assert_eq!(violations, vec!["element 'island' is not reachable from the start event".to_string()]);
    }

    #[test]
    fn test_duplicate_ids() {
        let mut model = linear();
        model.elements.push(element("task", FlowElementKind::UserTask));
        model.flows.push(flow("seq-1", "start", "end"));

        let violations = ArtifactValidator::new().violations(&model);
        assert!(violations.contains(&"duplicate element id 'task'".to_string()));
        assert!(violations.contains(&"duplicate flow id 'seq-1'".to_string()));
    }

    #[test]
    fn test_missing_start_event() {
        let mut model = linear();
        model.elements[0].kind = FlowElementKind::ManualTask;

        let violations = ArtifactValidator::new().violations(&model);
        assert_eq!(violations, vec!["expected exactly one start event, found 0".to_string()]);
    }

    #[test]
    fn test_strict_end_events() {
        let mut model = linear();
        model.elements[2].kind = FlowElementKind::ScriptTask;

        assert!(ArtifactValidator::new().validate(&model).is_ok());
        let violations = ArtifactValidator::new().strict_end_events(true).violations(&model);
        assert_eq!(violations, vec!["element 'end' has no outgoing flows but is not an end event".to_string()]);
    }

    #[test]
    fn test_strict_end_event_with_outgoing_flow() {
        let mut model = linear();
        model.elements.push(element("after", FlowElementKind::EndEvent));
        model.flows.push(flow("seq-2", "end", "after"));

        let violations = ArtifactValidator::new().strict_end_events(true).violations(&model);
        assert_eq!(violations, vec!["end event 'end' has outgoing flows".to_string()]);
    }
}
