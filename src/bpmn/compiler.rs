//! Graph-to-flow-model compiler.
//!
//! Compilation walks the graph breadth-first from the single start node with
//! a FIFO worklist. Every node gets exactly one flow element however many
//! edges reach it; an edge into an already emitted element only adds a
//! sequence flow. The walk is iterative, so cycles and re-convergent branches
//! terminate.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use crate::{
    BpmnGenError, Result,
    bpmn::{FlowElement, FlowElementKind, FlowModel, SequenceFlow},
    model::{ElementKind, GraphModel, NodeModel},
};

/// Id of the generated process.
pub const PROCESS_ID: &str = "process";
/// Prefix of generated sequence flow ids.
const SEQUENCE_FLOW_PREFIX: &str = "seq-";

/// Compile `graph` with the default [`Compiler`].
pub fn compile(graph: &GraphModel) -> Result<FlowModel> {
    Compiler::new().compile(graph)
}

#[derive(Debug, Clone)]
pub struct Compiler {
    check_edges: bool,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            check_edges: true,
        }
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every edge target is checked before traversal (the default).
    ///
    /// With the check off, a missing target is only noticed when the walk
    /// reaches it and is reported as [`BpmnGenError::UnresolvedTarget`].
    pub fn check_edges(
        mut self,
        check: bool,
    ) -> Self {
        self.check_edges = check;
        self
    }

    pub fn compile(
        &self,
        graph: &GraphModel,
    ) -> Result<FlowModel> {
        let nodes = index_nodes(graph)?;
        let start = find_start(graph)?;

        if self.check_edges {
            check_edges(graph, &nodes)?;
        }

        let model = Walk::new(&nodes).run(start)?;
        debug!(elements = model.elements.len(), flows = model.flows.len(), "compiled flow model");
        Ok(model)
    }
}

fn index_nodes(graph: &GraphModel) -> Result<HashMap<&str, &NodeModel>> {
    if graph.nodes.is_empty() {
        return Err(BpmnGenError::NilGraph);
    }

    let mut nodes = HashMap::with_capacity(graph.nodes.len());
    for (idx, node) in graph.nodes.iter().enumerate() {
        if node.id.trim().is_empty() {
            return Err(BpmnGenError::NilNode(format!("node at position {idx} has no id")));
        }
        if nodes.insert(node.id.as_str(), node).is_some() {
            return Err(BpmnGenError::DuplicateNode(node.id.clone()));
        }
    }
    Ok(nodes)
}

fn find_start(graph: &GraphModel) -> Result<&NodeModel> {
    let starts: Vec<&NodeModel> = graph.start_nodes().collect();
    match starts.as_slice() {
        [start] => Ok(start),
        _ => Err(BpmnGenError::NoStartEvent {
            found: starts.len(),
        }),
    }
}

fn check_edges(
    graph: &GraphModel,
    nodes: &HashMap<&str, &NodeModel>,
) -> Result<()> {
    for node in &graph.nodes {
        for edge in &node.connected_to {
            if !nodes.contains_key(edge.target_node.as_str()) {
                return Err(BpmnGenError::DanglingEdge {
                    node: node.id.clone(),
                    target: edge.target_node.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Traversal state of one compilation.
struct Walk<'a> {
    nodes: &'a HashMap<&'a str, &'a NodeModel>,
    emitted: HashSet<&'a str>,
    model: FlowModel,
    next_flow: usize,
}

impl<'a> Walk<'a> {
    fn new(nodes: &'a HashMap<&'a str, &'a NodeModel>) -> Self {
        Self {
            nodes,
            emitted: HashSet::new(),
            model: FlowModel::new(PROCESS_ID),
            next_flow: 0,
        }
    }

    fn run(
        mut self,
        start: &'a NodeModel,
    ) -> Result<FlowModel> {
        let mut worklist: VecDeque<&'a str> = VecDeque::new();

        self.emit_element(start);
        worklist.push_back(start.id.as_str());

        while let Some(id) = worklist.pop_front() {
            if !self.emitted.contains(id) {
                return Err(BpmnGenError::MissingGeneratedElement(id.to_string()));
            }
            let source = self.nodes.get(id).copied().ok_or_else(|| BpmnGenError::UnresolvedTarget(id.to_string()))?;

            for edge in &source.connected_to {
                let target = self.nodes.get(edge.target_node.as_str()).copied().ok_or_else(|| BpmnGenError::UnresolvedTarget(edge.target_node.clone()))?;

                if !self.emitted.contains(target.id.as_str()) {
                    self.emit_element(target);
                    worklist.push_back(target.id.as_str());
                }

                let condition = if source.element_type.is_gateway() {
                    edge.description.as_deref().map(str::trim).filter(|d| !d.is_empty()).map(str::to_string)
                } else {
                    None
                };
                self.emit_flow(&source.id, &target.id, condition);
            }
        }

        Ok(self.model)
    }

    fn emit_element(
        &mut self,
        node: &'a NodeModel,
    ) {
        if let ElementKind::Unrecognized(raw) = &node.element_type {
            trace!(node = %node.id, kind = %raw, "unrecognized element kind, emitting manual task");
        }

        self.emitted.insert(node.id.as_str());
        self.model.elements.push(FlowElement {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: FlowElementKind::from(&node.element_type),
        });
    }

    fn emit_flow(
        &mut self,
        source: &str,
        target: &str,
        condition: Option<String>,
    ) {
        let id = format!("{SEQUENCE_FLOW_PREFIX}{}", self.next_flow);
        self.next_flow += 1;

        self.model.flows.push(SequenceFlow {
            id,
            source_ref: source.to_string(),
            target_ref: target.to_string(),
            condition,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::model::ElementKind::*;

    fn node(
        id: &str,
        kind: ElementKind,
    ) -> NodeModel {
        NodeModel::new(id, id.to_uppercase(), kind)
    }

    fn approval_graph() -> GraphModel {
        GraphModel::new(vec![
            node("start", StartEvent).to("review"),
            node("review", UserTask).to("gate"),
            node("gate", ExclusiveGateway).to_when("approved", "approved").to_when("rejected", "rejected"),
            node("approved", EndEvent),
            node("rejected", EndEvent),
        ])
    }

    #[test]
    fn test_approval_example() {
        let model = compile(&approval_graph()).unwrap();

        assert_eq!(model.process_id, PROCESS_ID);
        assert_eq!(model.elements.len(), 5);
        assert_eq!(model.flows.len(), 4);

        let ids: Vec<_> = model.elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "review", "gate", "approved", "rejected"]);
        assert_eq!(model.element("gate").map(|e| e.kind), Some(FlowElementKind::ExclusiveGateway));
        assert_eq!(model.element("review").map(|e| e.name.as_str()), Some("REVIEW"));

        let from_gate: Vec<_> = model.outgoing("gate").map(|f| (f.target_ref.as_str(), f.condition.as_deref())).collect();
        assert_eq!(from_gate, vec![("approved", Some("approved")), ("rejected", Some("rejected"))]);

        assert!(model.outgoing("start").all(|f| f.condition.is_none()));
        assert!(model.outgoing("review").all(|f| f.condition.is_none()));
    }

    #[test]
    fn test_flow_ids_are_sequential() {
        let model = compile(&approval_graph()).unwrap();
        let ids: Vec<_> = model.flows.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["seq-0", "seq-1", "seq-2", "seq-3"]);
    }

    #[test]
    fn test_reconvergence_emits_target_once() {
        let graph = GraphModel::new(vec![
            node("start", StartEvent).to("split"),
            node("split", InclusiveGateway).to_when("a", "left").to_when("b", "right"),
            node("a", ServiceTask).to("join"),
            node("b", ScriptTask).to("join"),
            node("join", ManualTask).to("end"),
            node("end", EndEvent),
        ]);

        let model = compile(&graph).unwrap();

        assert_eq!(model.elements.iter().filter(|e| e.id == "join").count(), 1);
        let into_join: Vec<_> = model.incoming("join").collect();
        assert_eq!(into_join.len(), 2);
        assert_ne!(into_join[0].id, into_join[1].id);
        assert_eq!(model.elements.len(), 6);
        assert_eq!(model.flows.len(), 6);
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = GraphModel::new(vec![
            node("start", StartEvent).to("work"),
            node("work", UserTask).to("check"),
            node("check", ExclusiveGateway).to_when("work", "redo").to_when("end", "done"),
            node("end", EndEvent),
        ]);

        let model = compile(&graph).unwrap();

        assert_eq!(model.elements.len(), 4);
        assert_eq!(model.flows.len(), 4);
        assert_eq!(model.incoming("work").count(), 2);
        let redo = model.flows.iter().find(|f| f.source_ref == "check" && f.target_ref == "work").unwrap();
        assert_eq!(redo.condition.as_deref(), Some("redo"));
    }

    #[test]
    fn test_parallel_edges_get_distinct_ids() {
        let graph = GraphModel::new(vec![
            node("start", StartEvent).to("gate"),
            node("gate", ExclusiveGateway).to_when("end", "approve").to_when("end", "reject"),
            node("end", EndEvent),
        ]);

        let model = compile(&graph).unwrap();

        let between: Vec<_> = model.flows.iter().filter(|f| f.source_ref == "gate" && f.target_ref == "end").collect();
        assert_eq!(between.len(), 2);
        assert_ne!(between[0].id, between[1].id);
        let unique: HashSet<_> = model.flows.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(unique.len(), model.flows.len());
    }

    #[test]
    fn test_non_gateway_edges_are_unconditional() {
        let graph = GraphModel::new(vec![node("start", StartEvent).to_when("task", "ignored"), node("task", UserTask).to_when("end", "also ignored"), node("end", EndEvent)]);

        let model = compile(&graph).unwrap();
        assert!(model.flows.iter().all(|f| f.condition.is_none()));
    }

    #[test]
    fn test_blank_gateway_description_is_unconditional() {
        let graph = GraphModel::new(vec![node("start", StartEvent).to("gate"), node("gate", ExclusiveGateway).to_when("end", "   "), node("end", EndEvent)]);

        let model = compile(&graph).unwrap();
        assert_eq!(model.outgoing("gate").next().and_then(|f| f.condition.clone()), None);
    }

    #[test]
    fn test_kind_mapping_and_fallback() {
        let graph = GraphModel::new(vec![
            node("start", StartEvent).to("rule").to("odd"),
            node("rule", BusinessRuleTask),
            node("odd", ElementKind::parse("sequenceFlow")),
        ]);

        let model = compile(&graph).unwrap();
        assert_eq!(model.element("rule").map(|e| e.kind), Some(FlowElementKind::BusinessRuleTask));
        assert_eq!(model.element("odd").map(|e| e.kind), Some(FlowElementKind::ManualTask));
    }

    #[test]
    fn test_branch_may_end_without_end_event() {
        let graph = GraphModel::new(vec![node("start", StartEvent).to("task"), node("task", UserTask)]);

        let model = compile(&graph).unwrap();
        assert_eq!(model.elements.len(), 2);
        assert_eq!(model.outgoing("task").count(), 0);
    }

    #[test]
    fn test_unreachable_nodes_are_not_emitted() {
        let graph = GraphModel::new(vec![node("start", StartEvent).to("end"), node("end", EndEvent), node("island", UserTask).to("end")]);

        let model = compile(&graph).unwrap();
        assert!(model.element("island").is_none());
        assert_eq!(model.elements.len(), 2);
    }

    #[test]
    fn test_no_start_event() {
        let graph = GraphModel::new(vec![node("task", UserTask).to("end"), node("end", EndEvent)]);
        assert_eq!(
            compile(&graph).unwrap_err(),
            BpmnGenError::NoStartEvent {
                found: 0
            }
        );
    }

    #[test]
    fn test_two_start_events() {
        let graph = GraphModel::new(vec![node("s1", StartEvent).to("end"), node("s2", StartEvent).to("end"), node("end", EndEvent)]);
        assert_eq!(
            compile(&graph).unwrap_err(),
            BpmnGenError::NoStartEvent {
                found: 2
            }
        );
    }

    #[test]
    fn test_dangling_edge() {
        let graph = GraphModel::new(vec![node("start", StartEvent).to("nowhere")]);
        assert_eq!(
            compile(&graph).unwrap_err(),
            BpmnGenError::DanglingEdge {
                node: "start".to_string(),
                target: "nowhere".to_string(),
            }
        );
    }

    #[test]
    fn test_unresolved_target_when_not_prechecked() {
        let graph = GraphModel::new(vec![node("start", StartEvent).to("task"), node("task", UserTask).to("nowhere")]);

        let err = Compiler::new().check_edges(false).compile(&graph).unwrap_err();
        assert_eq!(err, BpmnGenError::UnresolvedTarget("nowhere".to_string()));
    }

    #[test]
    fn test_empty_graph() {
        assert_eq!(compile(&GraphModel::default()).unwrap_err(), BpmnGenError::NilGraph);
    }

    #[test]
    fn test_node_without_id() {
        let graph = GraphModel::new(vec![node("start", StartEvent), node("", UserTask)]);
        assert!(matches!(compile(&graph).unwrap_err(), BpmnGenError::NilNode(_)));
    }

    #[test]
    fn test_duplicate_node_id() {
        let graph = GraphModel::new(vec![node("start", StartEvent), node("start", UserTask)]);
        assert_eq!(compile(&graph).unwrap_err(), BpmnGenError::DuplicateNode("start".to_string()));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let graph = approval_graph();
        assert_eq!(compile(&graph).unwrap(), compile(&graph).unwrap());
    }
}
