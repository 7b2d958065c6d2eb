use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{
    Result,
    bpmn::Compiler,
    common::{Payload, PayloadKey},
    generation::signals,
    model::GraphModel,
    runtime::ExecutionContext,
    state::{State, StateOutput},
};

pub struct CompileArtifact {
    compiler: Compiler,
}

impl CompileArtifact {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
        }
    }
}

#[async_trait]
impl State for CompileArtifact {
    fn id(&self) -> &str {
        super::COMPILE_ARTIFACT
    }

    fn description(&self) -> &str {
        "Compile the process graph into a BPMN flow model"
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        mut payload: Payload,
    ) -> Result<StateOutput> {
        let graph: GraphModel = payload.require(PayloadKey::Graph)?;

        let model = self.compiler.compile(&graph)?;
        debug!(execution_id = ctx.execution_id(), elements = model.elements.len(), flows = model.flows.len(), "flow model compiled");
        trace!(execution_id = ctx.execution_id(), "\n{}", model.describe());

        payload.set(PayloadKey::FlowModel, &model);
        Ok(StateOutput::new(signals::ADVANCE, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BpmnGenError,
        bpmn::FlowModel,
        generation::states::testing::{APPROVAL_REPLY, ctx},
        model::{ElementKind, NodeModel},
    };

    #[tokio::test]
    async fn test_compiles_graph() {
        let graph = GraphModel::from_json(APPROVAL_REPLY).unwrap();

        let output = CompileArtifact::new(Compiler::new()).invoke(&ctx(), Payload::new().with(PayloadKey::Graph, &graph)).await.unwrap();

        let model: FlowModel = output.payload.require(PayloadKey::FlowModel).unwrap();
        assert_eq!(model.elements.len(), 5);
        assert_eq!(model.flows.len(), 4);
        assert_eq!(output.payload.get::<GraphModel>(PayloadKey::Graph), Some(graph));
    }

    #[tokio::test]
    async fn test_compiler_error_is_propagated() {
        let graph = GraphModel::new(vec![NodeModel::new("task", "Task", ElementKind::UserTask)]);

        let err = CompileArtifact::new(Compiler::new()).invoke(&ctx(), Payload::new().with(PayloadKey::Graph, &graph)).await.unwrap_err();
        assert_eq!(
            err,
            BpmnGenError::NoStartEvent {
                found: 0
            }
        );
    }
}
