//! The pipeline states.
//!
//! Each state reads the payload entries it needs, does one step and adds or
//! replaces the entries it produces. The order they run in is defined by the
//! transition rules in [`super::pipeline_rules`].

mod compile;
mod complete;
mod prepare;
mod start;
mod submit;
mod validate_artifact;
mod validate_response;

pub use compile::CompileArtifact;
pub use complete::Complete;
pub use prepare::PrepareRequest;
pub use start::Start;
pub use submit::SubmitToModel;
pub use validate_artifact::ValidateArtifact;
pub use validate_response::ValidateResponse;

pub const START: &str = "Start";
pub const PREPARE_REQUEST: &str = "PrepareRequest";
pub const SUBMIT_TO_MODEL: &str = "SubmitToModel";
pub const VALIDATE_RESPONSE: &str = "ValidateResponse";
pub const COMPILE_ARTIFACT: &str = "CompileArtifact";
pub const VALIDATE_ARTIFACT: &str = "ValidateArtifact";
pub const COMPLETE: &str = "Complete";

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;

    use crate::{
        BpmnGenError, Result,
        common::Cancellation,
        llm::{ModelClient, ModelSelection},
        runtime::ExecutionContext,
        session::Context,
        state::Signal,
    };

    pub const APPROVAL_REPLY: &str = r#"{
        "nodes": [
            {"id": "start", "name": "Start", "elementType": "startEvent", "connectedTo": [{"targetNode": "review"}]},
            {"id": "review", "name": "Review request", "elementType": "userTask", "connectedTo": [{"targetNode": "gate"}]},
            {"id": "gate", "name": "Approved?", "elementType": "exclusiveGateway", "connectedTo": [
                {"targetNode": "approved", "description": "approved"},
                {"targetNode": "rejected", "description": "rejected"}
            ]},
            {"id": "approved", "name": "Approved", "elementType": "endEvent"},
            {"id": "rejected", "name": "Rejected", "elementType": "endEvent"}
        ]
    }"#;

    pub fn ctx() -> ExecutionContext {
        ExecutionContext::new("test-execution", "test", Signal::from("advance"), Cancellation::new())
    }

    /// Model client answering from a script, recording every context it saw.
    #[derive(Default)]
    pub struct ScriptedModelClient {
        replies: Mutex<VecDeque<Result<String>>>,
        seen: Mutex<Vec<(Context, ModelSelection)>>,
    }

    impl ScriptedModelClient {
        pub fn new(replies: impl IntoIterator<Item = Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn replying(reply: &str) -> Arc<Self> {
            Self::new([Ok(reply.to_string())])
        }

        pub fn seen(&self) -> Vec<(Context, ModelSelection)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModelClient {
        async fn generate(
            &self,
            context: &Context,
            selection: &ModelSelection,
        ) -> Result<String> {
            self.seen.lock().unwrap().push((context.clone(), selection.clone()));
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Err(BpmnGenError::Model("script exhausted".to_string())))
        }
    }
}
