//! Graph compilation into flow-diagram models.

mod compiler;
mod flow;
mod validate;

pub use compiler::{Compiler, PROCESS_ID, compile};
pub use flow::{FlowElement, FlowElementKind, FlowModel, SequenceFlow};
pub use validate::ArtifactValidator;
