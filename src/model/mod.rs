mod edge;
mod graph;
mod node;

pub use edge::ConnectionModel;
pub use graph::GraphModel;
pub use node::{ElementKind, NodeModel};
