//! # bpmngen
//!
//! bpmngen turns natural-language requests into validated BPMN flow models by
//! driving a generative model through a table-driven state machine.
//!
//! ## Core Features
//!
//! - **Table-Driven Engine**: states are registered as data and sequenced by `(state, signal) -> state` rules
//! - **Graph Compiler**: deterministic compilation of a typed node graph into a flow model
//! - **Sessions**: per-session prompt/reply history, safe under concurrent runs
//! - **Pluggable Collaborators**: model client, prompt generator and schema validator behind narrow traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bpmngen::{BpmnGeneration, Config, session::SessionStore};
//!
//! let generation = BpmnGeneration::builder().config(Config::create("bpmngen.toml")?).build()?;
//!
//! let session_id = SessionStore::new_session_id();
//! let result = generation.execute_model(&session_id, "an expense approval process").await?;
//! println!("{}", result.flow_model.describe());
//! ```
//!
//! The compiler can also be used on its own:
//!
//! ```rust,ignore
//! let graph = bpmngen::model::GraphModel::from_json(json_str)?;
//! let model = bpmngen::bpmn::compile(&graph)?;
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
mod runtime;
mod utils;

pub mod bpmn;
pub mod events;
pub mod generation;
pub mod llm;
pub mod model;
pub mod session;
pub mod state;

pub use builder::{GenerationBuilder, StateMachineBuilder};
pub use common::{Cancellation, Payload, PayloadKey};
pub use config::{Config, GenerationConfig, ModelConfig, SessionConfig};
pub use engine::{Execution, StateMachine};
pub use error::BpmnGenError;
pub use generation::{BpmnGeneration, GenerationResult};
pub use runtime::ExecutionContext;

/// Result type alias for bpmngen operations.
pub type Result<T> = std::result::Result<T, BpmnGenError>;
