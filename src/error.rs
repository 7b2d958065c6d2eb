//! Error types for bpmngen.
//!
//! All errors are represented by the `BpmnGenError` enum. The engine forwards
//! errors raised inside a state verbatim, so the variant a caller sees is the
//! one the failing state (or the compiler) produced.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all bpmngen operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum BpmnGenError {
    /// Invalid state machine or pipeline configuration, detected at construction.
    #[error("{0}")]
    Config(String),

    /// The requested initial state is not registered.
    #[error("unknown state '{0}'")]
    UnknownState(String),

    /// A payload entry is missing or has an unexpected type.
    #[error("{0}")]
    Payload(String),

    /// The prompt generator produced no prompt.
    #[error("prompt generation failed: {0}")]
    PromptGenerationFailed(String),

    /// The model reply is not well-formed or violates the schema.
    #[error("schema validation failed: {0}")]
    SchemaValidationFailed(String),

    /// The compiled flow model failed its structural checks.
    #[error("artifact validation failed: {0}")]
    ArtifactValidationFailed(String),

    /// The graph handed to the compiler has no nodes.
    #[error("graph has no nodes")]
    NilGraph,

    /// A node without an id.
    #[error("{0}")]
    NilNode(String),

    /// Two nodes share one id.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// The graph does not contain exactly one start event.
    #[error("expected exactly one start event, found {found}")]
    NoStartEvent {
        found: usize,
    },

    /// An edge names a node id that does not exist.
    #[error("edge from '{node}' targets missing node '{target}'")]
    DanglingEdge {
        node: String,
        target: String,
    },

    /// A node was scheduled for traversal without an emitted flow element.
    #[error("no generated element for node '{0}'")]
    MissingGeneratedElement(String),

    /// An edge target could not be resolved during traversal.
    #[error("target element does not exist: '{0}'")]
    UnresolvedTarget(String),

    /// Transport or provider error from the generative model.
    #[error("{0}")]
    Model(String),

    /// The execution was cancelled.
    #[error("execution cancelled in state '{0}'")]
    Cancelled(String),

    /// The execution exceeded the configured number of transitions.
    #[error("transition limit of {0} exceeded")]
    TransitionLimit(usize),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<std::io::Error> for BpmnGenError {
    fn from(error: std::io::Error) -> Self {
        BpmnGenError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for BpmnGenError {
    fn from(error: serde_json::Error) -> Self {
        BpmnGenError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for BpmnGenError {
    fn from(error: toml::de::Error) -> Self {
        BpmnGenError::Config(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for BpmnGenError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        BpmnGenError::SchemaValidationFailed(error.to_string())
    }
}

impl From<reqwest::Error> for BpmnGenError {
    fn from(error: reqwest::Error) -> Self {
        BpmnGenError::Model(error.to_string())
    }
}
