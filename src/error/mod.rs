//! Error types for rnn-scan-rewriter
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Main error type for graph rewriting operations
#[derive(Error, Debug)]
pub enum TransformError {
    /// Invalid node configuration
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A node name or output id is already taken in the graph
    #[error("Name collision: {0}")]
    NameCollision(String),

    /// Loop properties are inconsistent (parallel lists out of step, etc.)
    #[error("Invalid loop properties: {0}")]
    InvalidLoop(String),

    /// The body subgraph references a value it does not declare
    #[error("Body graph is not closed: {0}")]
    OpenBodyGraph(String),

    /// A rewrite plan failed validation and was not applied
    #[error("Rewrite plan rejected: {0}")]
    PlanValidation(String),

    /// A loop region was recognized but could not be rewritten
    #[error("Rewrite of loop '{scope}' failed: {reason}")]
    RewriteFailed {
        /// While-loop scope of the region
        scope: String,
        /// Cause reported by the rewriter
        reason: String,
    },

    /// Protobuf decode error
    #[error("Protobuf decode error: {0}")]
    ProtoDecode(#[from] prost::DecodeError),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ONNX operations
pub type OnnxResult<T> = Result<T, TransformError>;
