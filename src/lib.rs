//! # rnn-scan-rewriter
//!
//! Rewrites TensorFlow `dynamic_rnn` while-loops in ONNX graphs into a single
//! opset-8 `Scan` operator.
//!
//! A TensorFlow export lowers a recurrent loop into Enter/Merge/Switch/
//! NextIteration/Exit control flow plus TensorArray reads and writes. Given
//! the loop regions a loop-extraction step found in the graph, this crate
//! recognizes the `dynamic_rnn` ones, moves their per-step computation into a
//! scan body and wires the scan in place of the loop's exits.
//!
//! ## Features
//!
//! - **Recognition**: variable roles from the producer's naming convention
//! - **Shape Adaptation**: batch-axis reshapes, static or computed at runtime
//! - **Transactional Rewrites**: every edit is validated before the graph changes
//! - **Cleanup**: the dead loop machinery is pruned afterwards
//!
//! ## Example
//!
//! ```ignore
//! use rnn_scan_rewriter::prelude::*;
//!
//! let model = ModelProto::decode(bytes.as_slice())?;
//! let (rewritten, report) = rewrite_model(&model, regions, RewriteConfig::default())?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// ============================================================================
// Module declarations
// ============================================================================

pub mod builder;
pub mod error;
pub mod graph;
pub mod loops;
pub mod proto;
pub mod rewriter;
pub mod tensor;
pub mod traits;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module - import commonly used types with `use rnn_scan_rewriter::prelude::*`
pub mod prelude {
    pub use crate::builder::{build_graph, build_model};
    pub use crate::error::{OnnxResult, TransformError};
    pub use crate::graph::GraphContext;
    pub use crate::loops::{CellGraph, LoopContext, LoopProperties, LoopVariable, ScanInput, TensorValueInfo};
    pub use crate::proto::onnx::*;
    pub use crate::rewriter::{
        rewrite_model, CustomRnnRewriter, DynamicRnnConvention, LoopRewritePipeline, RewriteConfig,
        RewriteReport,
    };
    pub use crate::traits::{LoopRewriter, RewriterResult};
}

// ============================================================================
// Crate-level re-exports
// ============================================================================

pub use error::{OnnxResult, TransformError};
pub use traits::LoopRewriter;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
