//! Model builder module
//!
//! After loop rewrites are applied to a `GraphContext`, this module assembles
//! the resulting graph and model:
//!
//! - [`model`]: graph rebuild in topological order, model assembly and
//!   structural validation
//! - [`cleanup`]: removal of nodes left unreachable by a rewrite
//!
//! # Example
//!
//! ```ignore
//! use rnn_scan_rewriter::builder::{build_model, prune_unreachable_nodes};
//!
//! prune_unreachable_nodes(&mut ctx);
//! let model = build_model(&ctx, &original_model);
//! ```

pub mod cleanup;
pub mod model;

pub use cleanup::prune_unreachable_nodes;
pub use model::{build_graph, build_model, validate_graph, SCAN_OPSET};
