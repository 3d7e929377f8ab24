//! Loop-to-Scan rewriting
//!
//! Recognizes TensorFlow `dynamic_rnn` while-loops and replaces each with an
//! opset-8 `Scan`:
//!
//! - [`convention`]: naming the recognizer relies on
//! - [`classify`]: role of each loop-carried variable
//! - [`adapter`]: batch-axis reshapes at the scan boundary
//! - [`synth`]: body subgraph and `Scan` node
//! - [`reconnect`]: wiring scan outputs to the old exits' consumers
//! - [`plan`]: transactional application of all of the above
//! - [`custom_rnn`]: the rewriter tying them together
//! - [`pipeline`]: running a rewriter over every region
//!
//! # Example
//!
//! ```ignore
//! use rnn_scan_rewriter::rewriter::{rewrite_model, RewriteConfig};
//!
//! let (model, report) = rewrite_model(&model, regions, RewriteConfig::default())?;
//! for scope in &report.failed {
//!     eprintln!("left {} as a while-loop", scope);
//! }
//! ```

pub mod adapter;
pub mod classify;
pub mod config;
pub mod convention;
pub mod custom_rnn;
pub mod pipeline;
pub mod plan;
pub mod reconnect;
pub mod synth;

pub use adapter::{adapt_scan_tensor, AdaptDirection, AdapterChain};
pub use classify::{classify_variables, Classification};
pub use config::RewriteConfig;
pub use convention::{DynamicRnnConvention, LoopNamingConvention};
pub use custom_rnn::{CustomRnnContext, CustomRnnRewriter};
pub use pipeline::{LoopRewritePipeline, RewriteReport};
pub use plan::RewritePlan;
pub use reconnect::plan_output_reconnection;
pub use synth::{build_body_graph, plan_scan_node};

use crate::builder::build_model;
use crate::error::OnnxResult;
use crate::graph::GraphContext;
use crate::loops::LoopContext;
use crate::proto::ModelProto;

/// Rewrite the `dynamic_rnn` loops of a model
///
/// `regions` are the loop regions found in the model's graph. Returns the
/// rebuilt model and what happened to each region.
pub fn rewrite_model(
    model: &ModelProto,
    regions: Vec<LoopContext>,
    config: RewriteConfig,
) -> OnnxResult<(ModelProto, RewriteReport)> {
    let mut ctx = GraphContext::from_model(model)?;

    let pipeline = LoopRewritePipeline::new(CustomRnnRewriter::new(config.clone())).with_config(config);
    let report = pipeline.run(&mut ctx, regions)?;

    Ok((build_model(&ctx, model), report))
}
