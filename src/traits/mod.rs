//! Core traits for rnn-scan-rewriter
//!
//! Defines the contract between a loop-rewriting framework and the rewriters
//! plugged into it.

use crate::error::OnnxResult;
use crate::graph::GraphContext;
use crate::loops::LoopContext;

/// Two-valued outcome the framework sees for a rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriterResult {
    /// The loop region was replaced
    Ok,
    /// The loop region was left as it was
    Fail,
}

/// Per-region state a rewriter keeps between matching and rewriting
pub trait RewriteContext {
    /// The loop region this context was created for
    fn loop_context(&self) -> &LoopContext;
}

impl RewriteContext for LoopContext {
    fn loop_context(&self) -> &LoopContext {
        self
    }
}

/// A rewriter for one recognized kind of loop
///
/// The framework calls `create_context` for each loop region, then
/// `need_rewrite`, and `rewrite` only when the region matched.
///
/// # Example
///
/// ```ignore
/// struct NeverMatches;
///
/// impl LoopRewriter for NeverMatches {
///     type Context = LoopContext;
///
///     fn name(&self) -> &'static str { "NeverMatches" }
///     fn create_context(&self, region: LoopContext) -> LoopContext { region }
///     fn need_rewrite(&self, _: &mut LoopContext, _: &GraphContext) -> bool { false }
///     fn try_rewrite(&self, _: &LoopContext, _: &mut GraphContext) -> OnnxResult<String> {
///         unreachable!()
///     }
/// }
/// ```
pub trait LoopRewriter {
    /// Context type created per loop region
    type Context: RewriteContext;

    /// Name of the rewriter
    fn name(&self) -> &'static str;

    /// Wrap a loop region in this rewriter's context
    fn create_context(&self, region: LoopContext) -> Self::Context;

    /// Decide whether the region has the shape this rewriter handles
    ///
    /// May record what it learned on the context.
    fn need_rewrite(&self, context: &mut Self::Context, graph: &GraphContext) -> bool;

    /// Replace the region, returning the name of the node that now stands
    /// for the loop
    ///
    /// On `Err` the graph must be unchanged.
    fn try_rewrite(&self, context: &Self::Context, graph: &mut GraphContext) -> OnnxResult<String>;

    /// Replace the region, converting any error into `RewriterResult::Fail`
    fn rewrite(&self, context: &Self::Context, graph: &mut GraphContext) -> RewriterResult {
        match self.try_rewrite(context, graph) {
            Ok(node) => {
                log::debug!("{}: loop replaced by {}", self.name(), node);
                RewriterResult::Ok
            }
            Err(err) => {
                log::error!(
                    "{} rewrite failed for '{}', due to error: {}, details: {:?}",
                    self.name(),
                    context.loop_context().while_context_scope,
                    err,
                    err
                );
                RewriterResult::Fail
            }
        }
    }
}
