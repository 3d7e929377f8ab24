//! Running a loop rewriter over every loop region of a graph

use crate::builder::prune_unreachable_nodes;
use crate::error::{OnnxResult, TransformError};
use crate::graph::GraphContext;
use crate::loops::LoopContext;
use crate::traits::{LoopRewriter, RewriterResult};

use super::config::RewriteConfig;

/// What happened to each region, by while-loop scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Regions replaced by a scan
    pub rewritten: Vec<String>,
    /// Regions the rewriter did not recognize
    pub skipped: Vec<String>,
    /// Regions recognized but left in place after a failed rewrite
    pub failed: Vec<String>,
    /// Nodes removed by pruning afterwards
    pub nodes_pruned: usize,
}

impl RewriteReport {
    /// Number of regions seen
    pub fn total(&self) -> usize {
        self.rewritten.len() + self.skipped.len() + self.failed.len()
    }
}

/// Applies one rewriter to a sequence of loop regions
#[derive(Debug, Clone)]
pub struct LoopRewritePipeline<R> {
    rewriter: R,
    config: RewriteConfig,
}

impl<R: LoopRewriter> LoopRewritePipeline<R> {
    /// Create a pipeline
    pub fn new(rewriter: R) -> Self {
        Self {
            rewriter,
            config: RewriteConfig::default(),
        }
    }

    /// Configure the pipeline
    pub fn with_config(mut self, config: RewriteConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the rewriter
    pub fn rewriter(&self) -> &R {
        &self.rewriter
    }

    /// Rewrite every region the rewriter recognizes
    ///
    /// A failed region stays in the graph untouched. With
    /// `continue_on_error` unset the first failure is returned as
    /// [`TransformError::RewriteFailed`]; rewrites already applied are kept.
    pub fn run(&self, graph: &mut GraphContext, regions: Vec<LoopContext>) -> OnnxResult<RewriteReport> {
        let mut report = RewriteReport::default();

        for region in regions {
            let scope = region.while_context_scope.clone();
            let mut context = self.rewriter.create_context(region);

            if !self.rewriter.need_rewrite(&mut context, graph) {
                report.skipped.push(scope);
                continue;
            }

            match self.rewriter.rewrite(&context, graph) {
                RewriterResult::Ok => report.rewritten.push(scope),
                RewriterResult::Fail => {
                    log::warn!(
                        "{}: recurrent loop {} detected but not converted",
                        self.rewriter.name(),
                        scope
                    );
                    if !self.config.continue_on_error {
                        return Err(TransformError::RewriteFailed {
                            scope,
                            reason: format!("{} could not rewrite the loop", self.rewriter.name()),
                        });
                    }
                    report.failed.push(scope);
                }
            }
        }

        if self.config.prune_dead_nodes && !report.rewritten.is_empty() {
            report.nodes_pruned = prune_unreachable_nodes(graph);
            log::info!("pruned {} nodes after loop rewriting", report.nodes_pruned);
        }

        Ok(report)
    }
}
