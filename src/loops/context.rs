//! A discovered loop region and its extracted body

use super::properties::LoopProperties;
use super::variable::TensorValueInfo;

/// The per-iteration computation of a loop, detached from control flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellGraph {
    /// Names of the interior nodes in the enclosing graph
    pub nodes: Vec<String>,
    /// Designated outputs: state outputs then scan outputs
    pub outputs: Vec<TensorValueInfo>,
}

/// One while-loop region handed to a loop rewriter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopContext {
    /// Scope of the while-loop, with trailing slash (`"rnn/while/"`)
    pub while_context_scope: String,
    /// Classified loop-carried values
    pub loop_properties: LoopProperties,
    /// Extracted body
    pub cell_graph: CellGraph,
}

impl LoopContext {
    /// Create a loop context
    pub fn new(while_context_scope: &str, loop_properties: LoopProperties, cell_graph: CellGraph) -> Self {
        Self {
            while_context_scope: while_context_scope.to_string(),
            loop_properties,
            cell_graph,
        }
    }
}
