//! Graph cleanup utilities
//!
//! Removing what a rewrite leaves behind once its consumers are gone.

use crate::graph::GraphContext;

/// Remove every node no graph output depends on
///
/// Returns the number of nodes removed. A graph without declared outputs is
/// left alone, since everything in it would count as unreachable.
pub fn prune_unreachable_nodes(ctx: &mut GraphContext) -> usize {
    if ctx.graph_output_map.is_empty() {
        log::debug!("graph '{}' declares no outputs, skipping pruning", ctx.name);
        return 0;
    }

    let unreachable = ctx.find_unreachable_nodes();
    let mut removed = 0;
    for name in &unreachable {
        if let Some(node) = ctx.remove_node(name) {
            for output in &node.output {
                ctx.remove_value_info(output);
            }
            removed += 1;
        }
    }
    removed
}
