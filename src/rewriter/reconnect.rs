//! Reconnecting scan outputs to the consumers of the old loop exits

use crate::error::{OnnxResult, TransformError};
use crate::graph::GraphContext;
use crate::loops::LoopProperties;

use super::adapter::{adapt_scan_tensor, AdaptDirection};
use super::plan::RewritePlan;

/// Adapt each scan output and redirect the consumers of its exit to it
///
/// Scan outputs are matched to exits by position, states first. Exits
/// without an id are skipped. An exit that is also a graph output is
/// re-produced by an `Identity` so the graph keeps its interface names.
/// Returns the number of exits reconnected.
pub fn plan_output_reconnection(
    plan: &mut RewritePlan,
    graph: &GraphContext,
    props: &LoopProperties,
    scan_outputs: &[String],
) -> OnnxResult<usize> {
    if scan_outputs.len() != props.output_count() {
        return Err(TransformError::InvalidLoop(format!(
            "scan has {} outputs, loop has {} exits",
            scan_outputs.len(),
            props.output_count()
        )));
    }

    let state_count = props.state_outputs_exits.len();
    let mut reconnected = 0;

    for (index, (exit, scan_output)) in props.exits().zip(scan_outputs).enumerate() {
        let Some(exit_id) = exit.id() else {
            continue;
        };

        let target_name = if index < state_count {
            "state_output_reshape"
        } else {
            "scan_output_reshape"
        };
        let chain = adapt_scan_tensor(plan, graph, target_name, scan_output, AdaptDirection::Output)?;
        let adapted = chain.commit(plan)?;
        log::debug!(
            "{} consumer(s) of {} now read {}",
            graph.use_count(exit_id),
            exit_id,
            adapted
        );
        plan.rewire(exit_id, &adapted);

        if graph.is_graph_output(exit_id) {
            let mut bridge = plan.new_node(graph, "Identity", vec![adapted], Vec::new(), 1, None);
            bridge.output = vec![exit_id.to_string()];
            plan.add_node(bridge);
        }

        reconnected += 1;
    }

    Ok(reconnected)
}
