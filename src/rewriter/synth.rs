//! Scan node synthesis
//!
//! Turns an extracted loop body into a self-contained subgraph and builds
//! the opset-8 `Scan` node that runs it.

use rustc_hash::FxHashSet;

use crate::error::{OnnxResult, TransformError};
use crate::graph::GraphContext;
use crate::loops::{LoopContext, LoopProperties, TensorValueInfo};
use crate::proto::extensions::make_value_info;
use crate::proto::{AttributeProto, GraphProto, NodeProto, TensorProto, ValueInfoProto};
use crate::tensor::prepend_unit_axis;

use super::plan::RewritePlan;

// ============================================================================
// Body graph
// ============================================================================

fn declare(info: &TensorValueInfo, what: &str) -> OnnxResult<ValueInfoProto> {
    let id = info
        .id()
        .ok_or_else(|| TransformError::InvalidLoop(format!("{} has no tensor id", what)))?;
    Ok(make_value_info(id, info.dtype, info.shape.as_deref()))
}

/// Build the scan body from a region's cell graph
///
/// Inputs are the state inputs followed by the scan inputs, outputs are the
/// cell outputs. Initializers and `Constant` nodes the body reads from the
/// enclosing graph are copied in; any other outside reference is an error.
pub fn build_body_graph(graph: &GraphContext, region: &LoopContext, name: &str) -> OnnxResult<GraphProto> {
    let props = &region.loop_properties;
    let cell = &region.cell_graph;

    if cell.outputs.len() != props.output_count() {
        return Err(TransformError::InvalidLoop(format!(
            "cell graph has {} outputs, loop carries {}",
            cell.outputs.len(),
            props.output_count()
        )));
    }

    let input = props
        .state_inputs
        .iter()
        .chain(&props.scan_inputs)
        .map(|info| declare(info, "body input"))
        .collect::<OnnxResult<Vec<_>>>()?;
    let output = cell
        .outputs
        .iter()
        .map(|info| declare(info, "body output"))
        .collect::<OnnxResult<Vec<_>>>()?;

    let mut cell_nodes = Vec::with_capacity(cell.nodes.len());
    for node_name in &cell.nodes {
        let node = graph.get_node(node_name).ok_or_else(|| {
            TransformError::InvalidLoop(format!("cell node '{}' is not in the graph", node_name))
        })?;
        cell_nodes.push(node.clone());
    }

    // ordered independently of the enclosing graph
    let cell_ctx = GraphContext::new(&GraphProto {
        node: cell_nodes,
        ..Default::default()
    });

    let mut defined: FxHashSet<&str> = input.iter().map(|vi| vi.name.as_str()).collect();
    defined.extend(cell_ctx.producer_map.keys().map(String::as_str));

    let mut constants: Vec<NodeProto> = Vec::new();
    let mut initializers: Vec<TensorProto> = Vec::new();
    let mut captured: FxHashSet<&str> = FxHashSet::default();

    for node in cell_ctx.nodes() {
        for id in node.input.iter().filter(|i| !i.is_empty()) {
            if defined.contains(id.as_str()) || captured.contains(id.as_str()) {
                continue;
            }
            if let Some(init) = graph.get_initializer(id) {
                initializers.push(init.clone());
            } else if let Some(producer) = graph.get_producer(id).filter(|p| p.is_op_type("Constant")) {
                constants.push(producer.clone());
            } else {
                return Err(TransformError::OpenBodyGraph(format!(
                    "'{}' reads '{}' from outside the loop body",
                    node.name, id
                )));
            }
            captured.insert(id.as_str());
        }
    }

    if let Some(open) = output
        .iter()
        .find(|vi| !defined.contains(vi.name.as_str()) && !captured.contains(vi.name.as_str()))
    {
        return Err(TransformError::OpenBodyGraph(format!(
            "body output '{}' is not computed inside the loop body",
            open.name
        )));
    }

    let boundary: FxHashSet<&str> = input
        .iter()
        .chain(&output)
        .map(|vi| vi.name.as_str())
        .collect();
    let value_info = cell_ctx
        .nodes()
        .flat_map(|n| n.output.iter())
        .filter(|id| !id.is_empty() && !boundary.contains(id.as_str()))
        .filter_map(|id| graph.get_value_info(id).cloned())
        .collect();

    let mut node = constants;
    node.extend(
        cell_ctx
            .topological_order()
            .into_iter()
            .filter_map(|n| cell_ctx.get_node(n).cloned()),
    );

    Ok(GraphProto {
        name: name.to_string(),
        node,
        initializer: initializers,
        input,
        output,
        value_info,
        ..Default::default()
    })
}

// ============================================================================
// Scan node
// ============================================================================

/// Add the `Scan` node for a loop to `plan`
///
/// `initial_values` are the adapted state initial values followed by the
/// adapted sequence inputs. Every exit with an id gets a declared scan output
/// of shape `[1] + exit.shape`, and the node producing it is scheduled for
/// removal. Returns the scan node's name and outputs.
pub fn plan_scan_node(
    plan: &mut RewritePlan,
    graph: &GraphContext,
    props: &LoopProperties,
    initial_values: Vec<String>,
    body: GraphProto,
    scope: &str,
) -> OnnxResult<(String, Vec<String>)> {
    let expected = props.state_inputs.len() + props.scan_inputs.len();
    if initial_values.len() != expected {
        return Err(TransformError::InvalidLoop(format!(
            "scan needs {} initial values, got {}",
            expected,
            initial_values.len()
        )));
    }

    let mut inputs = Vec::with_capacity(initial_values.len() + 1);
    // no sequence_lens: every batch entry runs the full sequence
    inputs.push(String::new());
    inputs.extend(initial_values);

    let attributes = vec![
        AttributeProto::new_int("num_scan_inputs", props.scan_inputs.len() as i64),
        AttributeProto::new_graph("body", body),
    ];

    let scan = plan.new_node(graph, "Scan", inputs, attributes, props.output_count(), Some(scope));

    for (exit, output) in props.exits().zip(&scan.output) {
        let Some(id) = exit.id() else {
            continue;
        };
        let shape = exit.shape.as_deref().map(prepend_unit_axis);
        plan.declare(make_value_info(output, exit.dtype, shape.as_deref()));
        if let Some(producer) = graph.get_producer_name(id) {
            plan.remove_node(producer);
        }
    }

    let name = scan.name.clone();
    let outputs = scan.output.clone();
    plan.add_node(scan);
    Ok((name, outputs))
}
