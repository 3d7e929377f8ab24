//! Graph and model assembly
//!
//! Turns a rewritten `GraphContext` back into protobuf messages.

use rustc_hash::FxHashSet;

use crate::error::{OnnxResult, TransformError};
use crate::graph::GraphContext;
use crate::proto::{GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto, ValueInfoProto};

/// Lowest default-domain opset that defines `Scan`
pub const SCAN_OPSET: i64 = 8;

/// Build a GraphProto from a GraphContext
///
/// Nodes are written in topological order, so nodes inserted by a rewrite
/// come before their consumers. Initializers and value infos no node or
/// graph interface references are dropped.
pub fn build_graph(ctx: &GraphContext) -> GraphProto {
    let nodes: Vec<NodeProto> = ctx
        .topological_order()
        .into_iter()
        .filter_map(|name| ctx.get_node(name).cloned())
        .collect();

    let mut used: FxHashSet<&str> = FxHashSet::default();
    for node in &nodes {
        used.extend(node.input.iter().chain(&node.output).filter(|s| !s.is_empty()).map(String::as_str));
    }
    used.extend(ctx.graph_input_map.keys().map(String::as_str));
    used.extend(ctx.graph_output_map.keys().map(String::as_str));

    let initializers: Vec<TensorProto> = ctx
        .initializer_map
        .values()
        .filter(|t| used.contains(t.name.as_str()))
        .cloned()
        .collect();

    let inputs: Vec<ValueInfoProto> = ctx.graph_input_map.values().cloned().collect();
    let outputs: Vec<ValueInfoProto> = ctx.graph_output_map.values().cloned().collect();

    // Exclude graph inputs/outputs
    let value_info: Vec<ValueInfoProto> = ctx
        .value_info_map
        .values()
        .filter(|vi| {
            used.contains(vi.name.as_str())
                && !ctx.is_graph_input(&vi.name)
                && !ctx.is_graph_output(&vi.name)
        })
        .cloned()
        .collect();

    GraphProto {
        name: ctx.name.clone(),
        node: nodes,
        initializer: initializers,
        input: inputs,
        output: outputs,
        value_info,
        ..Default::default()
    }
}

/// Build the rewritten model from context and original model
///
/// The default-domain opset is raised to [`SCAN_OPSET`] when the graph
/// contains a `Scan` and the model imports an older one.
pub fn build_model(ctx: &GraphContext, original: &ModelProto) -> ModelProto {
    let mut model = original.clone();
    let graph = build_graph(ctx);
    let has_scan = graph.node.iter().any(|n| n.is_op_type("Scan"));
    model.graph = Some(graph);

    if has_scan {
        match model.opset_import.iter_mut().find(|o| o.domain.is_empty()) {
            Some(opset) if opset.version < SCAN_OPSET => {
                log::info!("raising default opset from {} to {}", opset.version, SCAN_OPSET);
                opset.version = SCAN_OPSET;
            }
            Some(_) => {}
            None => model.opset_import.push(OperatorSetIdProto {
                domain: String::new(),
                version: SCAN_OPSET,
            }),
        }
    }

    model
}

/// Check that a graph is well-formed
///
/// Node outputs must be unique and, walking nodes in order, every input must
/// already be defined by a graph input, an initializer or an earlier node.
pub fn validate_graph(graph: &GraphProto) -> OnnxResult<()> {
    let mut outputs = FxHashSet::default();
    for node in &graph.node {
        for output in node.output.iter().filter(|o| !o.is_empty()) {
            if !outputs.insert(output.as_str()) {
                return Err(TransformError::InvalidNode(format!(
                    "duplicate output tensor: {}",
                    output
                )));
            }
        }
    }

    let mut available: FxHashSet<&str> = graph
        .input
        .iter()
        .map(|vi| vi.name.as_str())
        .chain(graph.initializer.iter().map(|t| t.name.as_str()))
        .collect();

    for node in &graph.node {
        if let Some(input) = node.input.iter().find(|i| !i.is_empty() && !available.contains(i.as_str())) {
            return Err(TransformError::InvalidNode(format!(
                "missing input tensor: {} (required by node {})",
                input, node.name
            )));
        }
        available.extend(node.output.iter().filter(|o| !o.is_empty()).map(String::as_str));
    }

    if let Some(output) = graph.output.iter().find(|vi| !available.contains(vi.name.as_str())) {
        return Err(TransformError::InvalidNode(format!(
            "graph output {} has no producer",
            output.name
        )));
    }

    Ok(())
}
