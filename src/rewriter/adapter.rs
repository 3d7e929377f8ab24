//! Shape adapters around the scan boundary
//!
//! Opset-8 `Scan` carries an explicit batch axis. Values entering the scan
//! get a leading unit axis, values leaving it lose that axis again. When the
//! target shape has at most one unresolved dimension it is written as a
//! constant; otherwise it is computed from the tensor at runtime.

use crate::error::{OnnxResult, TransformError};
use crate::graph::GraphContext;
use crate::proto::extensions::make_value_info;
use crate::proto::tensor_proto::DataType;
use crate::proto::{AttributeProto, NodeProto, ValueInfoProto};
use crate::tensor::{fits_reshape_target, prepend_unit_axis, strip_leading_axis};

use super::plan::RewritePlan;

/// Which side of the scan a tensor is being adapted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptDirection {
    /// Add a leading unit axis before feeding the scan
    Input,
    /// Drop the leading axis of a scan output
    Output,
}

/// Nodes implementing one adaptation, in execution order
///
/// The last node is the `Reshape` whose output is the adapted tensor.
#[derive(Debug, Clone, Default)]
pub struct AdapterChain {
    /// New nodes
    pub nodes: Vec<NodeProto>,
    /// Declarations for the tensors the chain produces
    pub value_infos: Vec<ValueInfoProto>,
}

impl AdapterChain {
    /// The adapted tensor id
    pub fn output(&self) -> Option<&str> {
        self.nodes
            .last()
            .and_then(|n| n.output.first())
            .map(String::as_str)
    }

    /// Op types of the chain, in order
    pub fn op_types(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.op_type.as_str()).collect()
    }

    /// Hand the chain over to `plan`, returning the adapted tensor id
    pub fn commit(self, plan: &mut RewritePlan) -> OnnxResult<String> {
        let output = self
            .output()
            .map(str::to_string)
            .ok_or_else(|| TransformError::Internal("empty adapter chain".to_string()))?;
        for node in self.nodes {
            plan.add_node(node);
        }
        for vi in self.value_infos {
            plan.declare(vi);
        }
        Ok(output)
    }

    fn push(&mut self, node: NodeProto) -> String {
        let output = node.output.first().cloned().unwrap_or_default();
        self.nodes.push(node);
        output
    }
}

/// Build the nodes that reshape `tensor_id` across the scan boundary
///
/// Names of the `Reshape` and of target-shape constants are scoped under
/// `target_name`. The declared output shape is unknown when the source
/// shape is.
pub fn adapt_scan_tensor(
    plan: &mut RewritePlan,
    graph: &GraphContext,
    target_name: &str,
    tensor_id: &str,
    direction: AdaptDirection,
) -> OnnxResult<AdapterChain> {
    let shape = plan.tensor_shape(graph, tensor_id);
    let dtype = plan.tensor_elem_type(graph, tensor_id);

    let target = match direction {
        AdaptDirection::Input => shape.as_deref().map(prepend_unit_axis),
        AdaptDirection::Output => shape.as_deref().map(strip_leading_axis),
    };

    let mut chain = AdapterChain::default();

    let target_id = match target.as_deref() {
        Some(values) if fits_reshape_target(values) => {
            constant(&mut chain, plan, graph, target_name, values)
        }
        _ => {
            log::debug!(
                "{}: shape of {} is {:?}, computing reshape target at runtime",
                target_name,
                tensor_id,
                shape
            );
            match direction {
                AdaptDirection::Input => runtime_input_target(&mut chain, plan, graph, target_name, tensor_id),
                AdaptDirection::Output => runtime_output_target(&mut chain, plan, graph, tensor_id),
            }
        }
    };

    let reshape = plan.new_node(
        graph,
        "Reshape",
        vec![tensor_id.to_string(), target_id],
        Vec::new(),
        1,
        Some(target_name),
    );
    chain
        .value_infos
        .push(make_value_info(&reshape.output[0], dtype, target.as_deref()));
    chain.push(reshape);

    Ok(chain)
}

fn constant(
    chain: &mut AdapterChain,
    plan: &mut RewritePlan,
    graph: &GraphContext,
    scope: &str,
    values: &[i64],
) -> String {
    let node = plan.new_const(graph, scope, values);
    chain.value_infos.push(make_value_info(
        &node.output[0],
        Some(DataType::Int64 as i32),
        Some(&[values.len() as i64]),
    ));
    chain.push(node)
}

/// `Concat([1], Shape(x))`
fn runtime_input_target(
    chain: &mut AdapterChain,
    plan: &mut RewritePlan,
    graph: &GraphContext,
    target_name: &str,
    tensor_id: &str,
) -> String {
    let shape = plan.new_node(graph, "Shape", vec![tensor_id.to_string()], Vec::new(), 1, None);
    let shape = chain.push(shape);
    let unit = constant(chain, plan, graph, target_name, &[1]);
    let concat = plan.new_node(
        graph,
        "Concat",
        vec![unit, shape],
        vec![AttributeProto::new_int("axis", 0)],
        1,
        None,
    );
    chain.push(concat)
}

/// `Shape(x)[1:]`
///
/// Slice does not accept int64 on older runtimes, so the shape makes a round
/// trip through float.
fn runtime_output_target(
    chain: &mut AdapterChain,
    plan: &mut RewritePlan,
    graph: &GraphContext,
    tensor_id: &str,
) -> String {
    let shape = plan.new_node(graph, "Shape", vec![tensor_id.to_string()], Vec::new(), 1, None);
    let shape = chain.push(shape);

    let to_float = plan.new_node(
        graph,
        "Cast",
        vec![shape],
        vec![AttributeProto::new_int("to", DataType::Float as i64)],
        1,
        None,
    );
    let to_float = chain.push(to_float);

    let slice = plan.new_node(
        graph,
        "Slice",
        vec![to_float],
        vec![
            AttributeProto::new_ints("axes", vec![0]),
            AttributeProto::new_ints("starts", vec![1]),
            AttributeProto::new_ints("ends", vec![i64::MAX]),
        ],
        1,
        None,
    );
    let slice = chain.push(slice);

    let to_int = plan.new_node(
        graph,
        "Cast",
        vec![slice],
        vec![AttributeProto::new_int("to", DataType::Int64 as i64)],
        1,
        None,
    );
    chain.push(to_int)
}
