//! Graph map types and builders
//!
//! Defines the index structures `GraphContext` keeps over a `GraphProto`.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::proto::{GraphProto, NodeProto, TensorProto, ValueInfoProto};

/// Type alias for node map: node_name → NodeProto (order preserved)
pub type NodeMap = IndexMap<String, NodeProto>;

/// Type alias for producer map: output_name → node_name
pub type ProducerMap = FxHashMap<String, String>;

/// Type alias for consumer map: tensor_name → [consumer_node_names]
///
/// A node consuming the same tensor twice is listed twice.
pub type ConsumerMap = FxHashMap<String, SmallVec<[String; 4]>>;

/// Type alias for initializer map: name → TensorProto
pub type InitializerMap = FxHashMap<String, TensorProto>;

/// Type alias for value info map: name → ValueInfoProto
pub type ValueInfoMap = FxHashMap<String, ValueInfoProto>;

/// Type alias for graph input/output maps (declaration order preserved)
pub type GraphIoMap = IndexMap<String, ValueInfoProto>;

/// Build node map from graph nodes
pub fn build_node_map(graph: &GraphProto) -> NodeMap {
    graph
        .node
        .iter()
        .map(|node| (node.name.clone(), node.clone()))
        .collect()
}

/// Build producer map from graph nodes
///
/// Maps each output tensor name to the node that produces it.
pub fn build_producer_map(graph: &GraphProto) -> ProducerMap {
    let mut map = FxHashMap::default();

    for node in &graph.node {
        for output in &node.output {
            if !output.is_empty() {
                map.insert(output.clone(), node.name.clone());
            }
        }
    }

    map
}

/// Build consumer map from graph nodes
pub fn build_consumer_map(graph: &GraphProto) -> ConsumerMap {
    let mut map: ConsumerMap = FxHashMap::default();

    for node in &graph.node {
        for input in &node.input {
            if !input.is_empty() {
                map.entry(input.clone())
                    .or_default()
                    .push(node.name.clone());
            }
        }
    }

    map
}

/// Build initializer map from graph
pub fn build_initializer_map(graph: &GraphProto) -> InitializerMap {
    graph
        .initializer
        .iter()
        .map(|t| (t.name.clone(), t.clone()))
        .collect()
}

/// Build value info map from graph
///
/// Combines graph inputs, outputs, and intermediate value_info. Intermediate
/// entries win over input/output declarations of the same name.
pub fn build_value_info_map(graph: &GraphProto) -> ValueInfoMap {
    graph
        .input
        .iter()
        .chain(&graph.output)
        .chain(&graph.value_info)
        .map(|vi| (vi.name.clone(), vi.clone()))
        .collect()
}

/// Build graph input map
pub fn build_graph_input_map(graph: &GraphProto) -> GraphIoMap {
    graph
        .input
        .iter()
        .map(|vi| (vi.name.clone(), vi.clone()))
        .collect()
}

/// Build graph output map
pub fn build_graph_output_map(graph: &GraphProto) -> GraphIoMap {
    graph
        .output
        .iter()
        .map(|vi| (vi.name.clone(), vi.clone()))
        .collect()
}
