//! Graph context for ONNX graph rewriting
//!
//! `GraphContext` is the shared mutable graph every rewrite works against.
//! It maintains maps for node lookup by name and by output id, consumer
//! lookup, and the name counter used to mint collision-free node names.

use crate::error::{OnnxResult, TransformError};
use crate::proto::{GraphProto, ModelProto, NodeProto, TensorProto, ValueInfoProto};

use super::maps::{
    build_consumer_map, build_graph_input_map, build_graph_output_map, build_initializer_map,
    build_node_map, build_producer_map, build_value_info_map, ConsumerMap, GraphIoMap,
    InitializerMap, NodeMap, ProducerMap, ValueInfoMap,
};

/// Graph context for efficient graph operations
#[derive(Debug, Clone)]
pub struct GraphContext {
    /// Graph name, carried over when the graph is rebuilt
    pub name: String,

    /// Maps node name → NodeProto (preserves insertion order)
    pub node_map: NodeMap,

    /// Maps output tensor name → producer node name
    pub producer_map: ProducerMap,

    /// Maps tensor name → consumer node names
    pub consumer_map: ConsumerMap,

    /// Maps initializer name → TensorProto
    pub initializer_map: InitializerMap,

    /// Maps tensor name → ValueInfoProto (inputs + outputs + value_info)
    pub value_info_map: ValueInfoMap,

    /// Maps graph input name → ValueInfoProto
    pub graph_input_map: GraphIoMap,

    /// Maps graph output name → ValueInfoProto
    pub graph_output_map: GraphIoMap,

    /// Next suffix handed out by `make_name`
    pub(crate) name_counter: usize,
}

impl GraphContext {
    /// Create a new GraphContext from a GraphProto
    pub fn new(graph: &GraphProto) -> Self {
        Self {
            name: graph.name.clone(),
            node_map: build_node_map(graph),
            producer_map: build_producer_map(graph),
            consumer_map: build_consumer_map(graph),
            initializer_map: build_initializer_map(graph),
            value_info_map: build_value_info_map(graph),
            graph_input_map: build_graph_input_map(graph),
            graph_output_map: build_graph_output_map(graph),
            name_counter: 0,
        }
    }

    /// Create from a ModelProto
    pub fn from_model(model: &ModelProto) -> OnnxResult<Self> {
        let graph = model
            .graph
            .as_ref()
            .ok_or_else(|| TransformError::MissingField("model.graph".to_string()))?;

        Ok(Self::new(graph))
    }

    // ========================================================================
    // Node accessors
    // ========================================================================

    /// Get a node by name
    pub fn get_node(&self, name: &str) -> Option<&NodeProto> {
        self.node_map.get(name)
    }

    /// Check if a node exists
    pub fn has_node(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.node_map.len()
    }

    /// Iterate over all nodes in order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeProto> {
        self.node_map.values()
    }

    /// Iterate over node names in order
    pub fn node_names(&self) -> impl Iterator<Item = &String> {
        self.node_map.keys()
    }

    // ========================================================================
    // Graph traversal
    // ========================================================================

    /// Get the node producing a tensor
    pub fn get_producer(&self, tensor_name: &str) -> Option<&NodeProto> {
        self.producer_map
            .get(tensor_name)
            .and_then(|name| self.get_node(name))
    }

    /// Get the name of the node producing a tensor
    pub fn get_producer_name(&self, tensor_name: &str) -> Option<&String> {
        self.producer_map.get(tensor_name)
    }

    /// Get consumer node names for a tensor
    pub fn get_consumer_names(&self, tensor_name: &str) -> Option<&[String]> {
        self.consumer_map.get(tensor_name).map(|v| v.as_slice())
    }

    /// Number of node inputs referencing a tensor
    pub fn use_count(&self, tensor_name: &str) -> usize {
        self.consumer_map.get(tensor_name).map_or(0, |v| v.len())
    }

    /// Check if a tensor is a graph input
    pub fn is_graph_input(&self, name: &str) -> bool {
        self.graph_input_map.contains_key(name)
    }

    /// Check if a tensor is a graph output
    pub fn is_graph_output(&self, name: &str) -> bool {
        self.graph_output_map.contains_key(name)
    }

    /// Check if a tensor is an initializer
    pub fn is_initializer(&self, name: &str) -> bool {
        self.initializer_map.contains_key(name)
    }

    /// Check whether a tensor id resolves to a value: a node output, an
    /// initializer or a graph input
    pub fn is_defined(&self, tensor_name: &str) -> bool {
        self.producer_map.contains_key(tensor_name)
            || self.is_initializer(tensor_name)
            || self.is_graph_input(tensor_name)
    }

    // ========================================================================
    // Value info and initializer accessors
    // ========================================================================

    /// Get value info for a tensor
    pub fn get_value_info(&self, name: &str) -> Option<&ValueInfoProto> {
        self.value_info_map.get(name)
    }

    /// Get initializer by name
    pub fn get_initializer(&self, name: &str) -> Option<&TensorProto> {
        self.initializer_map.get(name)
    }

    // ========================================================================
    // Naming
    // ========================================================================

    /// Check whether a name is used by a node or by any tensor in the graph
    pub fn is_name_taken(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
            || self.producer_map.contains_key(name)
            || self.consumer_map.contains_key(name)
            || self.initializer_map.contains_key(name)
            || self.value_info_map.contains_key(name)
            || self.graph_input_map.contains_key(name)
            || self.graph_output_map.contains_key(name)
    }

    /// Current value of the name counter
    pub fn name_counter(&self) -> usize {
        self.name_counter
    }

    /// Mint a name of the form `{prefix}__{n}` that is unused in the graph
    pub fn make_name(&mut self, prefix: &str) -> String {
        let mut counter = self.name_counter;
        let name = self.next_free_name(prefix, &mut counter, |_| false);
        self.name_counter = counter;
        name
    }

    /// Find a free `{prefix}__{n}` starting from `*counter`, also avoiding
    /// names for which `reserved` returns true; `*counter` is advanced past
    /// the returned suffix
    pub fn next_free_name<F>(&self, prefix: &str, counter: &mut usize, reserved: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        loop {
            let name = format!("{}__{}", prefix, *counter);
            *counter += 1;
            if !self.is_name_taken(&name) && !reserved(&name) {
                return name;
            }
        }
    }
}
