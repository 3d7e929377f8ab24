//! Graph manipulation module for ONNX graphs
//!
//! This module provides the shared graph every rewrite runs against:
//!
//! - [`GraphContext`]: central structure for graph operations with O(1) lookups
//! - [`maps`]: type definitions and builders for graph maps
//!
//! # Example
//!
//! ```ignore
//! use rnn_scan_rewriter::graph::GraphContext;
//!
//! let mut ctx = GraphContext::new(&graph);
//!
//! let exit = ctx.get_producer("rnn/while/Exit_1:0");
//! let reshape_name = ctx.make_name("Reshape");
//! ctx.replace_all_inputs("rnn/while/Exit_1:0", "state_output_reshape:0");
//! ```
//!
//! # Maps
//!
//! | Map | Description |
//! |-----|-------------|
//! | `node_map` | node_name → NodeProto (order preserved) |
//! | `producer_map` | output_name → producer node name |
//! | `consumer_map` | tensor_name → consumer node names |
//! | `initializer_map` | name → TensorProto |
//! | `value_info_map` | name → ValueInfoProto |
//! | `graph_input_map` / `graph_output_map` | declared graph interface |

pub mod accessors;
pub mod context;
pub mod maps;
pub mod mutators;

// Re-export main types
pub use context::GraphContext;
pub use maps::{ConsumerMap, GraphIoMap, InitializerMap, NodeMap, ProducerMap, ValueInfoMap};
