//! Graph mutation operations
//!
//! Methods for modifying the graph structure: adding, removing, and rewiring
//! nodes. The maps are kept consistent after every call.

use crate::error::{OnnxResult, TransformError};
use crate::proto::{NodeProto, ValueInfoProto};

use super::context::GraphContext;

impl GraphContext {
    // ========================================================================
    // Node mutation
    // ========================================================================

    /// Insert a new node into the graph
    ///
    /// Fails if the node name is taken, or if one of its outputs is already
    /// produced in the graph or names a graph input or initializer.
    pub fn insert_node(&mut self, node: NodeProto) -> OnnxResult<()> {
        if self.node_map.contains_key(&node.name) {
            return Err(TransformError::NameCollision(node.name));
        }
        if let Some(output) = node
            .output
            .iter()
            .find(|o| {
                !o.is_empty()
                    && (self.producer_map.contains_key(*o)
                        || self.is_graph_input(o)
                        || self.is_initializer(o))
            })
        {
            return Err(TransformError::NameCollision(output.clone()));
        }

        let name = node.name.clone();

        for output in &node.output {
            if !output.is_empty() {
                self.producer_map.insert(output.clone(), name.clone());
            }
        }

        for input in &node.input {
            if !input.is_empty() {
                self.consumer_map
                    .entry(input.clone())
                    .or_default()
                    .push(name.clone());
            }
        }

        self.node_map.insert(name, node);
        Ok(())
    }

    /// Remove a node from the graph
    ///
    /// Consumers of its outputs are left untouched.
    pub fn remove_node(&mut self, name: &str) -> Option<NodeProto> {
        let node = self.node_map.shift_remove(name)?;

        for output in &node.output {
            if self.producer_map.get(output).is_some_and(|p| p == name) {
                self.producer_map.remove(output);
            }
        }

        for input in &node.input {
            if let Some(consumers) = self.consumer_map.get_mut(input) {
                consumers.retain(|n| n != name);
                if consumers.is_empty() {
                    self.consumer_map.remove(input);
                }
            }
        }

        Some(node)
    }

    /// Redirect every node input referencing `old` to `new`
    ///
    /// Returns the number of input slots rewritten. Graph outputs are not
    /// renamed.
    pub fn replace_all_inputs(&mut self, old: &str, new: &str) -> usize {
        if old == new {
            return 0;
        }
        let consumers = match self.consumer_map.remove(old) {
            Some(consumers) => consumers,
            None => return 0,
        };

        let mut replaced = 0;
        for consumer in &consumers {
            if let Some(node) = self.node_map.get_mut(consumer) {
                // A node listed twice has both slots fixed on the first visit.
                for input in node.input.iter_mut().filter(|i| i.as_str() == old) {
                    *input = new.to_string();
                    replaced += 1;
                }
            }
        }

        self.consumer_map
            .entry(new.to_string())
            .or_default()
            .extend(consumers);

        replaced
    }

    // ========================================================================
    // Value info mutation
    // ========================================================================

    /// Add or update value info
    pub fn set_value_info(&mut self, vi: ValueInfoProto) {
        let name = vi.name.clone();
        self.value_info_map.insert(name, vi);
    }

    /// Remove value info
    pub fn remove_value_info(&mut self, name: &str) -> Option<ValueInfoProto> {
        self.value_info_map.remove(name)
    }

    /// Advance the name counter so later `make_name` calls do not revisit
    /// suffixes handed out elsewhere
    pub fn advance_name_counter(&mut self, counter: usize) {
        self.name_counter = self.name_counter.max(counter);
    }
}
