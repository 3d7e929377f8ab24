//! Shape, type and ordering queries over the graph

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::tensor::shape_from_value_info;

use super::context::GraphContext;

impl GraphContext {
    // ========================================================================
    // Shape and type queries
    // ========================================================================

    /// Get the inferred shape of a tensor
    ///
    /// `-1` marks an unresolved dimension; `None` means the rank is unknown.
    pub fn get_tensor_shape(&self, name: &str) -> Option<Vec<i64>> {
        if let Some(vi) = self.value_info_map.get(name) {
            if let Some(shape) = shape_from_value_info(vi) {
                return Some(shape);
            }
        }

        if let Some(init) = self.initializer_map.get(name) {
            return Some(init.dims.clone());
        }

        None
    }

    /// Get the element type of a tensor
    pub fn get_tensor_elem_type(&self, name: &str) -> Option<i32> {
        if let Some(vi) = self.value_info_map.get(name) {
            if let Some(elem_type) = vi.get_elem_type() {
                return Some(elem_type);
            }
        }

        self.initializer_map.get(name).map(|init| init.data_type)
    }

    // ========================================================================
    // Reachability and ordering
    // ========================================================================

    /// Names of nodes that no graph output depends on, in graph order
    pub fn find_unreachable_nodes(&self) -> Vec<String> {
        let mut reached: FxHashSet<&str> = FxHashSet::default();
        let mut stack: Vec<&str> = self
            .graph_output_map
            .keys()
            .filter_map(|out| self.producer_map.get(out))
            .map(String::as_str)
            .collect();

        while let Some(name) = stack.pop() {
            if !reached.insert(name) {
                continue;
            }
            let Some(node) = self.node_map.get(name) else {
                continue;
            };
            stack.extend(
                node.input
                    .iter()
                    .filter_map(|input| self.producer_map.get(input))
                    .map(String::as_str)
                    .filter(|p| !reached.contains(p)),
            );
        }

        self.node_map
            .keys()
            .filter(|name| !reached.contains(name.as_str()))
            .cloned()
            .collect()
    }

    /// Node names in topological order (Kahn's algorithm)
    ///
    /// Ties keep the original insertion order. Nodes on a cycle, such as the
    /// Merge/NextIteration back edge of an unrewritten loop, are appended in
    /// insertion order after everything else.
    pub fn topological_order(&self) -> Vec<&str> {
        let mut in_degree: FxHashMap<&str, usize> = FxHashMap::default();

        for (name, node) in &self.node_map {
            let preds = node
                .input
                .iter()
                .filter(|input| {
                    self.producer_map
                        .get(*input)
                        .is_some_and(|p| self.node_map.contains_key(p))
                })
                .count();
            in_degree.insert(name.as_str(), preds);
        }

        let mut queue: VecDeque<&str> = self
            .node_map
            .keys()
            .map(String::as_str)
            .filter(|name| in_degree.get(name) == Some(&0))
            .collect();

        let mut result = Vec::with_capacity(self.node_map.len());
        let mut placed = FxHashSet::default();

        while let Some(name) = queue.pop_front() {
            if !placed.insert(name) {
                continue;
            }
            result.push(name);

            let Some(node) = self.node_map.get(name) else {
                continue;
            };
            for output in node.output.iter().filter(|o| !o.is_empty()) {
                for consumer in self.get_consumer_names(output).unwrap_or_default() {
                    if let Some(count) = in_degree.get_mut(consumer.as_str()) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            queue.push_back(consumer.as_str());
                        }
                    }
                }
            }
        }

        for name in self.node_map.keys() {
            if !placed.contains(name.as_str()) {
                result.push(name.as_str());
            }
        }

        result
    }
}
