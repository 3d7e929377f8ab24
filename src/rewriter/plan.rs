//! Transactional rewrite plans
//!
//! A loop rewrite is first collected into a [`RewritePlan`] without touching
//! the graph. The plan is then validated as a whole and applied in one step;
//! a rejected plan leaves the graph exactly as it was.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{OnnxResult, TransformError};
use crate::graph::GraphContext;
use crate::proto::{AttributeProto, NodeProto, ValueInfoProto};
use crate::tensor::vec_to_tensor_i64;

/// Pending graph edits for one rewrite
#[derive(Debug, Clone, Default)]
pub struct RewritePlan {
    removals: Vec<String>,
    insertions: Vec<NodeProto>,
    value_infos: Vec<ValueInfoProto>,
    rewires: Vec<(String, String)>,
    name_counter: usize,
    reserved: FxHashSet<String>,
}

impl RewritePlan {
    /// Start an empty plan against `graph`
    pub fn new(graph: &GraphContext) -> Self {
        Self {
            name_counter: graph.name_counter(),
            ..Default::default()
        }
    }

    // ========================================================================
    // Naming
    // ========================================================================

    /// Mint a name unused in the graph and in this plan
    ///
    /// The name's `:0` output id is kept free as well.
    pub fn fresh_name(&mut self, graph: &GraphContext, prefix: &str) -> String {
        let reserved = &self.reserved;
        let name = graph.next_free_name(prefix, &mut self.name_counter, |n| {
            let output = format!("{}:0", n);
            reserved.contains(n) || reserved.contains(&output) || graph.is_name_taken(&output)
        });
        self.reserved.insert(name.clone());
        name
    }

    /// Build a node with a fresh name and outputs `{name}:{i}`
    ///
    /// The node is not added to the plan.
    pub fn new_node(
        &mut self,
        graph: &GraphContext,
        op_type: &str,
        inputs: Vec<String>,
        attributes: Vec<AttributeProto>,
        output_count: usize,
        scope: Option<&str>,
    ) -> NodeProto {
        let prefix = match scope {
            Some(scope) => format!("{}/{}", scope, op_type),
            None => op_type.to_string(),
        };
        let name = self.fresh_name(graph, &prefix);
        let output: Vec<String> = (0..output_count).map(|i| format!("{}:{}", name, i)).collect();
        self.reserved.extend(output.iter().cloned());

        NodeProto {
            name,
            op_type: op_type.to_string(),
            input: inputs,
            output,
            attribute: attributes,
            ..Default::default()
        }
    }

    /// Build an int64 `Constant` node holding `values`
    pub fn new_const(&mut self, graph: &GraphContext, scope: &str, values: &[i64]) -> NodeProto {
        let mut node = self.new_node(graph, "Constant", Vec::new(), Vec::new(), 1, Some(scope));
        let tensor = vec_to_tensor_i64(values, &node.output[0]);
        node.attribute.push(AttributeProto::new_tensor("value", tensor));
        node
    }

    // ========================================================================
    // Collecting edits
    // ========================================================================

    /// Schedule removal of an existing node
    pub fn remove_node(&mut self, name: &str) {
        if !self.removals.iter().any(|r| r == name) {
            self.removals.push(name.to_string());
        }
    }

    /// Schedule insertion of a node, returning its first output
    pub fn add_node(&mut self, node: NodeProto) -> String {
        let output = node.output.first().cloned().unwrap_or_default();
        self.insertions.push(node);
        output
    }

    /// Schedule a value info declaration
    pub fn declare(&mut self, vi: ValueInfoProto) {
        self.value_infos.retain(|existing| existing.name != vi.name);
        self.value_infos.push(vi);
    }

    /// Schedule redirecting every consumer of `old` to `new`
    pub fn rewire(&mut self, old: &str, new: &str) {
        self.rewires.push((old.to_string(), new.to_string()));
    }

    /// Nodes scheduled for removal
    pub fn removals(&self) -> &[String] {
        &self.removals
    }

    /// Nodes scheduled for insertion
    pub fn insertions(&self) -> &[NodeProto] {
        &self.insertions
    }

    /// Scheduled rewires as `(old, new)`
    pub fn rewires(&self) -> &[(String, String)] {
        &self.rewires
    }

    // ========================================================================
    // Queries that see pending declarations
    // ========================================================================

    fn declared(&self, name: &str) -> Option<&ValueInfoProto> {
        self.value_infos.iter().find(|vi| vi.name == name)
    }

    /// Shape of a tensor, preferring declarations made in this plan
    pub fn tensor_shape(&self, graph: &GraphContext, name: &str) -> Option<Vec<i64>> {
        match self.declared(name) {
            Some(vi) => vi.get_shape(),
            None => graph.get_tensor_shape(name),
        }
    }

    /// Element type of a tensor, preferring declarations made in this plan
    pub fn tensor_elem_type(&self, graph: &GraphContext, name: &str) -> Option<i32> {
        match self.declared(name) {
            Some(vi) => vi.get_elem_type(),
            None => graph.get_tensor_elem_type(name),
        }
    }

    // ========================================================================
    // Validation and application
    // ========================================================================

    /// Check that applying the plan leaves a well-formed graph
    ///
    /// Every inserted input must resolve, no name may collide with a
    /// surviving node or tensor, and no surviving consumer or graph output
    /// may be left reading a removed tensor.
    pub fn validate(&self, graph: &GraphContext) -> OnnxResult<()> {
        let removed: FxHashSet<&str> = self.removals.iter().map(String::as_str).collect();
        for name in &self.removals {
            if !graph.has_node(name) {
                return Err(TransformError::PlanValidation(format!(
                    "node '{}' scheduled for removal does not exist",
                    name
                )));
            }
        }

        let survives = |node: &str| !removed.contains(node);

        let mut names = FxHashSet::default();
        let mut produced: FxHashMap<&str, &str> = FxHashMap::default();
        for node in &self.insertions {
            if !names.insert(node.name.as_str()) || (graph.has_node(&node.name) && survives(&node.name)) {
                return Err(TransformError::NameCollision(node.name.clone()));
            }
            for output in node.output.iter().filter(|o| !o.is_empty()) {
                let clashes_existing = graph.get_producer_name(output).is_some_and(|p| survives(p))
                    || graph.is_graph_input(output)
                    || graph.is_initializer(output);
                if produced.insert(output, &node.name).is_some() || clashes_existing {
                    return Err(TransformError::NameCollision(output.clone()));
                }
            }
        }

        let resolves = |id: &str| {
            produced.contains_key(id)
                || (graph.is_defined(id) && graph.get_producer_name(id).map_or(true, |p| survives(p)))
        };

        for node in &self.insertions {
            if let Some(input) = node.input.iter().find(|i| !i.is_empty() && !resolves(i)) {
                return Err(TransformError::PlanValidation(format!(
                    "'{}' reads undefined tensor '{}'",
                    node.name, input
                )));
            }
        }

        let rewired: FxHashSet<&str> = self.rewires.iter().map(|(old, _)| old.as_str()).collect();
        for (old, new) in &self.rewires {
            if !produced.contains_key(new.as_str()) {
                return Err(TransformError::PlanValidation(format!(
                    "rewire of '{}' targets '{}' which the plan does not produce",
                    old, new
                )));
            }
        }

        for name in &self.removals {
            let Some(node) = graph.get_node(name) else {
                continue;
            };
            for output in node.output.iter().filter(|o| !o.is_empty()) {
                if produced.contains_key(output.as_str()) {
                    continue;
                }
                if graph.is_graph_output(output) {
                    return Err(TransformError::PlanValidation(format!(
                        "graph output '{}' loses its producer",
                        output
                    )));
                }
                let dangling = graph
                    .get_consumer_names(output)
                    .unwrap_or_default()
                    .iter()
                    .any(|c| survives(c));
                if dangling && !rewired.contains(output.as_str()) {
                    return Err(TransformError::PlanValidation(format!(
                        "'{}' is removed but still consumed",
                        output
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validate the plan and apply it to `graph`
    ///
    /// Edits are staged on a copy and committed only when all of them
    /// succeed.
    pub fn apply(self, graph: &mut GraphContext) -> OnnxResult<()> {
        self.validate(graph)?;

        let mut staged = graph.clone();

        let mut stale = Vec::new();
        for name in &self.removals {
            if let Some(node) = staged.remove_node(name) {
                stale.extend(node.output);
            }
        }

        let produced: FxHashSet<String> = self
            .insertions
            .iter()
            .flat_map(|n| n.output.iter().cloned())
            .collect();
        for tensor in stale {
            if !produced.contains(&tensor) && !staged.is_graph_output(&tensor) {
                staged.remove_value_info(&tensor);
            }
        }

        for node in self.insertions {
            staged.insert_node(node)?;
        }
        for vi in self.value_infos {
            staged.set_value_info(vi);
        }
        for (old, new) in &self.rewires {
            staged.replace_all_inputs(old, new);
        }

        staged.advance_name_counter(self.name_counter);
        *graph = staged;
        Ok(())
    }
}
