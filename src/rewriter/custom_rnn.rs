//! Rewriter for TensorFlow `dynamic_rnn` while-loops
//!
//! A matched loop is replaced by a single opset-8 `Scan`:
//!
//! ```text
//!   h0 ──Enter──Merge──Switch──[cell]──NextIteration─┐      h0 ─Reshape─┐
//!               ^                                    │                  Scan ─Reshape─ h_T
//!               └────────────────────────────────────┘      x ──Reshape─┘     └Reshape─ y
//!   x ──TensorArrayScatter──...──Exit── h_T
//! ```
//!
//! Loop counters are dropped; the scan's implicit iteration replaces them.

use indexmap::IndexMap;

use crate::error::{OnnxResult, TransformError};
use crate::graph::GraphContext;
use crate::loops::{LoopContext, LoopVariable, VariableRole};
use crate::traits::{LoopRewriter, RewriteContext};

use super::adapter::{adapt_scan_tensor, AdaptDirection};
use super::classify::classify_variables;
use super::config::RewriteConfig;
use super::convention::{DynamicRnnConvention, LoopNamingConvention};
use super::plan::RewritePlan;
use super::reconnect::plan_output_reconnection;
use super::synth::{build_body_graph, plan_scan_node};

/// What the rewriter learned about one loop region
#[derive(Debug, Clone, Default)]
pub struct CustomRnnContext {
    /// The region being rewritten
    pub region: LoopContext,
    /// Scope derived from the while-loop scope, once matched
    pub rnn_scope: Option<String>,
    /// The step counter
    pub time_var: Option<LoopVariable>,
    /// The iteration counter, on producers that add one
    pub iteration_var: Option<LoopVariable>,
    /// Role of every loop-carried variable
    pub roles: IndexMap<String, VariableRole>,
    /// Exits of counters that are still read after the loop
    ///
    /// These are not reconnected, so their producers keep the original loop
    /// reachable next to the scan.
    pub live_counter_exits: Vec<String>,
}

impl RewriteContext for CustomRnnContext {
    fn loop_context(&self) -> &LoopContext {
        &self.region
    }
}

/// Rewrites `dynamic_rnn` loops into `Scan`
#[derive(Debug, Clone)]
pub struct CustomRnnRewriter<C = DynamicRnnConvention> {
    convention: C,
    config: RewriteConfig,
}

impl CustomRnnRewriter {
    /// Create a rewriter for the `dynamic_rnn` naming
    pub fn new(config: RewriteConfig) -> Self {
        Self::with_convention(DynamicRnnConvention, config)
    }
}

impl Default for CustomRnnRewriter {
    fn default() -> Self {
        Self::new(RewriteConfig::default())
    }
}

impl<C: LoopNamingConvention> CustomRnnRewriter<C> {
    /// Create a rewriter for a different naming convention
    pub fn with_convention(convention: C, config: RewriteConfig) -> Self {
        Self { convention, config }
    }

    /// Get the configuration
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    fn adapt_inputs(
        &self,
        plan: &mut RewritePlan,
        graph: &GraphContext,
        ids: &[String],
        target_name: &str,
    ) -> OnnxResult<Vec<String>> {
        ids.iter()
            .map(|id| {
                adapt_scan_tensor(plan, graph, target_name, id, AdaptDirection::Input)?.commit(plan)
            })
            .collect()
    }
}

impl<C: LoopNamingConvention> LoopRewriter for CustomRnnRewriter<C> {
    type Context = CustomRnnContext;

    fn name(&self) -> &'static str {
        "CustomRnnRewriter"
    }

    fn create_context(&self, region: LoopContext) -> CustomRnnContext {
        CustomRnnContext {
            region,
            ..Default::default()
        }
    }

    fn need_rewrite(&self, context: &mut CustomRnnContext, graph: &GraphContext) -> bool {
        let scope = context.region.while_context_scope.clone();
        let classification = classify_variables(graph, &context.region, &self.convention);

        if !classification.is_match() {
            log::debug!(
                "{}: {} is not a dynamic_rnn loop (time counter found: {}, prefix mismatches: {:?})",
                self.name(),
                scope,
                classification.time_var.is_some(),
                classification.prefix_mismatches
            );
            return false;
        }

        if context.region.loop_properties.scan_inputs.is_empty() {
            log::debug!("{}: {} reads no sequence input, skipping", self.name(), scope);
            return false;
        }

        if let Some(time_var) = &classification.time_var {
            log::debug!("{}: {} uses {} as time counter", self.name(), scope, time_var.enter_name);
        }

        let counters: Vec<String> = classification.counters().map(str::to_string).collect();
        let mut live_counter_exits = Vec::new();
        for name in &counters {
            let props = &mut context.region.loop_properties;
            if let Some(exit) = props.all_variables.get(name).and_then(|v| v.exit.id.clone()) {
                log::warn!(
                    "{}: counter {} of {} is read after the loop through {}, the loop will stay in the graph",
                    self.name(),
                    name,
                    scope,
                    exit
                );
                live_counter_exits.push(exit);
            }
            props.remove_state_variable(name);
        }

        context.rnn_scope = Some(classification.rnn_scope);
        context.time_var = classification.time_var;
        context.iteration_var = classification.iteration_var;
        context.roles = classification.roles;
        context.live_counter_exits = live_counter_exits;
        true
    }

    fn try_rewrite(&self, context: &CustomRnnContext, graph: &mut GraphContext) -> OnnxResult<String> {
        let region = &context.region;
        let props = &region.loop_properties;
        let rnn_scope = context.rnn_scope.as_deref().ok_or_else(|| TransformError::RewriteFailed {
            scope: region.while_context_scope.clone(),
            reason: "region was not matched".to_string(),
        })?;

        props.validate()?;
        log::debug!(
            "{}: rewriting {} with {} states and {} sequence inputs",
            self.name(),
            region.while_context_scope,
            props.state_inputs.len(),
            props.scan_inputs.len()
        );

        let mut plan = RewritePlan::new(graph);

        let mut initial_values =
            self.adapt_inputs(&mut plan, graph, &props.state_inputs_initial_values, "state_input_reshape")?;
        initial_values.extend(self.adapt_inputs(
            &mut plan,
            graph,
            &props.scan_inputs_initial_values,
            "scan_input_reshape",
        )?);

        let body = build_body_graph(graph, region, &format!("{}body", rnn_scope))?;
        let (scan_name, scan_outputs) = plan_scan_node(
            &mut plan,
            graph,
            props,
            initial_values,
            body,
            &self.config.scan_scope,
        )?;

        plan_output_reconnection(&mut plan, graph, props, &scan_outputs)?;
        plan.apply(graph)?;

        log::info!(
            "{}: replaced {} with {}",
            self.name(),
            region.while_context_scope,
            scan_name
        );
        Ok(scan_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loops::{CellGraph, CounterKind, LoopProperties, ScanInput, TensorValueInfo};
    use crate::proto::extensions::make_node;
    use crate::proto::{AttributeProto, GraphProto};

    fn var(enter: &str, input: &str, accumulator: bool) -> LoopVariable {
        LoopVariable {
            enter_name: enter.to_string(),
            enter_input_id: input.to_string(),
            is_sequence_accumulator: accumulator,
            switch_true_output: TensorValueInfo::new(&format!("{}_in", enter), Some(vec![4]), Some(1)),
            next_iteration_input: TensorValueInfo::new(&format!("{}_out", enter), Some(vec![4]), Some(1)),
            exit: TensorValueInfo::absent(),
        }
    }

    fn make_test_graph() -> GraphProto {
        let mut ta = make_node("TensorArrayV3", &["n"], &["ta:0", "ta:1"], "rnn/TensorArray");
        ta.attribute.push(AttributeProto::new_string(
            "tensor_array_name",
            "rnn/dynamic_rnn/output_0",
        ));
        GraphProto {
            node: vec![make_node("Constant", &[], &["rnn/time:0"], "rnn/time"), ta],
            ..Default::default()
        }
    }

    fn make_region(with_scan_input: bool) -> LoopContext {
        let mut props = LoopProperties::new();
        props.add_variable(var("rnn/while/Enter", "rnn/time:0", false));
        props.add_variable(var("rnn/while/Enter_1", "ta:1", true));
        props.add_variable(var("rnn/while/Enter_2", "h0", false));
        if with_scan_input {
            props.add_scan_input(ScanInput {
                body_input: TensorValueInfo::new("x_t", Some(vec![4]), Some(1)),
                initial_value: "x".to_string(),
            });
        }
        LoopContext::new("rnn/while/", props, CellGraph::default())
    }

    #[test]
    fn test_need_rewrite_records_classification() {
        let graph = GraphContext::new(&make_test_graph());
        let rewriter = CustomRnnRewriter::default();
        let mut context = rewriter.create_context(make_region(true));

        assert!(rewriter.need_rewrite(&mut context, &graph));
        assert_eq!(context.rnn_scope.as_deref(), Some("rnn/"));
        assert_eq!(context.time_var.as_ref().unwrap().enter_name, "rnn/while/Enter");
        assert!(context.iteration_var.is_none());
        assert_eq!(
            context.roles["rnn/while/Enter"],
            VariableRole::Counter(CounterKind::Time)
        );

        // the counter no longer shows up as scan state
        let props = &context.region.loop_properties;
        assert_eq!(props.state_variables, vec!["rnn/while/Enter_2"]);
        assert_eq!(props.output_count(), 2);
        assert!(context.live_counter_exits.is_empty());
    }

    #[test]
    fn test_need_rewrite_records_consumed_counter_exit() {
        let graph = GraphContext::new(&make_test_graph());
        let rewriter = CustomRnnRewriter::default();

        let mut time = var("rnn/while/Enter", "rnn/time:0", false);
        time.exit = TensorValueInfo::new("rnn/while/Exit:0", Some(vec![]), Some(6));
        let mut props = LoopProperties::new();
        props.add_variable(time);
        props.add_variable(var("rnn/while/Enter_1", "ta:1", true));
        props.add_scan_input(ScanInput {
            body_input: TensorValueInfo::new("x_t", Some(vec![4]), Some(1)),
            initial_value: "x".to_string(),
        });
        let region = LoopContext::new("rnn/while/", props, CellGraph::default());
        let mut context = rewriter.create_context(region);

        assert!(rewriter.need_rewrite(&mut context, &graph));
        assert_eq!(context.live_counter_exits, vec!["rnn/while/Exit:0"]);
        assert!(context.region.loop_properties.state_outputs_exits.is_empty());
    }

    #[test]
    fn test_need_rewrite_requires_scan_input() {
        let graph = GraphContext::new(&make_test_graph());
        let rewriter = CustomRnnRewriter::default();
        let mut context = rewriter.create_context(make_region(false));

        assert!(!rewriter.need_rewrite(&mut context, &graph));
        assert!(context.rnn_scope.is_none());
    }

    #[test]
    fn test_rewrite_unmatched_context_fails() {
        let mut graph = GraphContext::new(&make_test_graph());
        let rewriter = CustomRnnRewriter::default();
        let context = rewriter.create_context(make_region(true));

        assert!(matches!(
            rewriter.try_rewrite(&context, &mut graph),
            Err(TransformError::RewriteFailed { .. })
        ));
        assert_eq!(rewriter.rewrite(&context, &mut graph), crate::traits::RewriterResult::Fail);
        assert_eq!(graph.node_count(), 2);
    }
}
