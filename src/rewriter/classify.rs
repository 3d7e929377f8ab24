//! Role classification of loop-carried variables
//!
//! Decides for every variable of a loop region whether it is a counter, a
//! state or an output accumulator, by looking at the node that feeds its
//! Enter from outside the loop.

use indexmap::IndexMap;

use crate::graph::GraphContext;
use crate::loops::{CounterKind, LoopContext, LoopVariable, VariableRole};

use super::convention::LoopNamingConvention;

/// Result of classifying one loop region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Scope derived from the while-loop scope
    pub rnn_scope: String,
    /// Role of every variable, by Enter node name
    pub roles: IndexMap<String, VariableRole>,
    /// The step counter, if one was found
    pub time_var: Option<LoopVariable>,
    /// The iteration counter, if one was found
    pub iteration_var: Option<LoopVariable>,
    /// Accumulators whose declared name is outside the rnn scope
    pub prefix_mismatches: Vec<String>,
}

impl Classification {
    /// Whether the region looks like a `dynamic_rnn` loop
    pub fn is_match(&self) -> bool {
        self.time_var.is_some() && self.prefix_mismatches.is_empty()
    }

    /// Enter names of all counter variables
    pub fn counters(&self) -> impl Iterator<Item = &str> {
        self.roles
            .iter()
            .filter(|(_, role)| role.is_counter())
            .map(|(name, _)| name.as_str())
    }
}

/// Classify every variable of `region`
///
/// A non-accumulator is a counter when the node producing its Enter input
/// carries the convention's counter name; a missing producer makes it state.
/// An accumulator matches when its declaring node names it with the
/// convention's prefix; a missing producer or attribute is a mismatch.
pub fn classify_variables<C>(graph: &GraphContext, region: &LoopContext, convention: &C) -> Classification
where
    C: LoopNamingConvention + ?Sized,
{
    let rnn_scope = convention.rnn_scope(&region.while_context_scope);
    let time_name = convention.time_counter_name(&rnn_scope);
    let iteration_name = convention.iteration_counter_name(&region.while_context_scope);
    let prefix = convention.accumulator_prefix(&rnn_scope);

    let mut result = Classification {
        rnn_scope,
        ..Default::default()
    };

    for (enter_name, var) in &region.loop_properties.all_variables {
        let producer = graph.get_producer(&var.enter_input_id);

        let role = if var.is_sequence_accumulator {
            let declared = producer.and_then(|n| n.get_attribute_str(convention.accumulator_name_attr()));
            if !declared.is_some_and(|name| name.starts_with(&prefix)) {
                log::debug!(
                    "accumulator {} declared as {:?}, expected prefix {}",
                    enter_name,
                    declared,
                    prefix
                );
                result.prefix_mismatches.push(enter_name.clone());
            }
            VariableRole::Accumulator
        } else {
            match producer.map(|n| n.name.as_str()) {
                Some(name) if name == time_name => {
                    result.time_var = Some(var.clone());
                    VariableRole::Counter(CounterKind::Time)
                }
                Some(name) if name == iteration_name => {
                    result.iteration_var = Some(var.clone());
                    VariableRole::Counter(CounterKind::Iteration)
                }
                _ => VariableRole::State,
            }
        };

        result.roles.insert(enter_name.clone(), role);
    }

    result
}
