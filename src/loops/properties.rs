//! Partitioned view of a loop's carried values
//!
//! `LoopProperties` keeps every loop-carried variable plus the two
//! partitions the scan rewrite consumes: per-step state and sequences.
//! The `*_initial_values`/`*_exits` lists are index-aligned with the
//! partition they belong to.

use indexmap::IndexMap;

use crate::error::{OnnxResult, TransformError};

use super::variable::{LoopVariable, ScanInput, TensorValueInfo};

/// Loop-carried values of one while-loop, split into state and sequences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopProperties {
    /// Every loop-carried variable, by Enter node name
    pub all_variables: IndexMap<String, LoopVariable>,

    /// Variable names backing each state entry
    pub state_variables: Vec<String>,
    /// Body-side value of each state at iteration start
    pub state_inputs: Vec<TensorValueInfo>,
    /// Value fed from outside the loop for each state
    pub state_inputs_initial_values: Vec<String>,
    /// Body-side value of each state at iteration end
    pub state_outputs: Vec<TensorValueInfo>,
    /// Value of each state after the loop
    pub state_outputs_exits: Vec<TensorValueInfo>,

    /// Per-step slice of each read sequence
    pub scan_inputs: Vec<TensorValueInfo>,
    /// Full sequence tensor for each read sequence
    pub scan_inputs_initial_values: Vec<String>,
    /// Variable names backing each accumulated sequence
    pub scan_variables: Vec<String>,
    /// Per-step slice written to each accumulated sequence
    pub scan_outputs: Vec<TensorValueInfo>,
    /// Stacked sequence after the loop
    pub scan_outputs_exits: Vec<TensorValueInfo>,
}

impl LoopProperties {
    /// Create empty properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loop-carried variable
    ///
    /// Accumulators become scan outputs, everything else becomes state.
    pub fn add_variable(&mut self, var: LoopVariable) {
        if var.is_sequence_accumulator {
            self.scan_variables.push(var.enter_name.clone());
            self.scan_outputs.push(var.next_iteration_input.clone());
            self.scan_outputs_exits.push(var.exit.clone());
        } else {
            self.state_variables.push(var.enter_name.clone());
            self.state_inputs.push(var.switch_true_output.clone());
            self.state_inputs_initial_values
                .push(var.enter_input_id.clone());
            self.state_outputs.push(var.next_iteration_input.clone());
            self.state_outputs_exits.push(var.exit.clone());
        }
        self.all_variables.insert(var.enter_name.clone(), var);
    }

    /// Register a sequence read inside the loop
    pub fn add_scan_input(&mut self, input: ScanInput) {
        self.scan_inputs.push(input.body_input);
        self.scan_inputs_initial_values.push(input.initial_value);
    }

    /// Drop a variable from the state partition, keeping it in
    /// `all_variables`
    ///
    /// Returns false if the variable is not a state entry.
    pub fn remove_state_variable(&mut self, name: &str) -> bool {
        let Some(index) = self.state_variables.iter().position(|v| v == name) else {
            return false;
        };
        self.state_variables.remove(index);
        self.state_inputs.remove(index);
        self.state_inputs_initial_values.remove(index);
        self.state_outputs.remove(index);
        self.state_outputs_exits.remove(index);
        true
    }

    /// Number of values the scan produces: states then sequences
    pub fn output_count(&self) -> usize {
        self.state_outputs.len() + self.scan_outputs.len()
    }

    /// Exit tensors in scan output order: states then sequences
    pub fn exits(&self) -> impl Iterator<Item = &TensorValueInfo> {
        self.state_outputs_exits
            .iter()
            .chain(&self.scan_outputs_exits)
    }

    /// Check that the parallel lists line up
    pub fn validate(&self) -> OnnxResult<()> {
        let state = [
            ("state_inputs", self.state_inputs.len()),
            (
                "state_inputs_initial_values",
                self.state_inputs_initial_values.len(),
            ),
            ("state_outputs", self.state_outputs.len()),
            ("state_outputs_exits", self.state_outputs_exits.len()),
        ];
        check_aligned("state_variables", self.state_variables.len(), &state)?;

        check_aligned(
            "scan_inputs",
            self.scan_inputs.len(),
            &[(
                "scan_inputs_initial_values",
                self.scan_inputs_initial_values.len(),
            )],
        )?;

        check_aligned(
            "scan_variables",
            self.scan_variables.len(),
            &[
                ("scan_outputs", self.scan_outputs.len()),
                ("scan_outputs_exits", self.scan_outputs_exits.len()),
            ],
        )
    }
}

fn check_aligned(base: &str, len: usize, others: &[(&str, usize)]) -> OnnxResult<()> {
    match others.iter().find(|(_, other)| *other != len) {
        Some((name, other)) => Err(TransformError::InvalidLoop(format!(
            "{} has {} entries but {} has {}",
            base, len, name, other
        ))),
        None => Ok(()),
    }
}
