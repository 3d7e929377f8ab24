//! Naming conventions for recognizing recurrent loops
//!
//! Recognition relies on how a producer names the values it lowers a
//! recurrent loop into. Everything name-specific lives behind
//! [`LoopNamingConvention`], so a producer that changes its naming only needs
//! a new implementation, not a new classifier.

/// Names a producer gives to the parts of a lowered recurrent loop
pub trait LoopNamingConvention {
    /// Scope that holds the loop's counter and accumulator declarations,
    /// derived from the while-loop scope
    fn rnn_scope(&self, while_scope: &str) -> String;

    /// Name of the node that initializes the step counter
    fn time_counter_name(&self, rnn_scope: &str) -> String;

    /// Name of the node that initializes the control-flow iteration counter
    fn iteration_counter_name(&self, while_scope: &str) -> String;

    /// Prefix every output accumulator's declared name must start with
    fn accumulator_prefix(&self, rnn_scope: &str) -> String;

    /// Attribute on the accumulator's declaring node holding its name
    fn accumulator_name_attr(&self) -> &str {
        "tensor_array_name"
    }
}

/// Naming used by TensorFlow's `dynamic_rnn`
///
/// `dynamic_rnn` opens the while-loop two scopes below the rnn scope
/// (`<rnn>/while/`), names its step counter `<rnn>/time` and its output
/// arrays `<rnn>/dynamic_rnn/output_<n>`. Control flow on TF 1.5+ adds
/// `<while>/iteration_counter`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicRnnConvention;

impl LoopNamingConvention for DynamicRnnConvention {
    fn rnn_scope(&self, while_scope: &str) -> String {
        let parts: Vec<&str> = while_scope.split('/').collect();
        let keep = parts.len().saturating_sub(2);
        format!("{}/", parts[..keep].join("/"))
    }

    fn time_counter_name(&self, rnn_scope: &str) -> String {
        format!("{}time", rnn_scope)
    }

    fn iteration_counter_name(&self, while_scope: &str) -> String {
        format!("{}iteration_counter", while_scope)
    }

    fn accumulator_prefix(&self, rnn_scope: &str) -> String {
        format!("{}dynamic_rnn/output_", rnn_scope)
    }
}
