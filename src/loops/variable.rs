//! Loop-carried variables and the tensor descriptors attached to them

use crate::graph::GraphContext;

/// A tensor crossing the loop boundary
///
/// `id == None` means the value is not materialized outside the loop, which
/// happens when nothing downstream consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TensorValueInfo {
    /// Tensor id in the graph
    pub id: Option<String>,
    /// Inferred shape, `-1` for unresolved dimensions
    pub shape: Option<Vec<i64>>,
    /// ONNX element type
    pub dtype: Option<i32>,
}

impl TensorValueInfo {
    /// Describe a tensor with a known id
    pub fn new(id: &str, shape: Option<Vec<i64>>, dtype: Option<i32>) -> Self {
        Self {
            id: Some(id.to_string()),
            shape,
            dtype,
        }
    }

    /// A value that does not exist outside the loop
    pub fn absent() -> Self {
        Self::default()
    }

    /// Describe `id` using the shape and type the graph has inferred for it
    pub fn from_graph(ctx: &GraphContext, id: &str) -> Self {
        Self::new(id, ctx.get_tensor_shape(id), ctx.get_tensor_elem_type(id))
    }

    /// The id, if present
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// A value threaded through loop iterations
///
/// For a sequence-accumulator, `next_iteration_input` is the per-step slice
/// the body writes, and `exit` the stacked sequence seen after the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopVariable {
    /// Name of the Enter node that brings the value into the loop
    pub enter_name: String,
    /// Tensor fed into that Enter node from outside the loop
    pub enter_input_id: String,
    /// Whether the variable accumulates one slice per iteration
    pub is_sequence_accumulator: bool,
    /// Value of the variable at the start of an iteration
    pub switch_true_output: TensorValueInfo,
    /// Value handed to the next iteration
    pub next_iteration_input: TensorValueInfo,
    /// Value observed after the loop finishes
    pub exit: TensorValueInfo,
}

/// A sequence read slice by slice inside the loop without being loop-carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInput {
    /// Per-step slice as seen by the body
    pub body_input: TensorValueInfo,
    /// Full sequence tensor outside the loop
    pub initial_value: String,
}

/// Which counter a `Counter` variable is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    /// The step counter indexing the time axis
    Time,
    /// The iteration counter control flow adds on newer producers
    Iteration,
}

/// Classification of a loop-carried variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableRole {
    /// Loop bookkeeping, not carried into the scan body
    Counter(CounterKind),
    /// Per-step state threaded through the body
    State,
    /// Sequence built one slice per iteration
    Accumulator,
}

impl VariableRole {
    /// Check if this role is a counter of any kind
    pub fn is_counter(self) -> bool {
        matches!(self, VariableRole::Counter(_))
    }
}
