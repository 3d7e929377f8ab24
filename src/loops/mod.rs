//! Loop region records
//!
//! These are the records a loop-extraction step produces for every while-loop
//! it finds and that loop rewriters consume:
//!
//! - [`LoopVariable`]: one value threaded through iterations
//! - [`LoopProperties`]: the variables split into state and sequences
//! - [`LoopContext`]: a loop region with its extracted [`CellGraph`]
//!
//! # Example
//!
//! ```ignore
//! use rnn_scan_rewriter::loops::{LoopContext, LoopProperties, CellGraph};
//!
//! let mut props = LoopProperties::new();
//! props.add_variable(time_var);
//! props.add_variable(state_var);
//! props.add_scan_input(input_ta);
//!
//! let region = LoopContext::new("rnn/while/", props, cell);
//! ```

pub mod context;
pub mod properties;
pub mod variable;

pub use context::{CellGraph, LoopContext};
pub use properties::LoopProperties;
pub use variable::{CounterKind, LoopVariable, ScanInput, TensorValueInfo, VariableRole};
