//! Tensor utilities for ONNX graphs
//!
//! This module provides utilities for working with ONNX tensors:
//! - Shape utilities (`shape`)
//! - Building int64 TensorProtos from ndarray (`convert`)
//!
//! # Example
//!
//! ```ignore
//! use rnn_scan_rewriter::tensor::{prepend_unit_axis, vec_to_tensor_i64};
//!
//! let target = prepend_unit_axis(&[-1, 4]);
//! let shape_const = vec_to_tensor_i64(&target, "target_shape");
//! ```

pub mod convert;
pub mod shape;

// Re-export commonly used items
pub use convert::{array_to_tensor_i64, vec_to_tensor_i64};
pub use shape::{
    count_unresolved, fits_reshape_target, prepend_unit_axis,
    shape_from_value_info, strip_leading_axis,
};
