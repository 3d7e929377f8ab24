//! Shape utilities for ONNX tensors
//!
//! Shapes are `Vec<i64>` with `-1` standing for an unresolved dimension.

use crate::proto::ValueInfoProto;

/// Number of unresolved dimensions in a shape
pub fn count_unresolved(shape: &[i64]) -> usize {
    shape.iter().filter(|&&d| d < 0).count()
}

/// Check whether a shape can be written as a constant Reshape target
///
/// Reshape infers at most one `-1` entry, so a target with two or more
/// unresolved dimensions has to be computed at runtime.
pub fn fits_reshape_target(shape: &[i64]) -> bool {
    count_unresolved(shape) <= 1
}

/// `[1] + shape`
pub fn prepend_unit_axis(shape: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(shape.len() + 1);
    out.push(1);
    out.extend_from_slice(shape);
    out
}

/// `shape[1..]`; a scalar shape stays empty
pub fn strip_leading_axis(shape: &[i64]) -> Vec<i64> {
    shape.get(1..).map(<[i64]>::to_vec).unwrap_or_default()
}

/// Extract shape from ValueInfoProto
pub fn shape_from_value_info(vi: &ValueInfoProto) -> Option<Vec<i64>> {
    vi.get_shape()
}
