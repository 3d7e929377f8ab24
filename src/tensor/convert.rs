//! Tensor conversion utilities
//!
//! Build ONNX TensorProtos from ndarray values. The rewriter only
//! materializes int64 shape tensors, so only that element type is covered.

use ndarray::{Array, ArrayD};

use crate::proto::tensor_proto::DataType;
use crate::proto::TensorProto;

/// Create TensorProto from i64 array
pub fn array_to_tensor_i64(array: &ArrayD<i64>, name: &str) -> TensorProto {
    let dims: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();

    TensorProto {
        dims,
        data_type: DataType::Int64 as i32,
        int64_data: array.iter().copied().collect(),
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create 1D TensorProto from i64 slice
pub fn vec_to_tensor_i64(data: &[i64], name: &str) -> TensorProto {
    let array = Array::from_vec(data.to_vec()).into_dyn();
    array_to_tensor_i64(&array, name)
}
