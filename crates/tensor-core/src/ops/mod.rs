// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor arithmetic operations.
//!
//! Each operation writes into a pre-allocated output tensor supplied by the
//! caller and validates every shape before touching data.

mod elementwise_op;
mod gelu_op;
mod layer_norm_op;
mod matmul_op;
mod pool_op;
mod softmax_op;

pub use elementwise_op::{bias_add, relu, rescale};
pub use gelu_op::gelu;
pub use layer_norm_op::layer_norm;
pub use matmul_op::matmul;
pub use pool_op::global_avg_pool;
pub use softmax_op::softmax;

use crate::{Shape, Tensor, TensorError, TensorView};

/// Checks that `input` and `output` share a shape.
pub(crate) fn check_same_shape(
    op: &'static str,
    input: &TensorView<'_>,
    output: &Tensor,
) -> Result<(), TensorError> {
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    Ok(())
}

/// Returns the innermost dimension of `shape`, rejecting scalars.
pub(crate) fn last_dim(op: &'static str, shape: &Shape) -> Result<usize, TensorError> {
    shape.last_dim().ok_or_else(|| TensorError::ShapeMismatch {
        op,
        lhs: shape.clone(),
        rhs: Shape::vector(1),
    })
}
