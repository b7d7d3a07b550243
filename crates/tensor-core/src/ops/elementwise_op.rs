// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise operations: ReLU, affine rescale and bias add.

use super::{check_same_shape, last_dim};
use crate::{Tensor, TensorError, TensorView};

/// Applies `max(x, 0)` element-wise.
pub fn relu(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    check_same_shape("relu", input, output)?;

    for (d, &x) in output.as_f32_slice_mut().iter_mut().zip(input.as_f32_slice()) {
        *d = x.max(0.0);
    }
    Ok(())
}

/// Applies `x * scale + offset` element-wise.
///
/// Image graphs use this to map raw `0..=255` pixel values into the range
/// the network was trained on (e.g. `scale = 1/127.5, offset = -1`).
pub fn rescale(
    input: &TensorView<'_>,
    scale: f32,
    offset: f32,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    check_same_shape("rescale", input, output)?;

    for (d, &x) in output.as_f32_slice_mut().iter_mut().zip(input.as_f32_slice()) {
        *d = x * scale + offset;
    }
    Ok(())
}

/// Adds a 1-D `bias` to every row of `input` along the last dimension.
pub fn bias_add(
    input: &TensorView<'_>,
    bias: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    check_same_shape("bias_add", input, output)?;
    let last_dim = last_dim("bias_add", input.shape())?;

    if bias.shape().rank() != 1 || bias.shape().num_elements() != last_dim {
        return Err(TensorError::ShapeMismatch {
            op: "bias_add (bias)",
            lhs: bias.shape().clone(),
            rhs: input.shape().clone(),
        });
    }
    if last_dim == 0 {
        return Ok(());
    }

    let b = bias.as_f32_slice();
    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();
    for (row_src, row_dst) in src.chunks_exact(last_dim).zip(dst.chunks_exact_mut(last_dim)) {
        for ((d, &x), &bj) in row_dst.iter_mut().zip(row_src).zip(b) {
            *d = x + bj;
        }
    }
    Ok(())
}
