// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer normalization operation.

use super::{check_same_shape, last_dim};
use crate::{Tensor, TensorError, TensorView};

/// Applies layer normalization over the last dimension:
///
/// `output = gamma * (x - mean) / sqrt(var + eps) + beta`
///
/// # Arguments
/// * `input` : the input tensor (any rank ≥ 1, normalised over last dim).
/// * `gamma` : scale parameter, 1-D with length equal to the last dimension.
/// * `beta`  : shift parameter, 1-D with length equal to the last dimension.
/// * `eps`   : small constant for numerical stability (typically 1e-5).
/// * `output`: pre-allocated output tensor (same shape as `input`).
pub fn layer_norm(
    input: &TensorView<'_>,
    gamma: &TensorView<'_>,
    beta: &TensorView<'_>,
    eps: f32,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    check_same_shape("layer_norm", input, output)?;
    let last_dim = last_dim("layer_norm", input.shape())?;

    for (name, param) in [("layer_norm (gamma)", gamma), ("layer_norm (beta)", beta)] {
        if param.shape().rank() != 1 || param.shape().num_elements() != last_dim {
            return Err(TensorError::ShapeMismatch {
                op: name,
                lhs: param.shape().clone(),
                rhs: input.shape().clone(),
            });
        }
    }
    if last_dim == 0 {
        return Ok(());
    }

    let g = gamma.as_f32_slice();
    let b = beta.as_f32_slice();
    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for (row_src, row_dst) in src.chunks_exact(last_dim).zip(dst.chunks_exact_mut(last_dim)) {
        let mean: f32 = row_src.iter().sum::<f32>() / last_dim as f32;
        let var: f32 =
            row_src.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / last_dim as f32;

        let inv_std = 1.0 / (var + eps).sqrt();
        for j in 0..last_dim {
            row_dst[j] = g[j] * (row_src[j] - mean) * inv_std + b[j];
        }
    }

    Ok(())
}
