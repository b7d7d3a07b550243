// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax activation operation.

use super::check_same_shape;
use crate::{Tensor, TensorError, TensorView};

/// Computes softmax along the last dimension: `output[i] = exp(x[i] - max) / sum(exp(x - max))`.
///
/// Uses the numerically stable variant that subtracts the row maximum
/// before exponentiation. For a batch of logits `[N, C]` every row of the
/// output is a probability vector.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
pub fn softmax(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    check_same_shape("softmax", input, output)?;

    let Some(last_dim) = input.shape().last_dim() else {
        // Scalar: softmax of a single value is 1.0.
        output.as_f32_slice_mut()[0] = 1.0;
        return Ok(());
    };
    if last_dim == 0 {
        return Ok(());
    }

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for (row_src, row_dst) in src.chunks_exact(last_dim).zip(dst.chunks_exact_mut(last_dim)) {
        let max_val = row_src.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let mut sum = 0.0f32;
        for (d, &s) in row_dst.iter_mut().zip(row_src) {
            let e = (s - max_val).exp();
            *d = e;
            sum += e;
        }

        if sum > 0.0 {
            let inv_sum = 1.0 / sum;
            row_dst.iter_mut().for_each(|d| *d *= inv_sum);
        }
    }

    Ok(())
}
