// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Gaussian Error Linear Unit (GELU) activation.

use super::check_same_shape;
use crate::{Tensor, TensorError, TensorView};

/// Coefficient `sqrt(2/π)`.
const SQRT_2_OVER_PI: f32 = 0.797_884_6;

/// Cubic coefficient in the tanh approximation.
const GELU_COEFF: f32 = 0.044715;

/// Applies the GELU activation element-wise using the tanh approximation:
///
/// `GELU(x) ≈ 0.5 * x * (1 + tanh(sqrt(2/π) * (x + 0.044715 * x³)))`
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
pub fn gelu(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    check_same_shape("gelu", input, output)?;

    for (d, &x) in output.as_f32_slice_mut().iter_mut().zip(input.as_f32_slice()) {
        *d = gelu_scalar(x);
    }

    Ok(())
}

#[inline(always)]
fn gelu_scalar(x: f32) -> f32 {
    let inner = SQRT_2_OVER_PI * (x + GELU_COEFF * x * x * x);
    0.5 * x * (1.0 + inner.tanh())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_gelu_limits() {
        assert!(approx_eq(gelu_scalar(0.0), 0.0, 1e-6));
        assert!((gelu_scalar(3.0) - 3.0).abs() < 0.01);
        assert!(gelu_scalar(-3.0).abs() < 0.01);
    }

    #[test]
    fn test_gelu_tensor() {
        let input = Tensor::from_f32(Shape::vector(4), &[0.0, 1.0, -1.0, 2.0]).unwrap();
        let mut output = Tensor::zeros(Shape::vector(4));

        gelu(&input.view(), &mut output).unwrap();

        let r = output.as_f32_slice();
        assert!(approx_eq(r[0], 0.0, 1e-5));
        assert!(approx_eq(r[1], 0.8412, 0.01));
        assert!(approx_eq(r[2], -0.1588, 0.01));
        assert!(approx_eq(r[3], 1.9545, 0.01));
    }

    #[test]
    fn test_gelu_shape_mismatch() {
        let input = Tensor::zeros(Shape::vector(3));
        let mut output = Tensor::zeros(Shape::vector(4));
        assert!(gelu(&input.view(), &mut output).is_err());
    }
}
