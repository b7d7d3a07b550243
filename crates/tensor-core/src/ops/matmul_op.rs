// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix multiplication operation.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Performs matrix multiplication: `output = lhs @ rhs`.
///
/// Both inputs must be 2-D tensors with compatible inner dimensions:
/// `lhs` is `[M, K]`, `rhs` is `[K, N]`, and `output` must be `[M, N]`.
/// In a dense layer `M` is the batch size.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if dimensions are incompatible.
pub fn matmul(
    lhs: &TensorView<'_>,
    rhs: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    if lhs.shape().rank() != 2
        || rhs.shape().rank() != 2
        || !lhs.shape().is_matmul_compatible(rhs.shape())
    {
        return Err(TensorError::ShapeMismatch {
            op: "matmul",
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }

    let lhs_dims = lhs.shape().dims();
    let rhs_dims = rhs.shape().dims();
    let m = lhs_dims[0];
    let k = lhs_dims[1];
    let n = rhs_dims[1];

    let expected_shape = Shape::matrix(m, n);
    if output.shape() != &expected_shape {
        return Err(TensorError::ShapeMismatch {
            op: "matmul (output)",
            lhs: expected_shape,
            rhs: output.shape().clone(),
        });
    }

    let a = lhs.as_f32_slice();
    let b = rhs.as_f32_slice();
    let c = output.as_f32_slice_mut();

    matmul_f32_generic(a, b, c, m, k, n);

    Ok(())
}

/// Portable f32 matrix multiplication.
///
/// Uses an ikj loop order so the inner loop is a saxpy over a row of `c`,
/// sequential in memory for both `b` and `c`.
fn matmul_f32_generic(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    c.iter_mut().for_each(|x| *x = 0.0);

    for i in 0..m {
        let c_row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            if a_ip == 0.0 {
                continue;
            }
            let b_row = &b[p * n..(p + 1) * n];
            for (cj, &bj) in c_row.iter_mut().zip(b_row) {
                *cj += a_ip * bj;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_2x3_times_3x2() {
        // A = [[1, 2, 3], [4, 5, 6]]
        // B = [[7, 8], [9, 10], [11, 12]]
        // C = [[58, 64], [139, 154]]
        let a = Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b =
            Tensor::from_f32(Shape::matrix(3, 2), &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let mut c = Tensor::zeros(Shape::matrix(2, 2));

        matmul(&a.view(), &b.view(), &mut c).unwrap();

        let result = c.as_f32_slice();
        assert!((result[0] - 58.0).abs() < 1e-5);
        assert!((result[1] - 64.0).abs() < 1e-5);
        assert!((result[2] - 139.0).abs() < 1e-5);
        assert!((result[3] - 154.0).abs() < 1e-5);
    }

    #[test]
    fn test_matmul_identity() {
        let a = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let eye = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 0.0, 0.0, 1.0]).unwrap();
        let mut c = Tensor::zeros(Shape::matrix(2, 2));

        matmul(&a.view(), &eye.view(), &mut c).unwrap();

        assert_eq!(c.as_f32_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_overwrites_output() {
        let a = Tensor::from_f32(Shape::matrix(1, 1), &[3.0]).unwrap();
        let b = Tensor::from_f32(Shape::matrix(1, 1), &[4.0]).unwrap();
        let mut c = Tensor::from_f32(Shape::matrix(1, 1), &[99.0]).unwrap();

        matmul(&a.view(), &b.view(), &mut c).unwrap();
        assert!((c.as_f32_slice()[0] - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let a = Tensor::zeros(Shape::matrix(2, 3));
        let b = Tensor::zeros(Shape::matrix(4, 2)); // 4 != 3
        let mut c = Tensor::zeros(Shape::matrix(2, 2));

        assert!(matmul(&a.view(), &b.view(), &mut c).is_err());
    }

    #[test]
    fn test_matmul_bad_output_shape() {
        let a = Tensor::zeros(Shape::matrix(2, 3));
        let b = Tensor::zeros(Shape::matrix(3, 2));
        let mut c = Tensor::zeros(Shape::matrix(3, 3));

        assert!(matmul(&a.view(), &b.view(), &mut c).is_err());
    }
}
