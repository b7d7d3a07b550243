// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Global average pooling over the spatial dimensions of an NHWC batch.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Averages each channel over height and width: `[N, H, W, C] → [N, C]`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if `input` is not rank 4, has an
/// empty spatial extent, or `output` is not `[N, C]`.
pub fn global_avg_pool(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    let dims = input.shape().dims();
    if dims.len() != 4 || dims[1] * dims[2] == 0 {
        return Err(TensorError::ShapeMismatch {
            op: "global_avg_pool",
            lhs: input.shape().clone(),
            rhs: Shape::new(vec![0, 0, 0, 0]),
        });
    }
    let (n, h, w, c) = (dims[0], dims[1], dims[2], dims[3]);

    let expected = Shape::matrix(n, c);
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "global_avg_pool (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();
    dst.iter_mut().for_each(|x| *x = 0.0);

    let plane = h * w * c;
    let inv_count = 1.0 / (h * w) as f32;
    for b in 0..n {
        let image = &src[b * plane..(b + 1) * plane];
        let acc = &mut dst[b * c..(b + 1) * c];
        for pixel in image.chunks_exact(c.max(1)) {
            for (a, &v) in acc.iter_mut().zip(pixel) {
                *a += v;
            }
        }
        acc.iter_mut().for_each(|a| *a *= inv_count);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_uniform_image() {
        // 2x2 image, 3 channels, every pixel (10, 20, 30).
        let data: Vec<f32> = (0..4).flat_map(|_| [10.0, 20.0, 30.0]).collect();
        let input = Tensor::from_f32(Shape::new(vec![1, 2, 2, 3]), &data).unwrap();
        let mut output = Tensor::zeros(Shape::matrix(1, 3));

        global_avg_pool(&input.view(), &mut output).unwrap();
        assert_eq!(output.as_f32_slice(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_pool_batch_independent() {
        // Batch of two 1x2 single-channel images.
        let input = Tensor::from_f32(Shape::new(vec![2, 1, 2, 1]), &[1.0, 3.0, 5.0, 7.0]).unwrap();
        let mut output = Tensor::zeros(Shape::matrix(2, 1));

        global_avg_pool(&input.view(), &mut output).unwrap();
        assert_eq!(output.as_f32_slice(), &[2.0, 6.0]);
    }

    #[test]
    fn test_pool_rejects_wrong_rank() {
        let input = Tensor::zeros(Shape::matrix(2, 3));
        let mut output = Tensor::zeros(Shape::matrix(2, 3));
        assert!(global_avg_pool(&input.view(), &mut output).is_err());
    }

    #[test]
    fn test_pool_rejects_wrong_output() {
        let input = Tensor::zeros(Shape::new(vec![1, 2, 2, 3]));
        let mut output = Tensor::zeros(Shape::matrix(1, 4));
        assert!(global_avg_pool(&input.view(), &mut output).is_err());
    }
}
