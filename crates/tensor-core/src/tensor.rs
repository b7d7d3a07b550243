// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and view abstractions.

use crate::{DType, Shape, TensorError};

/// An owned, n-dimensional `f32` tensor stored in contiguous memory.
///
/// `Tensor` is the primary data carrier in the inference pipeline: image
/// batches, weights and intermediate activations are all `Tensor`s.
/// Immutable, zero-copy views are available through [`TensorView`].
///
/// # Memory Layout
/// Data is stored in row-major (C) order. Weight files in other encodings
/// are decoded to `f32` once, by [`Tensor::from_bytes`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::zeros(Shape::matrix(2, 3));
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape) -> Self {
        let n = shape.num_elements();
        Self {
            shape,
            data: vec![0.0; n],
        }
    }

    /// Decodes a little-endian byte buffer of the given `dtype`.
    ///
    /// Returns an error if the buffer size does not match
    /// `shape.size_bytes(dtype)` or the dtype cannot be decoded.
    pub fn from_bytes(shape: Shape, dtype: DType, bytes: &[u8]) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if bytes.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let data: Vec<f32> = match dtype {
            DType::F32 => bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            // bf16 is the upper half of an f32.
            DType::BF16 => bytes
                .chunks_exact(2)
                .map(|c| f32::from_bits((u16::from_le_bytes([c[0], c[1]]) as u32) << 16))
                .collect(),
            other => {
                return Err(TensorError::UnsupportedDType {
                    op: "from_bytes",
                    dtype: other,
                })
            }
        };

        Ok(Self { shape, data })
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_f32_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_vec(shape, values.to_vec())
    }

    /// Creates a tensor that takes ownership of `values`.
    pub fn from_vec(shape: Shape, values: Vec<f32>) -> Result<Self, TensorError> {
        let expected_elements = shape.num_elements();
        if values.len() != expected_elements {
            return Err(TensorError::BufferSizeMismatch {
                expected: expected_elements * DType::F32.size_bytes(),
                actual: values.len() * DType::F32.size_bytes(),
            });
        }
        Ok(Self {
            shape,
            data: values,
        })
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the in-memory element type (always `F32`).
    pub fn dtype(&self) -> DType {
        DType::F32
    }

    /// Returns an immutable view over this tensor's data.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            shape: &self.shape,
            data: &self.data,
        }
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * DType::F32.size_bytes()
    }

    /// Returns the elements as a flat row-major slice.
    pub fn as_f32_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the elements as a mutable flat row-major slice.
    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Fills the tensor with a constant value.
    pub fn fill_f32(&mut self, value: f32) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Reinterprets the data under a new shape with the same element count.
    pub fn reshape(self, shape: Shape) -> Result<Self, TensorError> {
        if shape.num_elements() != self.data.len() {
            return Err(TensorError::ShapeMismatch {
                op: "reshape",
                lhs: self.shape,
                rhs: shape,
            });
        }
        Ok(Self {
            shape,
            data: self.data,
        })
    }

    /// Returns batch element `index` of a batch-leading tensor as a flat slice.
    pub fn batch_item(&self, index: usize) -> Option<&[f32]> {
        let (batch, item) = self.shape.split_batch()?;
        if index >= batch {
            return None;
        }
        let len = item.num_elements();
        self.data.get(index * len..(index + 1) * len)
    }

    /// Consumes the tensor and returns its data buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// A borrowed, read-only view over a [`Tensor`]'s data.
///
/// Views are zero-copy and tied to the lifetime of the source tensor,
/// enforced by the borrow checker.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    shape: &'a Shape,
    data: &'a [f32],
}

impl<'a> TensorView<'a> {
    /// Creates a view from raw parts.
    ///
    /// Returns an error if `data` does not hold exactly `shape.num_elements()` values.
    pub fn from_parts(shape: &'a Shape, data: &'a [f32]) -> Result<Self, TensorError> {
        if data.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.size_bytes(DType::F32),
                actual: data.len() * DType::F32.size_bytes(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Returns the shape of the viewed tensor.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the viewed elements.
    pub fn as_f32_slice(&self) -> &'a [f32] {
        self.data
    }
}
