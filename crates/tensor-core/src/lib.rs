// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Lightweight tensor types and CPU kernels for image-classification graphs.
//!
//! This crate provides:
//! - [`Tensor`]: an owned, row-major `f32` tensor.
//! - [`Shape`]: runtime shape descriptors.
//! - [`DType`]: element types a weight file may store (decoded to `f32`).
//! - Kernels: matrix multiplication, bias add, softmax, layer normalization,
//!   GELU, ReLU, affine rescale and global average pooling.
//!
//! # Design Goals
//! - Kernels write into caller-provided output tensors.
//! - Every kernel validates shapes up front and reports a [`TensorError`].
//! - Batch-leading layouts: `[N, ...]` everywhere, `[N, H, W, C]` for images.

mod dtype;
mod error;
mod ops;
mod shape;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use ops::{bias_add, gelu, global_avg_pool, layer_norm, matmul, relu, rescale, softmax};
pub use shape::Shape;
pub use tensor::{Tensor, TensorView};
