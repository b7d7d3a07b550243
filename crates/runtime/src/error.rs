// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime.
//!
//! [`RuntimeError`] covers startup and graph execution. [`ClassifyError`]
//! is request-scoped: it never implies that shared state is damaged.

use std::path::PathBuf;
use tensor_core::Shape;

/// Errors that can occur while loading the model or executing the graph.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Failed to load weights from disk.
    #[error("weight loading failed for '{name}': {detail}")]
    WeightLoadError { name: String, detail: String },

    /// A tensor operation failed during node execution.
    #[error("execution error in node '{node}': {source}")]
    ExecutionError {
        node: String,
        #[source]
        source: tensor_core::TensorError,
    },

    /// Graph loading failed.
    #[error("model error: {0}")]
    ModelError(#[from] model_ir::ModelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The label file is missing, unreadable or malformed.
    #[error("label file '{}': {detail}", path.display())]
    LabelsError { path: PathBuf, detail: String },

    /// The named input or output operation is unusable as an interface point.
    #[error("operation '{name}' cannot be used as {role}: {detail}")]
    InterfaceError {
        name: String,
        role: &'static str,
        detail: String,
    },

    /// The number of labels does not match the width of the output vector.
    #[error("label count {labels} does not match output width {outputs}")]
    LabelCountMismatch { labels: usize, outputs: usize },

    /// The tensor fed to the graph has the wrong shape.
    #[error("input shape mismatch: expected [N, ..] of {expected}, got {actual}")]
    InputShapeMismatch { expected: Shape, actual: Shape },
}

/// Errors scoped to a single classification request.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// No file exists at the requested path.
    #[error("image not found: {}", path.display())]
    ImageNotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("cannot read image '{}': {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not in a supported image format.
    #[error("unsupported image '{}': {detail}", path.display())]
    UnsupportedImage { path: PathBuf, detail: String },

    /// The file claims a known format but its contents are corrupt.
    #[error("cannot decode image '{}': {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Graph execution failed.
    #[error("inference failed: {0}")]
    Inference(#[from] RuntimeError),

    /// The output vector is not a probability distribution.
    #[error("invalid probabilities: {0}")]
    InvalidProbabilities(String),
}

impl ClassifyError {
    /// Returns `true` when the request itself was at fault (bad path or image).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ImageNotFound { .. }
                | Self::ImageRead { .. }
                | Self::UnsupportedImage { .. }
                | Self::ImageDecode { .. }
        )
    }
}
