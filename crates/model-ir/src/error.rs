// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph loading and finalization.

use std::path::PathBuf;

/// Errors that can occur when loading or validating a computation graph.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The graph manifest file could not be read.
    #[error("failed to read graph file '{}': {source}", path.display())]
    GraphRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest JSON is malformed.
    #[error("failed to parse graph manifest: {0}")]
    ManifestParseError(#[from] serde_json::Error),

    /// A weight tensor referenced by a node was not found in the weights file.
    #[error("weight tensor not found: {name}")]
    WeightNotFound { name: String },

    /// The SafeTensors file could not be loaded.
    #[error("failed to load SafeTensors: {0}")]
    SafeTensorsError(String),

    /// A node definition is invalid (e.g., incompatible shapes).
    #[error("invalid node '{node}': {detail}")]
    InvalidNode { node: String, detail: String },

    /// The graph is empty, cyclic or otherwise malformed.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A named operation required by the caller does not exist.
    #[error("operation '{name}' not found in graph")]
    OperationNotFound { name: String },
}
