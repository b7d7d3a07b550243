// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON graph manifest parsing.
//!
//! The manifest (`graph.json`) lists the graph's operations in topological
//! order and maps each one to weight tensor names in the SafeTensors file.
//!
//! # Format
//! ```json
//! {
//!   "name": "flowers-retrained",
//!   "weights": "graph.safetensors",
//!   "dtype": "f32",
//!   "nodes": [
//!     { "name": "input", "op": "placeholder", "shape": [224, 224, 3] },
//!     { "name": "scaled", "op": "rescale", "inputs": ["input"],
//!       "scale": 0.0078125, "offset": -1.0 },
//!     { "name": "pool", "op": "global_avg_pool", "inputs": ["scaled"] },
//!     { "name": "logits", "op": "dense", "inputs": ["pool"],
//!       "weights": ["logits.kernel", "logits.bias"] },
//!     { "name": "final_result", "op": "softmax", "inputs": ["logits"] }
//!   ]
//! }
//! ```
//!
//! `weights` is resolved relative to the manifest's directory. Shapes are
//! only required on placeholders; every other node's shape is inferred.

use crate::node::DEFAULT_LAYER_NORM_EPSILON;
use crate::{ModelError, OpKind};
use std::collections::HashSet;
use std::path::Path;
use tensor_core::DType;

/// Top-level graph manifest, deserialized from `graph.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphManifest {
    /// Human-readable graph name.
    pub name: String,
    /// SafeTensors weight file, relative to the manifest.
    #[serde(default)]
    pub weights: Option<String>,
    /// Storage type of the weights (e.g., `"f32"`, `"bf16"`).
    #[serde(default = "default_dtype")]
    pub dtype: String,
    /// Node definitions in topological order.
    pub nodes: Vec<ManifestNode>,
}

fn default_dtype() -> String {
    "f32".to_string()
}

/// Parses a dtype string into a [`DType`].
pub(crate) fn parse_dtype(s: &str) -> Option<DType> {
    match s.to_lowercase().as_str() {
        "f32" | "float32" | "fp32" => Some(DType::F32),
        "f16" | "float16" | "fp16" => Some(DType::F16),
        "bf16" | "bfloat16" => Some(DType::BF16),
        "i8" | "int8" => Some(DType::I8),
        _ => None,
    }
}

/// A single node entry in the manifest.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ManifestNode {
    /// Operation name, unique within the graph.
    pub name: String,
    /// Op string (e.g., `"dense"`, `"softmax"`). Aliases are accepted.
    pub op: String,
    /// Names of the nodes feeding this one.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Weight tensor names in the SafeTensors file.
    #[serde(default)]
    pub weights: Vec<String>,
    /// Per-example output shape. Required for placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    /// `rescale` multiplier (default 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    /// `rescale` additive offset (default 0.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f32>,
    /// `layer_norm` epsilon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f32>,
}

impl ManifestNode {
    /// Builds the typed op for this entry, applying attribute defaults.
    pub fn op_kind(&self) -> Result<OpKind, ModelError> {
        let canonical = OpKind::canonical_name(&self.op).ok_or_else(|| ModelError::InvalidNode {
            node: self.name.clone(),
            detail: format!("unrecognised op '{}'", self.op),
        })?;
        Ok(match canonical {
            "placeholder" => OpKind::Placeholder,
            "identity" => OpKind::Identity,
            "rescale" => OpKind::Rescale {
                scale: self.scale.unwrap_or(1.0),
                offset: self.offset.unwrap_or(0.0),
            },
            "relu" => OpKind::Relu,
            "gelu" => OpKind::Gelu,
            "softmax" => OpKind::Softmax,
            "layer_norm" => OpKind::LayerNorm {
                epsilon: self.epsilon.unwrap_or(DEFAULT_LAYER_NORM_EPSILON),
            },
            "global_avg_pool" => OpKind::GlobalAvgPool,
            "flatten" => OpKind::Flatten,
            _ => OpKind::Dense,
        })
    }
}

impl GraphManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::GraphRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Validates that the manifest is internally consistent.
    ///
    /// Checks:
    /// - At least one node is defined.
    /// - The dtype names a type the runtime can decode.
    /// - All op strings are recognised.
    /// - No duplicate node names.
    /// - Every placeholder declares its shape.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph("manifest contains no nodes".into()));
        }

        match parse_dtype(&self.dtype) {
            Some(dtype) if dtype.is_decodable() => {}
            _ => {
                return Err(ModelError::InvalidGraph(format!(
                    "unsupported dtype '{}'",
                    self.dtype
                )))
            }
        }

        let mut seen_names = HashSet::new();
        for node in &self.nodes {
            if !seen_names.insert(node.name.as_str()) {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: "duplicate node name".into(),
                });
            }

            if node.op_kind()? == OpKind::Placeholder && node.shape.is_none() {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: "placeholder must declare a shape".into(),
                });
            }
        }

        Ok(())
    }

    /// Total number of weight references across all nodes.
    pub fn total_weight_count(&self) -> usize {
        self.nodes.iter().map(|n| n.weights.len()).sum()
    }
}
