// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Resident weight storage decoded from SafeTensors.
//!
//! The classifier is small enough to keep every weight resident, so
//! [`WeightStore::load`] memory-maps the weight file once, decodes each
//! tensor the graph references to `f32`, and drops the map. After loading
//! the store is read-only and can be shared between threads.

use crate::RuntimeError;
use model_ir::{ModelGraph, Finalized};
use std::collections::HashMap;
use tensor_core::{DType, Shape, Tensor};

/// Decoded weight tensors keyed by SafeTensors name.
#[derive(Debug, Clone, Default)]
pub struct WeightStore {
    tensors: HashMap<String, Tensor>,
}

impl WeightStore {
    /// Decodes every weight referenced by `graph` from its SafeTensors file.
    ///
    /// A graph without weights yields an empty store. Shapes are checked
    /// against the graph, so a mismatch fails here rather than mid-request.
    pub fn load(graph: &ModelGraph<Finalized>) -> Result<Self, RuntimeError> {
        let referenced: Vec<(&str, &Shape)> = graph
            .iter_nodes()
            .flat_map(|n| n.weight_names.iter().map(String::as_str).zip(&n.weight_shapes))
            .collect();
        if referenced.is_empty() {
            return Ok(Self::default());
        }

        let path = graph.weights_file().ok_or_else(|| RuntimeError::WeightLoadError {
            name: graph.name.clone(),
            detail: "graph references weights but names no weights file".into(),
        })?;

        let file = std::fs::File::open(path).map_err(|e| RuntimeError::WeightLoadError {
            name: graph.name.clone(),
            detail: format!("cannot open '{}': {e}", path.display()),
        })?;
        // SAFETY: the map is read-only and dropped before this function returns.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| {
            RuntimeError::WeightLoadError {
                name: graph.name.clone(),
                detail: format!("mmap failed: {e}"),
            }
        })?;
        let st = safetensors::SafeTensors::deserialize(&mmap).map_err(|e| {
            RuntimeError::WeightLoadError {
                name: graph.name.clone(),
                detail: format!("SafeTensors parse error: {e}"),
            }
        })?;

        let mut tensors = HashMap::with_capacity(referenced.len());
        for (name, shape) in referenced {
            if tensors.contains_key(name) {
                continue;
            }
            let view = st.tensor(name).map_err(|e| RuntimeError::WeightLoadError {
                name: name.to_string(),
                detail: format!("tensor not found: {e}"),
            })?;
            if view.shape() != shape.dims() {
                return Err(RuntimeError::WeightLoadError {
                    name: name.to_string(),
                    detail: format!(
                        "file shape {} does not match graph shape {shape}",
                        Shape::new(view.shape().to_vec())
                    ),
                });
            }
            let dtype = match view.dtype() {
                safetensors::Dtype::F32 => DType::F32,
                safetensors::Dtype::BF16 => DType::BF16,
                other => {
                    return Err(RuntimeError::WeightLoadError {
                        name: name.to_string(),
                        detail: format!("unsupported dtype {other:?}"),
                    })
                }
            };
            let tensor = Tensor::from_bytes(shape.clone(), dtype, view.data()).map_err(|e| {
                RuntimeError::WeightLoadError {
                    name: name.to_string(),
                    detail: e.to_string(),
                }
            })?;
            tensors.insert(name.to_string(), tensor);
        }

        let store = Self { tensors };
        tracing::info!(
            "weights: {} tensors from {} ({:.2} MB)",
            store.len(),
            path.display(),
            store.total_bytes() as f64 / (1024.0 * 1024.0),
        );
        Ok(store)
    }

    /// Builds a store from already-decoded tensors.
    pub fn from_tensors<I, S>(tensors: I) -> Self
    where
        I: IntoIterator<Item = (S, Tensor)>,
        S: Into<String>,
    {
        Self {
            tensors: tensors.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the tensor stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Returns the tensor stored under `name`, checking its shape.
    pub fn require(&self, name: &str, shape: &Shape) -> Result<&Tensor, RuntimeError> {
        let tensor = self.get(name).ok_or_else(|| RuntimeError::WeightLoadError {
            name: name.to_string(),
            detail: "missing from weight store".into(),
        })?;
        if tensor.shape() != shape {
            return Err(RuntimeError::WeightLoadError {
                name: name.to_string(),
                detail: format!("stored shape {} does not match {shape}", tensor.shape()),
            });
        }
        Ok(tensor)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Total decoded size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.tensors.values().map(Tensor::size_bytes).sum()
    }
}
