// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph loading from manifest + SafeTensors files.
//!
//! The loader reads:
//! - `graph.json`, the node manifest (see [`GraphManifest`]).
//! - the SafeTensors file named by the manifest's `weights` field,
//!   resolved relative to the manifest's directory.
//!
//! Weight *data* is **not** loaded into memory here. The loader only reads
//! the SafeTensors header to extract tensor shapes and data types, which
//! are used to infer every node's output shape. The runtime decodes the
//! actual weights later.

use crate::{GraphManifest, ModelError, ModelGraph, NodeDef, OpKind};
use crate::graph::Finalized;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tensor_core::{DType, Shape};

/// Metadata for a single tensor extracted from the SafeTensors header.
#[derive(Debug, Clone)]
pub struct WeightMeta {
    /// Tensor name (key in the SafeTensors file).
    pub name: String,
    /// Shape of the tensor.
    pub shape: Shape,
    /// Data type.
    pub dtype: DType,
    /// Size in bytes.
    pub size_bytes: usize,
}

impl WeightMeta {
    /// Creates metadata for an `f32` tensor.
    pub fn f32(name: &str, shape: Shape) -> Self {
        let size_bytes = shape.size_bytes(DType::F32);
        Self {
            name: name.to_string(),
            shape,
            dtype: DType::F32,
            size_bytes,
        }
    }
}

/// Loads a graph from disk into a finalized [`ModelGraph`].
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use std::path::Path;
///
/// let graph = ModelLoader::load(Path::new("./model/graph.json")).unwrap();
/// println!("Loaded {} operations", graph.num_nodes());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and finalizes the graph described by `graph_path`.
    ///
    /// Steps:
    /// 1. Parse the manifest and validate it.
    /// 2. Read the SafeTensors header to extract weight tensor metadata.
    /// 3. Build [`NodeDef`]s, inferring shapes from inputs and weights.
    /// 4. Construct and finalize the [`ModelGraph`].
    pub fn load(graph_path: &Path) -> Result<ModelGraph<Finalized>, ModelError> {
        // 1. Load and validate manifest.
        let manifest = GraphManifest::from_file(graph_path)?;
        manifest.validate()?;

        // 2. Extract weight metadata from SafeTensors.
        let weights_path = manifest.weights.as_ref().map(|w| {
            graph_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(w)
        });
        let weight_meta = match &weights_path {
            Some(path) => Self::read_weight_metadata(path)?,
            None => HashMap::new(),
        };

        tracing::debug!(
            graph = %graph_path.display(),
            nodes = manifest.nodes.len(),
            weights = weight_meta.len(),
            "manifest parsed"
        );

        // 3 + 4.
        Self::assemble(&manifest, &weight_meta, weights_path)
    }

    /// Builds a graph from a manifest and a pre-built weight metadata map.
    ///
    /// Useful for testing without actual SafeTensors files.
    pub fn from_manifest_and_meta(
        manifest: &GraphManifest,
        weight_meta: &HashMap<String, WeightMeta>,
    ) -> Result<ModelGraph<Finalized>, ModelError> {
        manifest.validate()?;
        Self::assemble(manifest, weight_meta, None)
    }

    fn assemble(
        manifest: &GraphManifest,
        weight_meta: &HashMap<String, WeightMeta>,
        weights_file: Option<PathBuf>,
    ) -> Result<ModelGraph<Finalized>, ModelError> {
        let nodes = Self::build_nodes(manifest, weight_meta)?;
        ModelGraph::new(manifest.name.clone(), nodes, weights_file).finalize()
    }

    /// Reads the SafeTensors header to extract tensor shapes and dtypes.
    ///
    /// Uses memory-mapped I/O to avoid loading the full weight file.
    pub fn read_weight_metadata(
        weights_path: &Path,
    ) -> Result<HashMap<String, WeightMeta>, ModelError> {
        let file = std::fs::File::open(weights_path).map_err(|e| {
            ModelError::SafeTensorsError(format!(
                "cannot open '{}': {e}",
                weights_path.display()
            ))
        })?;

        // SAFETY: the map is read-only and dropped before this function returns.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| ModelError::SafeTensorsError(format!("mmap failed: {e}")))?;

        let tensors = safetensors::SafeTensors::deserialize(&mmap).map_err(|e| {
            ModelError::SafeTensorsError(format!("SafeTensors parse error: {e}"))
        })?;

        let mut meta = HashMap::new();
        for (name, view) in tensors.tensors() {
            let shape = Shape::new(view.shape().to_vec());
            let dtype = convert_safetensor_dtype(view.dtype())?;
            let size_bytes = shape.size_bytes(dtype);
            meta.insert(
                name.clone(),
                WeightMeta {
                    name,
                    shape,
                    dtype,
                    size_bytes,
                },
            );
        }

        Ok(meta)
    }

    /// Converts manifest entries into node definitions, using weight
    /// metadata and earlier nodes' shapes to infer each output shape.
    fn build_nodes(
        manifest: &GraphManifest,
        weight_meta: &HashMap<String, WeightMeta>,
    ) -> Result<Vec<NodeDef>, ModelError> {
        let mut shapes: HashMap<&str, Shape> = HashMap::new();
        let mut nodes = Vec::with_capacity(manifest.nodes.len());

        for (i, mn) in manifest.nodes.iter().enumerate() {
            let op = mn.op_kind()?;
            let invalid = |detail: String| ModelError::InvalidNode {
                node: mn.name.clone(),
                detail,
            };

            let mut weight_shapes = Vec::with_capacity(mn.weights.len());
            for wname in &mn.weights {
                let meta = weight_meta
                    .get(wname)
                    .ok_or_else(|| ModelError::WeightNotFound { name: wname.clone() })?;
                if !meta.dtype.is_decodable() {
                    return Err(invalid(format!(
                        "weight '{wname}' has unsupported dtype {}",
                        meta.dtype
                    )));
                }
                weight_shapes.push(meta.shape.clone());
            }

            let output_shape = match op {
                OpKind::Placeholder => {
                    let dims = mn
                        .shape
                        .clone()
                        .ok_or_else(|| invalid("placeholder must declare a shape".into()))?;
                    Shape::new(dims)
                }
                _ => {
                    let input = mn
                        .inputs
                        .first()
                        .and_then(|name| shapes.get(name.as_str()))
                        .ok_or_else(|| invalid("missing or unknown input".into()))?;
                    let inferred = op.infer_shape(input, &weight_shapes).map_err(invalid)?;
                    if let Some(declared) = &mn.shape {
                        if declared.as_slice() != inferred.dims() {
                            return Err(invalid(format!(
                                "declared shape {} does not match inferred shape {inferred}",
                                Shape::new(declared.clone())
                            )));
                        }
                    }
                    inferred
                }
            };

            shapes.insert(mn.name.as_str(), output_shape.clone());
            nodes.push(NodeDef {
                name: mn.name.clone(),
                op,
                index: i,
                inputs: mn.inputs.clone(),
                weight_names: mn.weights.clone(),
                weight_shapes,
                output_shape,
            });
        }

        Ok(nodes)
    }
}

/// Converts a SafeTensors `Dtype` to our [`DType`].
fn convert_safetensor_dtype(st_dtype: safetensors::Dtype) -> Result<DType, ModelError> {
    match st_dtype {
        safetensors::Dtype::F32 => Ok(DType::F32),
        safetensors::Dtype::F16 => Ok(DType::F16),
        safetensors::Dtype::BF16 => Ok(DType::BF16),
        safetensors::Dtype::I8 => Ok(DType::I8),
        other => Err(ModelError::SafeTensorsError(format!(
            "unsupported SafeTensors dtype: {other:?}"
        ))),
    }
}
