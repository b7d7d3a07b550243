// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! A small serialized computation-graph format for image classifiers.
//!
//! - [`OpKind`]: the operation a node performs, with its attributes.
//! - [`NodeDef`]: one named operation: inputs, weight references, output shape.
//! - [`ModelGraph`]: the graph in topological order, with a **type-state
//!   pattern** (`Loaded` → `Finalized`). A finalized graph can no longer
//!   be mutated.
//! - [`ModelLoader`]: loads a graph from a JSON manifest + SafeTensors weights.
//! - [`GraphManifest`]: the JSON graph descriptor.
//!
//! # Graph File Format
//! - `graph.json`: node list, op kinds and attributes, weight names.
//! - `graph.safetensors`: weights in HuggingFace SafeTensors format,
//!   referenced from the manifest's `weights` field.
//!
//! # Example
//! ```no_run
//! use model_ir::ModelLoader;
//! use std::path::Path;
//!
//! let graph = ModelLoader::load(Path::new("./model/graph.json")).unwrap();
//! println!("{}", graph.summary());
//! for name in graph.operation_names() {
//!     println!("  {name}");
//! }
//! ```

mod error;
pub mod graph;
mod loader;
mod manifest;
mod node;

pub use error::ModelError;
pub use graph::{Finalized, Loaded, ModelGraph};
pub use loader::{ModelLoader, WeightMeta};
pub use manifest::{GraphManifest, ManifestNode};
pub use node::{NodeDef, OpKind};
