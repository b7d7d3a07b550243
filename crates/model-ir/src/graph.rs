// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Computation graph: named operations in topological order.
//!
//! # Type-State Pattern
//!
//! The graph transitions through states enforced at compile time:
//!
//! ```text
//! ModelGraph<Loaded>    : nodes parsed, not yet checked.
//!       │  .finalize()
//!       ▼
//! ModelGraph<Finalized> : wiring and shapes verified, read-only.
//! ```
//!
//! Only a finalized graph exposes name lookup and execution-order queries,
//! so an engine can never be built from an unchecked graph. The node list
//! is private; a finalized graph has no mutating methods.

use crate::{ModelError, NodeDef, OpKind};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been loaded but not finalized.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been finalized and may no longer change.
#[derive(Debug, Clone)]
pub struct Finalized;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Finalized {}

// ── ModelGraph ─────────────────────────────────────────────────────

/// A computation graph whose nodes are stored in topological order.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    /// Human-readable graph name (e.g., `"flowers-retrained"`).
    pub name: String,
    nodes: Vec<NodeDef>,
    weights_file: Option<PathBuf>,
    by_name: HashMap<String, usize>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Creates a new graph in the `Loaded` state.
    pub fn new(name: String, nodes: Vec<NodeDef>, weights_file: Option<PathBuf>) -> Self {
        Self {
            name,
            nodes,
            weights_file,
            by_name: HashMap::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Checks the graph and transitions to the `Finalized` state.
    ///
    /// # Checks
    /// - The graph is non-empty.
    /// - Node indices are consecutive starting from 0.
    /// - Node names are unique.
    /// - Every input names an *earlier* node (which also rules out cycles).
    /// - Input and weight counts match the op's arity.
    /// - No node has a zero-element shape.
    /// - Each declared output shape equals the shape inferred from its inputs.
    pub fn finalize(self) -> Result<ModelGraph<Finalized>, ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph("graph contains no nodes".into()));
        }

        let mut by_name = HashMap::with_capacity(self.nodes.len());

        for (i, node) in self.nodes.iter().enumerate() {
            if node.index != i {
                return Err(invalid(node, format!("expected index {i}, got {}", node.index)));
            }
            if by_name.insert(node.name.clone(), i).is_some() {
                return Err(invalid(node, "duplicate operation name".into()));
            }
            if node.inputs.len() != node.op.num_inputs() {
                return Err(invalid(
                    node,
                    format!(
                        "{} takes {} input(s), got {}",
                        node.op,
                        node.op.num_inputs(),
                        node.inputs.len()
                    ),
                ));
            }
            if node.weight_names.len() != node.weight_shapes.len() {
                return Err(invalid(node, "weight names and shapes differ in length".into()));
            }
            if node.output_shape.num_elements() == 0 {
                return Err(invalid(node, "output shape has zero elements".into()));
            }

            let expected = match node.op {
                OpKind::Placeholder => {
                    if !node.weight_names.is_empty() {
                        return Err(invalid(node, "placeholder cannot own weights".into()));
                    }
                    continue;
                }
                _ => {
                    let input_name = &node.inputs[0];
                    // Only nodes before `i` are in the map yet.
                    let producer = match by_name.get(input_name) {
                        Some(&p) if p < i => p,
                        _ => {
                            return Err(invalid(
                                node,
                                format!("input '{input_name}' is not an earlier node"),
                            ))
                        }
                    };
                    node.op
                        .infer_shape(&self.nodes[producer].output_shape, &node.weight_shapes)
                        .map_err(|detail| invalid(node, detail))?
                }
            };

            if expected != node.output_shape {
                return Err(invalid(
                    node,
                    format!(
                        "declared shape {} does not match inferred shape {expected}",
                        node.output_shape
                    ),
                ));
            }
        }

        tracing::debug!(graph = %self.name, nodes = self.nodes.len(), "graph finalized");

        Ok(ModelGraph {
            name: self.name,
            nodes: self.nodes,
            weights_file: self.weights_file,
            by_name,
            _state: std::marker::PhantomData,
        })
    }
}

fn invalid(node: &NodeDef, detail: String) -> ModelError {
    ModelError::InvalidNode {
        node: node.name.clone(),
        detail,
    }
}

// ── Finalized state ────────────────────────────────────────────────

impl ModelGraph<Finalized> {
    /// Returns the total number of operations.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Looks up an operation by name.
    pub fn operation(&self, name: &str) -> Option<&NodeDef> {
        self.by_name.get(name).map(|&i| &self.nodes[i])
    }

    /// Looks up an operation by name, failing with
    /// [`ModelError::OperationNotFound`] when it is absent.
    pub fn resolve(&self, name: &str) -> Result<&NodeDef, ModelError> {
        self.operation(name)
            .ok_or_else(|| ModelError::OperationNotFound { name: name.to_string() })
    }

    /// Names of every operation, in execution order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Returns an iterator over the nodes in execution order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &NodeDef> {
        self.nodes.iter()
    }

    /// Returns a reference to a node by index.
    pub fn node(&self, index: usize) -> Option<&NodeDef> {
        self.nodes.get(index)
    }

    /// Returns the node that feeds `node`, if it has one.
    pub fn producer(&self, node: &NodeDef) -> Option<&NodeDef> {
        node.inputs.first().and_then(|name| self.operation(name))
    }

    /// Indices of `index` and every node it (transitively) depends on,
    /// in ascending (execution) order.
    pub fn ancestors_of(&self, index: usize) -> Vec<usize> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            let Some(node) = self.nodes.get(i) else { continue };
            if !seen.insert(i) {
                continue;
            }
            for input in &node.inputs {
                if let Some(&p) = self.by_name.get(input) {
                    stack.push(p);
                }
            }
        }
        seen.into_iter().collect()
    }

    /// SafeTensors file holding this graph's weights, if it has any.
    pub fn weights_file(&self) -> Option<&Path> {
        self.weights_file.as_deref()
    }

    /// Returns the total estimated memory for all weights in bytes.
    pub fn total_weight_bytes(&self) -> usize {
        self.nodes.iter().map(|n| n.estimated_weight_bytes()).sum()
    }

    /// Returns a summary string describing the graph.
    pub fn summary(&self) -> String {
        let total_weight_mb = self.total_weight_bytes() as f64 / (1024.0 * 1024.0);
        let inputs = self
            .nodes
            .iter()
            .filter(|n| n.op == OpKind::Placeholder)
            .count();
        format!(
            "Graph '{}': {} operations, {} input(s), {:.2} MB weights",
            self.name,
            self.num_nodes(),
            inputs,
            total_weight_mb,
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> ModelGraph<S> {
    /// All nodes in topological order.
    pub fn nodes(&self) -> &[NodeDef] {
        &self.nodes
    }
}

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' ({} operations):", self.name, self.nodes.len())?;
        for node in &self.nodes {
            writeln!(f, "  {}", node.summary())?;
        }
        Ok(())
    }
}
