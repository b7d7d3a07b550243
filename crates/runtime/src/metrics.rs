// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference profiling metrics.
//!
//! [`InferenceMetrics`] collects per-node and aggregate timing plus the
//! activation high-water mark of a single graph execution. Per-node entries
//! are only recorded when profiling is enabled.

use std::time::Duration;

/// Metrics for a single node's execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeMetrics {
    /// Operation name.
    pub node_name: String,
    /// Op kind (e.g., `"dense"`).
    pub op: &'static str,
    /// Time spent executing the node.
    pub compute_duration: Duration,
    /// Bytes of live activations right after this node ran.
    pub live_activation_bytes: usize,
}

/// Aggregate metrics for a complete graph execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InferenceMetrics {
    /// Total wall-clock time for the run.
    pub total_duration: Duration,
    /// Sum of per-node compute time.
    pub total_compute_duration: Duration,
    /// Largest amount of live activation memory observed.
    pub peak_activation_bytes: usize,
    /// Per-node metrics (empty unless profiling).
    pub node_metrics: Vec<NodeMetrics>,
    /// Number of nodes in the execution plan.
    pub nodes_executed: usize,
    /// Number of images in the batch.
    pub batch_size: usize,
}

impl InferenceMetrics {
    /// Creates an empty metrics container.
    pub fn new(nodes_executed: usize) -> Self {
        Self {
            total_duration: Duration::ZERO,
            total_compute_duration: Duration::ZERO,
            peak_activation_bytes: 0,
            node_metrics: Vec::new(),
            nodes_executed,
            batch_size: 0,
        }
    }

    /// Records metrics for a single node.
    pub fn record_node(
        &mut self,
        name: String,
        op: &'static str,
        compute: Duration,
        live_bytes: usize,
    ) {
        self.total_compute_duration += compute;
        self.observe_live_bytes(live_bytes);
        self.node_metrics.push(NodeMetrics {
            node_name: name,
            op,
            compute_duration: compute,
            live_activation_bytes: live_bytes,
        });
    }

    /// Updates the activation high-water mark.
    pub fn observe_live_bytes(&mut self, live_bytes: usize) {
        self.peak_activation_bytes = self.peak_activation_bytes.max(live_bytes);
    }

    /// Finalises metrics with the total wall-clock time and batch size.
    pub fn finalise(&mut self, total: Duration, batch_size: usize) {
        self.total_duration = total;
        self.batch_size = batch_size;
    }

    /// Returns images per second throughput.
    pub fn images_per_second(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        if secs <= 0.0 || self.batch_size == 0 {
            return 0.0;
        }
        self.batch_size as f64 / secs
    }

    /// Slowest recorded node, if profiling was on.
    pub fn slowest_node(&self) -> Option<&NodeMetrics> {
        self.node_metrics.iter().max_by_key(|m| m.compute_duration)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let peak_mb = self.peak_activation_bytes as f64 / (1024.0 * 1024.0);
        let mut s = format!(
            "Inference: {:.2}ms total, {} nodes, batch {}, peak activations {:.2} MB ({:.1} img/s)",
            self.total_duration.as_secs_f64() * 1000.0,
            self.nodes_executed,
            self.batch_size,
            peak_mb,
            self.images_per_second(),
        );
        if let Some(slowest) = self.slowest_node() {
            s.push_str(&format!(
                ", slowest '{}' ({}) {:.2}ms",
                slowest.node_name,
                slowest.op,
                slowest.compute_duration.as_secs_f64() * 1000.0,
            ));
        }
        s
    }
}
