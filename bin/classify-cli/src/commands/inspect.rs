// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `imgclass inspect`: list every operation in the graph.
//!
//! Useful when the input and output operation names are not known.

use server::AppConfig;

pub fn execute(config: AppConfig) -> anyhow::Result<()> {
    let path = &config.runtime.graph_path;
    let graph = model_ir::ModelLoader::load(path)
        .map_err(|e| anyhow::anyhow!("failed to load graph from '{}': {e}", path.display()))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", graph.summary());
    println!();

    // ── Operations ─────────────────────────────────────────────
    println!(
        "  {:<4} {:<30} {:<16} {:<30} {:<20} {:>10}",
        "Idx", "Name", "Op", "Inputs", "Shape", "Weights"
    );
    println!("  {}", "-".repeat(116));
    for node in graph.iter_nodes() {
        println!(
            "  {:<4} {:<30} {:<16} {:<30} {:<20} {:>7.1} KB",
            node.index,
            truncate(&node.name, 30),
            node.op.as_str(),
            truncate(&node.inputs.join(", "), 30),
            node.output_shape.to_string(),
            node.estimated_weight_bytes() as f64 / 1024.0,
        );
    }
    println!();

    // ── Interface ──────────────────────────────────────────────
    let input = &config.runtime.input_operation;
    let output = &config.runtime.output_operation;
    match runtime::InferenceEngine::new(config.runtime.clone()).with_graph(graph) {
        Ok(engine) => {
            println!("  input:  '{input}' {}", engine.input_shape());
            println!("  output: '{output}' [{}]", engine.output_width());
        }
        Err(e) => println!("  interface not usable: {e}"),
    }
    Ok(())
}

/// Truncates a string to `max_len` with ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
