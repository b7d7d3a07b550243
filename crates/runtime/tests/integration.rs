// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end classification pipeline.
//!
//! These tests write a real graph manifest, SafeTensors weights, label
//! file and images to a temporary directory, then go through the same
//! startup path the server uses (`Classifier::from_config`).

use image::{Rgb, RgbImage};
use runtime::{Classifier, ClassifyError, RuntimeConfig, RuntimeError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Helpers ────────────────────────────────────────────────────

/// How the fixture graph turns logits into its `final_result`.
#[derive(Clone, Copy)]
enum Head {
    Softmax,
    Identity,
}

/// Writes `input[224,224,3] → scaled → pool → logits → final_result`.
///
/// `scaled` divides by 255, `logits` is a 3×3 dense layer with the given
/// kernel and bias.
fn write_graph(dir: &Path, kernel: &[f32; 9], bias: &[f32; 3], head: Head) -> PathBuf {
    let head_op = match head {
        Head::Softmax => "softmax",
        Head::Identity => "identity",
    };
    let manifest = format!(
        r#"{{
            "name": "fixture",
            "weights": "graph.safetensors",
            "nodes": [
                {{ "name": "input", "op": "placeholder", "shape": [224, 224, 3] }},
                {{ "name": "scaled", "op": "rescale", "inputs": ["input"], "scale": 0.003921569 }},
                {{ "name": "pool", "op": "global_avg_pool", "inputs": ["scaled"] }},
                {{ "name": "logits", "op": "dense", "inputs": ["pool"],
                   "weights": ["logits/kernel", "logits/bias"] }},
                {{ "name": "final_result", "op": "{head_op}", "inputs": ["logits"] }}
            ]
        }}"#
    );
    let graph_path = dir.join("graph.json");
    std::fs::write(&graph_path, manifest).unwrap();

    let kernel_bytes: Vec<u8> = kernel.iter().flat_map(|v| v.to_le_bytes()).collect();
    let bias_bytes: Vec<u8> = bias.iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut tensors = HashMap::new();
    tensors.insert(
        "logits/kernel".to_string(),
        safetensors::tensor::TensorView::new(safetensors::Dtype::F32, vec![3, 3], &kernel_bytes)
            .unwrap(),
    );
    tensors.insert(
        "logits/bias".to_string(),
        safetensors::tensor::TensorView::new(safetensors::Dtype::F32, vec![3], &bias_bytes)
            .unwrap(),
    );
    std::fs::write(
        dir.join("graph.safetensors"),
        safetensors::serialize(&tensors, &None).unwrap(),
    )
    .unwrap();

    graph_path
}

fn write_labels(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("labels.txt");
    std::fs::write(&path, text).unwrap();
    path
}

fn write_image(dir: &Path, name: &str, w: u32, h: u32, rgb: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(w, h, Rgb(rgb)).save(&path).unwrap();
    path
}

fn config(graph_path: PathBuf, labels_path: PathBuf) -> RuntimeConfig {
    RuntimeConfig {
        graph_path,
        labels_path,
        ..Default::default()
    }
}

/// A graph that always scores `[0.7, 0.2, 0.1]`.
fn fixed_scores_classifier(dir: &Path) -> Classifier {
    let ln = |p: f32| p.ln();
    let graph = write_graph(dir, &[0.0; 9], &[ln(0.7), ln(0.2), ln(0.1)], Head::Softmax);
    let labels = write_labels(dir, "cat\ndog\nbird\n");
    Classifier::from_config(config(graph, labels)).unwrap()
}

/// A graph whose logits are the mean colour channels scaled to `[0, 1]` × 4.
fn colour_classifier(dir: &Path) -> Classifier {
    let kernel = [4.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 4.0];
    let graph = write_graph(dir, &kernel, &[0.0; 3], Head::Softmax);
    let labels = write_labels(dir, "red\ngreen\nblue\n");
    Classifier::from_config(config(graph, labels)).unwrap()
}

// ── Result shape and values ────────────────────────────────────

#[test]
fn test_fixed_scores_map_onto_labels() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = fixed_scores_classifier(dir.path());
    let image = write_image(dir.path(), "any.png", 300, 200, [12, 34, 56]);

    let result = classifier.classify(&image).unwrap();

    let keys: Vec<&str> = result.iter().map(|(l, _)| l).collect();
    assert_eq!(keys, vec!["cat", "dog", "bird"]);
    for (label, expected) in [("cat", 0.7), ("dog", 0.2), ("bird", 0.1)] {
        let p = result.get(label).unwrap();
        assert!((p - expected).abs() < 1e-5, "{label}: {p} vs {expected}");
    }

    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 3);
    assert!((obj["cat"].as_f64().unwrap() - 0.7).abs() < 1e-5);
}

#[test]
fn test_keys_match_labels_and_sum_to_one() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = colour_classifier(dir.path());

    for (name, rgb) in [("r.png", [250, 10, 10]), ("m.png", [90, 160, 30]), ("k.png", [0, 0, 0])] {
        let image = write_image(dir.path(), name, 64, 48, rgb);
        let result = classifier.classify(&image).unwrap();
        let keys: Vec<&str> = result.iter().map(|(l, _)| l).collect();
        assert_eq!(keys, classifier.labels().iter().collect::<Vec<_>>());
        assert!((result.total() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_image_content_drives_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = colour_classifier(dir.path());

    let cases = [
        ("red.png", [255, 0, 0], "red"),
        ("green.png", [0, 255, 0], "green"),
        ("blue.jpg", [0, 0, 255], "blue"),
    ];
    for (name, rgb, expected) in cases {
        let image = write_image(dir.path(), name, 224, 224, rgb);
        let result = classifier.classify(&image).unwrap();
        assert_eq!(result.top().unwrap().1, expected, "{name}");
    }
}

#[test]
fn test_classification_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = colour_classifier(dir.path());
    let image = write_image(dir.path(), "d.png", 333, 111, [200, 120, 40]);

    let first = classifier.classify(&image).unwrap();
    for _ in 0..3 {
        assert_eq!(classifier.classify(&image).unwrap(), first);
    }
}

#[test]
fn test_sum_violation_fails_request() {
    let dir = tempfile::tempdir().unwrap();
    let graph = write_graph(dir.path(), &[0.0; 9], &[0.7, 0.1, 0.1], Head::Identity);
    let labels = write_labels(dir.path(), "cat\ndog\nbird\n");
    let classifier = Classifier::from_config(config(graph, labels)).unwrap();
    let image = write_image(dir.path(), "x.png", 10, 10, [1, 2, 3]);

    let err = classifier.classify(&image).unwrap_err();
    assert!(matches!(err, ClassifyError::InvalidProbabilities(_)));
    assert!(!err.is_client_error());
}

// ── Request-scoped failures ────────────────────────────────────

#[test]
fn test_missing_image_then_valid_request() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = fixed_scores_classifier(dir.path());

    let err = classifier
        .classify(&dir.path().join("does-not-exist.jpg"))
        .unwrap_err();
    assert!(matches!(err, ClassifyError::ImageNotFound { .. }));
    assert!(err.is_client_error());

    let image = write_image(dir.path(), "ok.png", 50, 50, [9, 9, 9]);
    assert!(classifier.classify(&image).is_ok());
}

#[test]
fn test_unsupported_file_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = fixed_scores_classifier(dir.path());
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "hello").unwrap();

    let err = classifier.classify(&notes).unwrap_err();
    assert!(err.is_client_error());
}

#[test]
fn test_concurrent_classification() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = Arc::new(colour_classifier(dir.path()));
    let image = write_image(dir.path(), "c.png", 120, 90, [30, 200, 60]);
    let expected = classifier.classify(&image).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let classifier = Arc::clone(&classifier);
            let image = image.clone();
            std::thread::spawn(move || classifier.classify(&image).unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}

// ── Startup failures ───────────────────────────────────────────

#[test]
fn test_startup_fails_without_graph() {
    let dir = tempfile::tempdir().unwrap();
    let labels = write_labels(dir.path(), "cat\ndog\nbird\n");
    let err = Classifier::from_config(config(dir.path().join("missing.json"), labels)).unwrap_err();
    assert!(matches!(err, RuntimeError::ModelError(_)));
}

#[test]
fn test_startup_fails_on_corrupt_graph() {
    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("graph.json");
    std::fs::write(&graph, b"\x08\x01\x12garbage protobuf bytes").unwrap();
    let labels = write_labels(dir.path(), "cat\ndog\nbird\n");
    let err = Classifier::from_config(config(graph, labels)).unwrap_err();
    assert!(matches!(err, RuntimeError::ModelError(_)));
}

#[test]
fn test_startup_fails_without_labels() {
    let dir = tempfile::tempdir().unwrap();
    let graph = write_graph(dir.path(), &[0.0; 9], &[0.0; 3], Head::Softmax);
    let err = Classifier::from_config(config(graph, dir.path().join("labels.txt"))).unwrap_err();
    assert!(matches!(err, RuntimeError::LabelsError { .. }));
}

#[test]
fn test_startup_fails_on_label_count_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let graph = write_graph(dir.path(), &[0.0; 9], &[0.0; 3], Head::Softmax);
    let labels = write_labels(dir.path(), "cat\ndog\n");
    let err = Classifier::from_config(config(graph, labels)).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::LabelCountMismatch { labels: 2, outputs: 3 }
    ));
}

#[test]
fn test_startup_fails_on_unknown_output_operation() {
    let dir = tempfile::tempdir().unwrap();
    let graph = write_graph(dir.path(), &[0.0; 9], &[0.0; 3], Head::Softmax);
    let labels = write_labels(dir.path(), "cat\ndog\nbird\n");
    let cfg = RuntimeConfig {
        output_operation: "softmax_out".into(),
        ..config(graph, labels)
    };
    let err = Classifier::from_config(cfg).unwrap_err();
    assert!(err.to_string().contains("softmax_out"));
}

#[test]
fn test_startup_fails_on_missing_weights_file() {
    let dir = tempfile::tempdir().unwrap();
    let graph = write_graph(dir.path(), &[0.0; 9], &[0.0; 3], Head::Softmax);
    std::fs::remove_file(dir.path().join("graph.safetensors")).unwrap();
    let labels = write_labels(dir.path(), "cat\ndog\nbird\n");
    assert!(Classifier::from_config(config(graph, labels)).is_err());
}
