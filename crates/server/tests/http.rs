// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! HTTP tests: routes, status codes and the inference limiter.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use image::{Rgb, RgbImage};
use runtime::{Classifier, RuntimeConfig};
use server::{configure, AppState, ServerConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Helpers ────────────────────────────────────────────────────

/// Writes a graph whose `final_result` is `head(bias)` for every image.
fn write_graph(dir: &Path, bias: &[f32; 3], head: &str) -> PathBuf {
    let manifest = format!(
        r#"{{
            "name": "fixture",
            "weights": "graph.safetensors",
            "nodes": [
                {{ "name": "input", "op": "placeholder", "shape": [224, 224, 3] }},
                {{ "name": "pool", "op": "global_avg_pool", "inputs": ["input"] }},
                {{ "name": "logits", "op": "dense", "inputs": ["pool"],
                   "weights": ["logits/kernel", "logits/bias"] }},
                {{ "name": "final_result", "op": "{head}", "inputs": ["logits"] }}
            ]
        }}"#
    );
    let graph_path = dir.join("graph.json");
    std::fs::write(&graph_path, manifest).unwrap();

    let kernel_bytes: Vec<u8> = [0.0f32; 9].iter().flat_map(|v| v.to_le_bytes()).collect();
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

fn classifier(dir: &Path, bias: &[f32; 3], head: &str) -> Classifier {
    let graph_path = write_graph(dir, bias, head);
    let labels_path = dir.join("labels.txt");
    std::fs::write(&labels_path, "cat\ndog\nbird\n").unwrap();
    Classifier::from_config(RuntimeConfig {
        graph_path,
        labels_path,
        ..Default::default()
    })
    .unwrap()
}

/// Always answers `{"cat": 0.7, "dog": 0.2, "bird": 0.1}`.
fn fixed_scores(dir: &Path) -> Classifier {
    classifier(dir, &[0.7f32.ln(), 0.2f32.ln(), 0.1f32.ln()], "softmax")
}

fn write_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(w, h, Rgb([40, 80, 120])).save(&path).unwrap();
    path
}

fn state(classifier: Classifier, server: ServerConfig) -> AppState {
    AppState::new(Arc::new(classifier), &server)
}

fn uri(path: &Path) -> String {
    format!("/classification?file_path={}", path.display())
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure),
        )
        .await
    };
}

// ── Routes ─────────────────────────────────────────────────────

#[actix_web::test]
async fn test_index_serves_html() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(fixed_scores(dir.path()), ServerConfig::default()));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("<form"));
    assert!(html.contains("/classification"));
}

#[actix_web::test]
async fn test_classification_returns_label_map() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(fixed_scores(dir.path()), ServerConfig::default()));
    let image = write_image(dir.path(), "pet.png", 320, 240);

    let req = test::TestRequest::get().uri(&uri(&image)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    let (cat, dog, bird) = (
        text.find("\"cat\"").unwrap(),
        text.find("\"dog\"").unwrap(),
        text.find("\"bird\"").unwrap(),
    );
    assert!(cat < dog && dog < bird, "keys out of label order: {text}");

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 3);
    for (label, expected) in [("cat", 0.7), ("dog", 0.2), ("bird", 0.1)] {
        let p = obj[label].as_f64().unwrap();
        assert!((p - expected).abs() < 1e-5, "{label}: {p}");
    }
}

// ── Failures ───────────────────────────────────────────────────

#[actix_web::test]
async fn test_missing_file_path_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(fixed_scores(dir.path()), ServerConfig::default()));

    for uri in ["/classification", "/classification?file_path="] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("file_path"));
    }
}

#[actix_web::test]
async fn test_missing_image_then_valid_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(fixed_scores(dir.path()), ServerConfig::default()));

    let missing = dir.path().join("nope.jpg");
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri(&missing)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let image = write_image(dir.path(), "ok.png", 30, 30);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri(&image)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_non_image_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(fixed_scores(dir.path()), ServerConfig::default()));
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not an image").unwrap();

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri(&notes)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_probability_sum_violation_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(
        classifier(dir.path(), &[0.5, 0.3, 0.1], "identity"),
        ServerConfig::default()
    ));
    let image = write_image(dir.path(), "x.png", 16, 16);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri(&image)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert!(json["error"].as_str().unwrap().contains("probabilities"));
}

// ── Limiter ────────────────────────────────────────────────────

#[actix_web::test]
async fn test_serialized_requests_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let server = ServerConfig {
        max_concurrent_inferences: Some(1),
        ..Default::default()
    };
    let shared = state(fixed_scores(dir.path()), server);
    let app = app!(shared.clone());
    let image = write_image(dir.path(), "s.png", 200, 150);
    let req = || test::TestRequest::get().uri(&uri(&image)).to_request();

    let (a, b, c) = tokio::join!(
        test::call_service(&app, req()),
        test::call_service(&app, req()),
        test::call_service(&app, req()),
    );
    for resp in [a, b, c] {
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(shared.available_permits(), 1);
}

#[actix_web::test]
async fn test_slow_inference_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let server = ServerConfig {
        inference_timeout_ms: Some(1),
        ..Default::default()
    };
    let app = app!(state(fixed_scores(dir.path()), server));
    let image = write_image(dir.path(), "big.png", 3000, 3000);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri(&image)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[actix_web::test]
async fn test_closed_limiter_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let shared = state(fixed_scores(dir.path()), ServerConfig::default());
    let app = app!(shared.clone());
    let image = write_image(dir.path(), "c.png", 20, 20);

    shared.close();
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri(&image)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
