// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! HTTP routes: the landing page and the classification endpoint.

use crate::{ApiError, AppState};
use actix_web::{get, web, HttpResponse};
use std::path::PathBuf;
use std::time::Instant;

/// Landing page served at `/`.
pub const INDEX_HTML: &str = include_str!("../static/index.html");

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

#[derive(Debug, serde::Deserialize)]
pub struct ClassificationQuery {
    pub file_path: Option<String>,
}

/// `GET /classification?file_path=<path>`
///
/// Responds with a JSON object mapping every label to its probability,
/// in label-file order.
#[get("/classification")]
async fn classification(
    state: web::Data<AppState>,
    query: web::Query<ClassificationQuery>,
) -> Result<HttpResponse, ApiError> {
    let file_path = match query.into_inner().file_path {
        Some(p) if !p.trim().is_empty() => p,
        _ => return Err(ApiError::MissingFilePath),
    };

    let start = Instant::now();
    match state.classify(PathBuf::from(&file_path)).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => {
            tracing::warn!(
                "classification of '{}' failed after {:.2} ms: {}",
                file_path,
                start.elapsed().as_secs_f64() * 1000.0,
                e
            );
            Err(e)
        }
    }
}

/// Registers every route and the query error handler.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadQuery(err.to_string()).into()),
    )
    .service(index)
    .service(classification);
}
