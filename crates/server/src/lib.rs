// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # Server
//!
//! HTTP front end for the image classifier.
//!
//! Routes:
//! - `GET /` serves a small landing page.
//! - `GET /classification?file_path=<path>` classifies an image that is
//!   already on the server's filesystem and returns `{label: probability}`.
//!
//! The [`Classifier`](runtime::Classifier) is built once before the
//! listener starts and is shared read-only by all workers.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ServerConfig};
pub use error::{ApiError, ServerError};
pub use routes::configure;
pub use state::AppState;

use actix_web::{web, App, HttpServer};
use runtime::Classifier;
use std::sync::Arc;

/// Runs the HTTP server until it is shut down.
pub async fn serve(classifier: Classifier, config: &ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    let state = AppState::new(Arc::new(classifier), config);
    let workers = config.resolve_workers();
    tracing::info!(
        "listening on http://{}:{} ({} workers, {} concurrent inferences)",
        config.bind_address,
        config.port,
        workers,
        state.max_concurrent()
    );

    let data = web::Data::new(state);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .workers(workers)
        .bind((config.bind_address.as_str(), config.port))?
        .run()
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
