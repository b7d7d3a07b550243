// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the HTTP server.
//!
//! [`ServerError`] is fatal and stops the process. [`ApiError`] is scoped
//! to one request and is rendered as a JSON body `{"error": "..."}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use runtime::{ClassifyError, RuntimeError};
use std::time::Duration;

/// Startup and listener errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration is unreadable or out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// Classifier startup failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Binding or running the listener failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned from request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The `file_path` query parameter is absent or empty.
    #[error("missing required query parameter 'file_path'")]
    MissingFilePath,

    /// The query string could not be parsed.
    #[error("invalid query string: {0}")]
    BadQuery(String),

    /// Classification failed.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// Waiting for or running the inference took too long.
    #[error("inference timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The inference limiter has been shut down.
    #[error("server is shutting down")]
    Unavailable,

    /// The blocking task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFilePath | Self::BadQuery(_) => StatusCode::BAD_REQUEST,
            Self::Classify(ClassifyError::ImageNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Classify(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Classify(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}
