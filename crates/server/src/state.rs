// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shared application state injected into every handler.
//!
//! The classifier itself is immutable and shared without locking. A
//! semaphore bounds how many inferences run at once; each one runs on
//! actix's blocking thread pool so the async workers stay responsive.
//! With `max_concurrent_inferences = 1` inferences are fully serialized.

use crate::{ApiError, ServerConfig};
use actix_web::web;
use runtime::{Classification, Classifier};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// State shared by all workers.
#[derive(Debug, Clone)]
pub struct AppState {
    classifier: Arc<Classifier>,
    limiter: Arc<Semaphore>,
    max_concurrent: usize,
    timeout: Option<Duration>,
}

impl AppState {
    pub fn new(classifier: Arc<Classifier>, config: &ServerConfig) -> Self {
        let max_concurrent = config.resolve_max_concurrent().max(1);
        Self {
            classifier,
            limiter: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            timeout: config.inference_timeout(),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Inference slots not currently in use.
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Stops admitting new inferences; waiting requests fail with 503.
    pub fn close(&self) {
        self.limiter.close();
    }

    /// Classifies the image at `path` under the concurrency limit and timeout.
    ///
    /// The timeout covers both queueing for a slot and the inference. A
    /// timed-out inference keeps its slot until the blocking task finishes,
    /// so the limit always reflects the work actually running.
    pub async fn classify(&self, path: PathBuf) -> Result<Classification, ApiError> {
        let limiter = Arc::clone(&self.limiter);
        let classifier = Arc::clone(&self.classifier);

        let task = async move {
            let permit = limiter
                .acquire_owned()
                .await
                .map_err(|_| ApiError::Unavailable)?;
            web::block(move || {
                let _permit = permit;
                classifier.classify(&path)
            })
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| ApiError::Timeout(limit))?,
            None => task.await,
        }
    }
}
