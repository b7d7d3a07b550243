// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Server and application configuration.
//!
//! # TOML Format
//! ```toml
//! [runtime]
//! graph_path = "./model/graph.json"
//! labels_path = "./model/labels.txt"
//!
//! [server]
//! bind_address = "0.0.0.0"
//! port = 5000
//! num_workers = 4
//! max_concurrent_inferences = 4
//! inference_timeout_ms = 30000
//! ```
//!
//! Both tables are optional; missing fields take their defaults.

use crate::ServerError;
use runtime::RuntimeConfig;
use std::path::Path;
use std::time::Duration;

/// HTTP listener and request-handling settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind_address: String,
    /// TCP port.
    pub port: u16,
    /// Number of HTTP worker threads (defaults to number of online CPU cores).
    pub num_workers: Option<usize>,
    /// Inferences allowed to run at once (defaults to number of online CPU cores).
    pub max_concurrent_inferences: Option<usize>,
    /// Upper bound on waiting for and running one inference.
    pub inference_timeout_ms: Option<u64>,
}

impl ServerConfig {
    /// Checks that counts and timeouts are positive.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.bind_address.is_empty() {
            return Err(ServerError::Config("bind_address must not be empty".into()));
        }
        if self.num_workers == Some(0) {
            return Err(ServerError::Config("num_workers must be at least 1".into()));
        }
        if self.max_concurrent_inferences == Some(0) {
            return Err(ServerError::Config(
                "max_concurrent_inferences must be at least 1".into(),
            ));
        }
        if self.inference_timeout_ms == Some(0) {
            return Err(ServerError::Config(
                "inference_timeout_ms must be positive; omit it to disable the timeout".into(),
            ));
        }
        Ok(())
    }

    /// Resolves the number of HTTP workers.
    pub fn resolve_workers(&self) -> usize {
        self.num_workers.unwrap_or_else(available_cpus)
    }

    /// Resolves the inference concurrency limit.
    pub fn resolve_max_concurrent(&self) -> usize {
        self.max_concurrent_inferences.unwrap_or_else(available_cpus)
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_ms.map(Duration::from_millis)
    }
}

fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            num_workers: None,
            max_concurrent_inferences: None,
            inference_timeout_ms: Some(30_000),
        }
    }
}

/// The full configuration file: runtime plus server settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub runtime: RuntimeConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ServerError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| ServerError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ServerError> {
        toml::to_string_pretty(self)
            .map_err(|e| ServerError::Config(format!("TOML serialise error: {e}")))
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        self.runtime.validate()?;
        self.server.validate()
    }
}
