// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! graph_path = "./model/graph.json"
//! labels_path = "./model/labels.txt"
//! input_operation = "input"
//! output_operation = "final_result"
//! probability_tolerance = 1e-4
//! resize_filter = "triangle"
//! enable_profiling = false
//! ```
//!
//! Every field has a default, so an empty document is a valid config.

use crate::RuntimeError;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};

/// Configuration for the classifier runtime.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Path to the graph manifest (`graph.json`).
    pub graph_path: PathBuf,
    /// Path to the newline-delimited label file.
    pub labels_path: PathBuf,
    /// Name of the placeholder fed with the image batch.
    pub input_operation: String,
    /// Name of the operation producing class probabilities.
    pub output_operation: String,
    /// Allowed deviation of the probability sum from 1.0.
    pub probability_tolerance: f32,
    /// Resize filter: `"nearest"`, `"triangle"`, `"catmull-rom"`, `"gaussian"`, `"lanczos3"`.
    pub resize_filter: String,
    /// Whether to record per-node timing metrics.
    pub enable_profiling: bool,
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Checks value ranges and the filter name.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if !(self.probability_tolerance.is_finite() && self.probability_tolerance >= 0.0) {
            return Err(RuntimeError::ConfigError(format!(
                "probability_tolerance must be a non-negative number, got {}",
                self.probability_tolerance
            )));
        }
        if self.input_operation.is_empty() || self.output_operation.is_empty() {
            return Err(RuntimeError::ConfigError(
                "operation names must not be empty".into(),
            ));
        }
        self.parse_filter().map(|_| ())
    }

    /// Resolves the configured resize filter.
    pub fn parse_filter(&self) -> Result<FilterType, RuntimeError> {
        match self.resize_filter.to_lowercase().as_str() {
            "nearest" => Ok(FilterType::Nearest),
            "triangle" | "bilinear" | "linear" => Ok(FilterType::Triangle),
            "catmull-rom" | "catmullrom" | "cubic" => Ok(FilterType::CatmullRom),
            "gaussian" => Ok(FilterType::Gaussian),
            "lanczos3" | "lanczos" => Ok(FilterType::Lanczos3),
            other => Err(RuntimeError::ConfigError(format!(
                "unknown resize filter '{other}'; expected 'nearest', 'triangle', \
                 'catmull-rom', 'gaussian' or 'lanczos3'"
            ))),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            graph_path: PathBuf::from("./model/graph.json"),
            labels_path: PathBuf::from("./model/labels.txt"),
            input_operation: "input".to_string(),
            output_operation: "final_result".to_string(),
            probability_tolerance: 1e-4,
            resize_filter: "triangle".to_string(),
            enable_profiling: false,
        }
    }
}
