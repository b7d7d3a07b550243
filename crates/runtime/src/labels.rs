// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Ordered class labels read from a side-car text file.
//!
//! One label per line, UTF-8. Line terminators (`\n` or `\r\n`) are
//! stripped; position `i` names output element `i`.

use crate::RuntimeError;
use std::collections::HashSet;
use std::path::Path;

/// The ordered list of class labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelList {
    labels: Vec<String>,
}

impl LabelList {
    /// Reads labels from a file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let text = std::fs::read_to_string(path).map_err(|e| RuntimeError::LabelsError {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_text(&text).map_err(|detail| RuntimeError::LabelsError {
            path: path.to_path_buf(),
            detail,
        })
    }

    /// Parses labels from newline-delimited text.
    ///
    /// A single trailing newline is allowed. Empty lines, duplicates and an
    /// empty list are rejected because they would make the mapping from
    /// output position to label ambiguous.
    pub fn from_text(text: &str) -> Result<Self, String> {
        let labels: Vec<String> = text
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        if labels.is_empty() {
            return Err("no labels".into());
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(format!("line {} is empty", i + 1));
            }
            if !seen.insert(label.as_str()) {
                return Err(format!("duplicate label '{label}' on line {}", i + 1));
            }
        }

        Ok(Self { labels })
    }

    /// Builds a list directly from strings (no validation beyond the above).
    pub fn new<I, S>(labels: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let joined: Vec<String> = labels.into_iter().map(Into::into).collect();
        Self::from_text(&joined.join("\n"))
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always `false` for a constructed list.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at output position `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}
