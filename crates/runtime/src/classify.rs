// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Image classification on top of a ready engine.
//!
//! [`Classifier`] bundles everything loaded once at startup (the engine,
//! the label list and the preprocessor) and is immutable afterwards.
//! [`Classifier::classify`] is the per-request path: decode, resize, run a
//! batch of one, check the output is a probability distribution, and zip
//! it with the labels.

use crate::{
    ClassifyError, ImagePreprocessor, InferenceEngine, LabelList, Ready, RuntimeConfig,
    RuntimeError,
};
use image::DynamicImage;
use serde::ser::SerializeMap;
use std::path::Path;
use std::time::Instant;
use tensor_core::Tensor;

// ── Classification ─────────────────────────────────────────────

/// Label → probability pairs in label-file order.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    entries: Vec<(String, f32)>,
}

impl Classification {
    /// Pairs labels with probabilities by position.
    ///
    /// The two sequences must have the same length; values are kept as
    /// given (no re-normalization).
    pub fn zip(labels: &LabelList, probabilities: &[f32]) -> Result<Self, ClassifyError> {
        if labels.len() != probabilities.len() {
            return Err(ClassifyError::InvalidProbabilities(format!(
                "{} values for {} labels",
                probabilities.len(),
                labels.len()
            )));
        }
        let entries = labels
            .iter()
            .zip(probabilities)
            .map(|(l, &p)| (l.to_string(), p))
            .collect();
        Ok(Self { entries })
    }

    /// Probability assigned to `label`.
    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(l, p)| (l.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all probabilities.
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|&(_, p)| p).sum()
    }

    /// The most probable class as `(index, label, probability)`.
    /// Ties go to the lower index.
    pub fn top(&self) -> Option<(usize, &str, f32)> {
        self.entries
            .iter()
            .enumerate()
            .fold(None::<(usize, &str, f32)>, |best, (i, (l, p))| match best {
                Some((_, _, bp)) if bp >= *p => best,
                _ => Some((i, l.as_str(), *p)),
            })
    }

    /// The `k` most probable classes, best first.
    pub fn top_k(&self, k: usize) -> Vec<(&str, f32)> {
        let mut ranked: Vec<(&str, f32)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

impl serde::Serialize for Classification {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, p) in &self.entries {
            map.serialize_entry(label, p)?;
        }
        map.end()
    }
}

/// Checks that `values` is a probability distribution: finite, each value
/// within `[-tolerance, 1 + tolerance]`, summing to 1 within `tolerance`.
pub fn validate_probabilities(values: &[f32], tolerance: f32) -> Result<(), ClassifyError> {
    let invalid = |detail: String| Err(ClassifyError::InvalidProbabilities(detail));

    if values.is_empty() {
        return invalid("empty output vector".into());
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return invalid(format!("value {} at position {i} is not finite", values[i]));
    }
    let tol = f64::from(tolerance);
    if let Some(i) = values
        .iter()
        .position(|&v| f64::from(v) < -tol || f64::from(v) > 1.0 + tol)
    {
        return invalid(format!("value {} at position {i} is outside [0, 1]", values[i]));
    }
    let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
    if (sum - 1.0).abs() > tol {
        return invalid(format!("probabilities sum to {sum:.6}, expected 1 ± {tolerance}"));
    }
    Ok(())
}

// ── Classifier ─────────────────────────────────────────────────

/// The immutable startup object shared by every request.
#[derive(Debug)]
pub struct Classifier {
    engine: InferenceEngine<Ready>,
    labels: LabelList,
    preprocessor: ImagePreprocessor,
    tolerance: f32,
}

impl Classifier {
    /// Runs the whole startup sequence: labels, graph, weights, checks.
    ///
    /// Any failure is fatal; nothing is retried.
    pub fn from_config(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;

        tracing::info!("loading labels from {}", config.labels_path.display());
        let labels = LabelList::from_file(&config.labels_path)?;
        tracing::info!("{} labels", labels.len());

        tracing::info!("loading model...");
        let engine = InferenceEngine::new(config).load_model()?.prepare()?;
        tracing::info!("done.");

        Self::new(engine, labels)
    }

    /// Assembles a classifier from a ready engine and its labels.
    pub fn new(engine: InferenceEngine<Ready>, labels: LabelList) -> Result<Self, RuntimeError> {
        if labels.len() != engine.output_width() {
            return Err(RuntimeError::LabelCountMismatch {
                labels: labels.len(),
                outputs: engine.output_width(),
            });
        }
        let filter = engine.config().parse_filter()?;
        let preprocessor = ImagePreprocessor::for_input(engine.input_shape(), filter)?;
        let tolerance = engine.config().probability_tolerance;

        tracing::info!(
            "classifier ready: input {} -> {} classes",
            engine.input_shape(),
            labels.len()
        );
        Ok(Self {
            engine,
            labels,
            preprocessor,
            tolerance,
        })
    }

    pub fn engine(&self) -> &InferenceEngine<Ready> {
        &self.engine
    }

    pub fn labels(&self) -> &LabelList {
        &self.labels
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    /// Classifies the image stored at `path`.
    pub fn classify(&self, path: &Path) -> Result<Classification, ClassifyError> {
        let batch = self.preprocessor.load(path)?;
        self.classify_batch(&batch, &path.display().to_string())
    }

    /// Classifies an already-decoded image.
    pub fn classify_image(&self, image: &DynamicImage) -> Result<Classification, ClassifyError> {
        let batch = self.preprocessor.to_tensor(image)?;
        self.classify_batch(&batch, "<memory>")
    }

    fn classify_batch(&self, batch: &Tensor, source: &str) -> Result<Classification, ClassifyError> {
        let start = Instant::now();
        let output = self.engine.run(batch)?;
        tracing::info!(
            "execution time: {:.2} ms",
            start.elapsed().as_secs_f64() * 1000.0
        );

        // Single image in this batch.
        let probabilities = output
            .row(0)
            .ok_or_else(|| ClassifyError::InvalidProbabilities("empty output batch".into()))?;
        validate_probabilities(probabilities, self.tolerance)?;

        let classification = Classification::zip(&self.labels, probabilities)?;
        if let Some((index, label, _)) = classification.top() {
            tracing::info!("image {source} classified as {index} ({label})");
        }
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelList {
        LabelList::from_text("cat\ndog\nbird\n").unwrap()
    }

    #[test]
    fn test_zip_keeps_order_and_values() {
        let c = Classification::zip(&labels(), &[0.7, 0.2, 0.1]).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.get("dog"), Some(0.2));
        assert_eq!(c.get("fish"), None);
        let keys: Vec<&str> = c.iter().map(|(l, _)| l).collect();
        assert_eq!(keys, vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn test_zip_length_mismatch() {
        let err = Classification::zip(&labels(), &[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidProbabilities(_)));
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let c = Classification::zip(&labels(), &[0.1, 0.2, 0.7]).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"cat":0.1,"dog":0.2,"bird":0.7}"#);
    }

    #[test]
    fn test_top_and_top_k() {
        let c = Classification::zip(&labels(), &[0.2, 0.7, 0.1]).unwrap();
        assert_eq!(c.top(), Some((1, "dog", 0.7)));
        assert_eq!(c.top_k(2), vec![("dog", 0.7), ("cat", 0.2)]);
        assert_eq!(c.top_k(10).len(), 3);

        let tie = Classification::zip(&labels(), &[0.4, 0.4, 0.2]).unwrap();
        assert_eq!(tie.top().map(|t| t.0), Some(0));
    }

    #[test]
    fn test_validate_probabilities() {
        assert!(validate_probabilities(&[0.7, 0.2, 0.1], 1e-4).is_ok());
        assert!(validate_probabilities(&[1.0], 1e-4).is_ok());
        assert!(validate_probabilities(&[0.700_01, 0.2, 0.1], 1e-4).is_ok());

        assert!(validate_probabilities(&[0.7, 0.1, 0.1], 1e-4).is_err());
        assert!(validate_probabilities(&[], 1e-4).is_err());
        assert!(validate_probabilities(&[f32::NAN, 1.0], 1e-4).is_err());
        assert!(validate_probabilities(&[1.5, -0.5], 1e-4).is_err());
    }

    #[test]
    fn test_sum_violation_message() {
        let err = validate_probabilities(&[0.7, 0.1, 0.1], 1e-4).unwrap_err();
        assert!(err.to_string().contains("sum to 0.9"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_total() {
        let c = Classification::zip(&labels(), &[0.5, 0.25, 0.25]).unwrap();
        assert_eq!(c.total(), 1.0);
    }
}
