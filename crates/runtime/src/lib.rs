// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The execution engine and the image classifier built on it.
//!
//! The runtime takes:
//! - A finalized `ModelGraph` from `model-ir`.
//! - Its weights, decoded once into a resident [`WeightStore`].
//! - A newline-delimited [`LabelList`].
//!
//! And classifies images: decode, resize to the graph's input, run the
//! graph on a batch of one, check the output is a probability
//! distribution, and pair it with the labels.
//!
//! # Type-State Pipeline
//! The engine enforces a type-safe pipeline:
//! ```text
//! InferenceEngine<Idle> → InferenceEngine<Loaded> → InferenceEngine<Ready>
//! ```
//! Transitions are compile-time checked.
//!
//! # Concurrency
//! A `Ready` engine is immutable and `Send + Sync`; every `run` allocates
//! its own activations. Callers may share one [`Classifier`] across threads
//! behind an `Arc` without locking.

mod classify;
mod config;
mod engine;
mod error;
mod labels;
mod metrics;
mod preprocess;
mod weights;

pub use classify::{validate_probabilities, Classification, Classifier};
pub use config::RuntimeConfig;
pub use engine::{
    EngineState, ExecutionPlan, Idle, InferenceEngine, InferenceOutput, Loaded, PlanStep, Ready,
};
pub use error::{ClassifyError, RuntimeError};
pub use labels::LabelList;
pub use metrics::{InferenceMetrics, NodeMetrics};
pub use preprocess::{ImagePreprocessor, CHANNELS};
pub use weights::WeightStore;
