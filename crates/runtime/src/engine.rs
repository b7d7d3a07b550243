// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The graph execution engine with a type-state–enforced pipeline.
//!
//! ```text
//! InferenceEngine<Idle>
//!     │  .load_model()      graph loaded + finalized, interface resolved
//!     ▼
//! InferenceEngine<Loaded>
//!     │  .prepare()         weights decoded, execution plan built
//!     ▼
//! InferenceEngine<Ready>
//!     │  .run(&input)
//!     ▼
//!   InferenceOutput
//! ```
//!
//! Each state owns exactly the data it needs, so no accessor has to
//! unwrap an optional field. A `Ready` engine is immutable: `run` takes
//! `&self` and allocates its activations per call, which makes the engine
//! `Send + Sync` and safe to share between concurrent requests.

use crate::{InferenceMetrics, RuntimeConfig, RuntimeError, WeightStore};
use model_ir::{Finalized, ModelGraph, ModelLoader, NodeDef, OpKind};
use std::time::Instant;
use tensor_core::{Shape, Tensor, TensorError};

// ── Type-state markers ─────────────────────────────────────────

/// Engine is created but no graph is loaded.
#[derive(Debug)]
pub struct Idle;

/// Graph is loaded and its interface points are resolved.
#[derive(Debug)]
pub struct Loaded {
    graph: ModelGraph<Finalized>,
    interface: Interface,
}

/// Weights are resident and the execution plan is fixed.
#[derive(Debug)]
pub struct Ready {
    graph: ModelGraph<Finalized>,
    interface: Interface,
    weights: WeightStore,
    plan: ExecutionPlan,
}

/// Sealed trait for engine states.
pub trait EngineState: std::fmt::Debug + sealed::Sealed {}
impl EngineState for Idle {}
impl EngineState for Loaded {}
impl EngineState for Ready {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Loaded {}
    impl Sealed for super::Ready {}
}

/// The resolved input placeholder and output operation.
#[derive(Debug, Clone)]
struct Interface {
    input: usize,
    output: usize,
    input_shape: Shape,
    output_width: usize,
}

// ── Execution plan ─────────────────────────────────────────────

/// One step of the execution plan.
#[derive(Debug, Clone)]
pub struct PlanStep {
    /// Node executed by this step.
    pub node: usize,
    /// Node whose activation feeds this step (`None` for the placeholder).
    pub input: Option<usize>,
    /// Activations no longer needed once this step has run.
    pub release: Vec<usize>,
}

/// The nodes the output depends on, in execution order, annotated with
/// the point at which every intermediate activation can be dropped.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    /// Plans the execution of `output` and its ancestors.
    ///
    /// Nodes the output does not depend on are never run.
    pub fn build(graph: &ModelGraph<Finalized>, output: usize) -> Self {
        let order = graph.ancestors_of(output);
        let nodes = graph.nodes();

        let mut steps: Vec<PlanStep> = order
            .iter()
            .map(|&i| PlanStep {
                node: i,
                input: nodes[i]
                    .inputs
                    .first()
                    .and_then(|name| graph.operation(name))
                    .map(|n| n.index),
                release: Vec::new(),
            })
            .collect();

        // Release each activation after its last consumer; keep the output.
        let mut last_use = vec![None; nodes.len()];
        for (pos, step) in steps.iter().enumerate() {
            if let Some(src) = step.input {
                last_use[src] = Some(pos);
            }
        }
        for (node, pos) in last_use.into_iter().enumerate() {
            if let Some(pos) = pos {
                if node != output {
                    steps[pos].release.push(node);
                }
            }
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns a summary string for logging.
    pub fn summary(&self) -> String {
        let released: usize = self.steps.iter().map(|s| s.release.len()).sum();
        format!(
            "Plan: {} steps, {} activations released early",
            self.steps.len(),
            released
        )
    }
}

// ── Inference output ───────────────────────────────────────────

/// The result of a single graph execution.
#[derive(Debug)]
pub struct InferenceOutput {
    /// The output operation's activation, shaped `[N, width]`.
    pub output: Tensor,
    /// Timing and activation-memory metrics.
    pub metrics: InferenceMetrics,
}

impl InferenceOutput {
    /// Returns batch element `index` of the output.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        self.output.batch_item(index)
    }
}

// ── Engine ─────────────────────────────────────────────────────

/// The graph execution engine.
///
/// `S` is a type-state marker that enforces the pipeline ordering at
/// compile time. You cannot call `.run()` on an `Idle` engine or
/// `.load_model()` on a `Ready` engine; the compiler catches it.
///
/// # Example
/// ```no_run
/// use runtime::{InferenceEngine, RuntimeConfig};
/// use tensor_core::{Shape, Tensor};
///
/// # fn example() -> Result<(), runtime::RuntimeError> {
/// let engine = InferenceEngine::new(RuntimeConfig::default())
///     .load_model()?
///     .prepare()?;
/// let batch = Tensor::zeros(engine.input_shape().batched(1));
/// let output = engine.run(&batch)?;
/// println!("{}", output.metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct InferenceEngine<S: EngineState = Idle> {
    config: RuntimeConfig,
    state: S,
}

impl<S: EngineState> InferenceEngine<S> {
    /// Returns the configuration the engine was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

// ── Idle → Loaded ──────────────────────────────────────────────

impl InferenceEngine<Idle> {
    /// Creates a new engine from the given configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config, state: Idle }
    }

    /// Loads and finalizes the graph named by the configuration, then
    /// resolves the input and output operations.
    /// Transitions to the `Loaded` state.
    pub fn load_model(self) -> Result<InferenceEngine<Loaded>, RuntimeError> {
        tracing::info!("loading graph from {}", self.config.graph_path.display());
        let graph = ModelLoader::load(&self.config.graph_path)?;
        tracing::info!("{}", graph.summary());
        self.with_graph(graph)
    }

    /// Uses an already-finalized graph (for tests and embedding).
    pub fn with_graph(
        self,
        graph: ModelGraph<Finalized>,
    ) -> Result<InferenceEngine<Loaded>, RuntimeError> {
        let interface = resolve_interface(&graph, &self.config)?;
        tracing::debug!(
            "interface: '{}' {} -> '{}' [{}]",
            self.config.input_operation,
            interface.input_shape,
            self.config.output_operation,
            interface.output_width,
        );
        Ok(InferenceEngine {
            config: self.config,
            state: Loaded { graph, interface },
        })
    }
}

/// Checks that the configured operations form a usable classifier interface:
/// the input is a `[H, W, 3]` placeholder, the output is a vector, and the
/// output depends on the input and on no other placeholder.
fn resolve_interface(
    graph: &ModelGraph<Finalized>,
    config: &RuntimeConfig,
) -> Result<Interface, RuntimeError> {
    let input = graph.resolve(&config.input_operation)?;
    let output = graph.resolve(&config.output_operation)?;

    let input_err = |detail: String| RuntimeError::InterfaceError {
        name: input.name.clone(),
        role: "input",
        detail,
    };
    let output_err = |detail: String| RuntimeError::InterfaceError {
        name: output.name.clone(),
        role: "output",
        detail,
    };

    if input.op != OpKind::Placeholder {
        return Err(input_err(format!("expected a placeholder, found {}", input.op)));
    }
    match input.output_shape.dims() {
        [_, _, 3] => {}
        _ => {
            return Err(input_err(format!(
                "expected shape [H, W, 3], found {}",
                input.output_shape
            )))
        }
    }

    let output_width = match output.output_shape.dims() {
        [width] => *width,
        _ => {
            return Err(output_err(format!(
                "expected a vector of probabilities, found shape {}",
                output.output_shape
            )))
        }
    };

    let ancestors = graph.ancestors_of(output.index);
    if !ancestors.contains(&input.index) {
        return Err(output_err(format!("does not depend on '{}'", input.name)));
    }
    if let Some(other) = ancestors
        .iter()
        .filter_map(|&i| graph.node(i))
        .find(|n| n.op == OpKind::Placeholder && n.index != input.index)
    {
        return Err(output_err(format!(
            "depends on placeholder '{}' which is never fed",
            other.name
        )));
    }

    Ok(Interface {
        input: input.index,
        output: output.index,
        input_shape: input.output_shape.clone(),
        output_width,
    })
}

// ── Loaded → Ready ─────────────────────────────────────────────

impl InferenceEngine<Loaded> {
    /// Returns the finalized graph.
    pub fn graph(&self) -> &ModelGraph<Finalized> {
        &self.state.graph
    }

    /// Per-example input shape `[H, W, 3]`.
    pub fn input_shape(&self) -> &Shape {
        &self.state.interface.input_shape
    }

    /// Length of the output probability vector.
    pub fn output_width(&self) -> usize {
        self.state.interface.output_width
    }

    /// Decodes the graph's weights and builds the execution plan.
    /// Transitions to the `Ready` state.
    pub fn prepare(self) -> Result<InferenceEngine<Ready>, RuntimeError> {
        let weights = WeightStore::load(&self.state.graph)?;
        self.with_weights(weights)
    }

    /// Uses an already-populated weight store (for tests and embedding).
    ///
    /// Every weight reachable from the output must be present with the
    /// shape the graph declares.
    pub fn with_weights(self, weights: WeightStore) -> Result<InferenceEngine<Ready>, RuntimeError> {
        let Loaded { graph, interface } = self.state;
        let plan = ExecutionPlan::build(&graph, interface.output);

        for step in plan.steps() {
            let node = &graph.nodes()[step.node];
            for (name, shape) in node.weight_names.iter().zip(&node.weight_shapes) {
                weights.require(name, shape)?;
            }
        }
        tracing::debug!("{}", plan.summary());

        Ok(InferenceEngine {
            config: self.config,
            state: Ready {
                graph,
                interface,
                weights,
                plan,
            },
        })
    }
}

// ── Ready: run inference ───────────────────────────────────────

impl InferenceEngine<Ready> {
    /// Returns the finalized graph.
    pub fn graph(&self) -> &ModelGraph<Finalized> {
        &self.state.graph
    }

    /// Returns the execution plan.
    pub fn plan(&self) -> &ExecutionPlan {
        &self.state.plan
    }

    /// Per-example input shape `[H, W, 3]`.
    pub fn input_shape(&self) -> &Shape {
        &self.state.interface.input_shape
    }

    /// Length of the output probability vector.
    pub fn output_width(&self) -> usize {
        self.state.interface.output_width
    }

    /// Runs the graph on a batch shaped `[N, H, W, 3]`.
    ///
    /// Steps through the execution plan, keeping only the activations a
    /// later step still needs. Returns the output operation's `[N, width]`
    /// activation.
    pub fn run(&self, input: &Tensor) -> Result<InferenceOutput, RuntimeError> {
        let run_start = Instant::now();
        let Ready {
            graph,
            interface,
            weights,
            plan,
        } = &self.state;

        let batch = match input.shape().split_batch() {
            Some((n, item)) if n > 0 && item == interface.input_shape => n,
            _ => {
                return Err(RuntimeError::InputShapeMismatch {
                    expected: interface.input_shape.clone(),
                    actual: input.shape().clone(),
                })
            }
        };

        let profiling = self.config.enable_profiling;
        let mut metrics = InferenceMetrics::new(plan.len());
        let mut activations: Vec<Option<Tensor>> = vec![None; graph.num_nodes()];
        let mut live_bytes = 0usize;

        tracing::debug!("starting inference: batch {batch}, {} steps", plan.len());

        for step in plan.steps() {
            let node = &graph.nodes()[step.node];
            let node_start = Instant::now();

            let out = match step.input {
                None => input.clone(),
                Some(src) => {
                    let src = activations[src].as_ref().ok_or_else(|| {
                        RuntimeError::ExecutionError {
                            node: node.name.clone(),
                            source: TensorError::Numeric {
                                op: "run",
                                detail: "input activation was released".into(),
                            },
                        }
                    })?;
                    execute_node(node, src, weights, batch)?
                }
            };

            live_bytes += out.size_bytes();
            metrics.observe_live_bytes(live_bytes);
            activations[step.node] = Some(out);
            for &r in &step.release {
                if let Some(t) = activations[r].take() {
                    live_bytes -= t.size_bytes();
                }
            }

            if profiling {
                metrics.record_node(
                    node.name.clone(),
                    node.op.as_str(),
                    node_start.elapsed(),
                    live_bytes,
                );
            }
        }

        let output = activations[interface.output]
            .take()
            .ok_or_else(|| RuntimeError::InterfaceError {
                name: self.config.output_operation.clone(),
                role: "output",
                detail: "was not produced".into(),
            })?;

        metrics.finalise(run_start.elapsed(), batch);
        if profiling {
            tracing::info!("{}", metrics.summary());
        }

        Ok(InferenceOutput { output, metrics })
    }
}

/// Executes a single non-placeholder node on a batched activation.
fn execute_node(
    node: &NodeDef,
    input: &Tensor,
    weights: &WeightStore,
    batch: usize,
) -> Result<Tensor, RuntimeError> {
    let exec = |source: TensorError| RuntimeError::ExecutionError {
        node: node.name.clone(),
        source,
    };
    let weight = |i: usize| weights.require(&node.weight_names[i], &node.weight_shapes[i]);

    let out_shape = node.output_shape.batched(batch);
    match &node.op {
        OpKind::Placeholder | OpKind::Identity => return Ok(input.clone()),
        OpKind::Flatten => return input.clone().reshape(out_shape).map_err(exec),
        _ => {}
    }

    let view = input.view();
    let mut out = Tensor::zeros(out_shape);
    match &node.op {
        OpKind::Placeholder | OpKind::Identity | OpKind::Flatten => {}
        OpKind::Rescale { scale, offset } => {
            tensor_core::rescale(&view, *scale, *offset, &mut out).map_err(exec)?
        }
        OpKind::Relu => tensor_core::relu(&view, &mut out).map_err(exec)?,
        OpKind::Gelu => tensor_core::gelu(&view, &mut out).map_err(exec)?,
        OpKind::Softmax => tensor_core::softmax(&view, &mut out).map_err(exec)?,
        OpKind::LayerNorm { epsilon } => {
            let gamma = weight(0)?;
            let beta = weight(1)?;
            tensor_core::layer_norm(&view, &gamma.view(), &beta.view(), *epsilon, &mut out)
                .map_err(exec)?
        }
        OpKind::GlobalAvgPool => tensor_core::global_avg_pool(&view, &mut out).map_err(exec)?,
        OpKind::Dense => {
            let kernel = weight(0)?;
            tensor_core::matmul(&view, &kernel.view(), &mut out).map_err(exec)?;
            if node.weight_names.len() > 1 {
                let bias = weight(1)?;
                let mut biased = Tensor::zeros(out.shape().clone());
                tensor_core::bias_add(&out.view(), &bias.view(), &mut biased).map_err(exec)?;
                out = biased;
            }
        }
    }

    Ok(out)
}

impl<S: EngineState> std::fmt::Debug for InferenceEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("state", &std::any::type_name::<S>())
            .field("graph_path", &self.config.graph_path)
            .field("input", &self.config.input_operation)
            .field("output", &self.config.output_operation)
            .finish()
    }
}
