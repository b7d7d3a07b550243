// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node definitions for the computation graph.
//!
//! Each [`NodeDef`] is one named operation. Weight data is **not** stored
//! here, only names (keys into the SafeTensors file) and shapes. Shapes are
//! per-example: the batch dimension is implicit and chosen at run time.

use tensor_core::{DType, Shape};

/// Default epsilon for layer normalization.
pub const DEFAULT_LAYER_NORM_EPSILON: f32 = 1e-5;

/// The computation a node performs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpKind {
    /// Graph input fed by the caller.
    Placeholder,
    /// Passes its input through unchanged (useful for naming outputs).
    Identity,
    /// `x * scale + offset`.
    Rescale { scale: f32, offset: f32 },
    /// `max(x, 0)`.
    Relu,
    /// Tanh-approximated GELU.
    Gelu,
    /// Softmax over the last dimension.
    Softmax,
    /// Layer normalization over the last dimension; weights `[gamma, beta]`.
    LayerNorm { epsilon: f32 },
    /// `[H, W, C] → [C]` spatial mean.
    GlobalAvgPool,
    /// `[...] → [product]`.
    Flatten,
    /// `[K] → [M]` with weights `[kernel [K, M], bias [M]?]`.
    Dense,
}

impl OpKind {
    /// Maps a manifest op string (and common aliases) to its canonical name.
    ///
    /// ```
    /// use model_ir::OpKind;
    /// assert_eq!(OpKind::canonical_name("MatMul"), Some("dense"));
    /// assert_eq!(OpKind::canonical_name("conv2d"), None);
    /// ```
    pub fn canonical_name(s: &str) -> Option<&'static str> {
        match s.to_lowercase().as_str() {
            "placeholder" | "input" => Some("placeholder"),
            "identity" => Some("identity"),
            "rescale" | "scale" | "affine" => Some("rescale"),
            "relu" => Some("relu"),
            "gelu" => Some("gelu"),
            "softmax" => Some("softmax"),
            "layer_norm" | "layernorm" | "ln" => Some("layer_norm"),
            "global_avg_pool" | "global_average_pool" | "mean_pool" | "gap" => {
                Some("global_avg_pool")
            }
            "flatten" => Some("flatten"),
            "dense" | "linear" | "fc" | "matmul" => Some("dense"),
            _ => None,
        }
    }

    /// Returns the canonical op name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::Identity => "identity",
            Self::Rescale { .. } => "rescale",
            Self::Relu => "relu",
            Self::Gelu => "gelu",
            Self::Softmax => "softmax",
            Self::LayerNorm { .. } => "layer_norm",
            Self::GlobalAvgPool => "global_avg_pool",
            Self::Flatten => "flatten",
            Self::Dense => "dense",
        }
    }

    /// Number of node inputs this op consumes.
    pub fn num_inputs(&self) -> usize {
        match self {
            Self::Placeholder => 0,
            _ => 1,
        }
    }

    /// Allowed number of weight tensors, as `(min, max)`.
    pub fn weight_arity(&self) -> (usize, usize) {
        match self {
            Self::Dense => (1, 2),
            Self::LayerNorm { .. } => (2, 2),
            _ => (0, 0),
        }
    }

    /// Computes the per-example output shape from the input and weight shapes.
    ///
    /// Placeholders carry their own shape and are rejected here.
    pub fn infer_shape(&self, input: &Shape, weights: &[Shape]) -> Result<Shape, String> {
        let (min_w, max_w) = self.weight_arity();
        if weights.len() < min_w || weights.len() > max_w {
            return Err(format!(
                "{} expects {min_w}..={max_w} weight tensors, got {}",
                self.as_str(),
                weights.len()
            ));
        }

        match self {
            Self::Placeholder => Err("placeholder shape is declared, not inferred".into()),
            Self::Identity | Self::Rescale { .. } | Self::Relu | Self::Gelu => Ok(input.clone()),
            Self::Softmax => {
                if input.rank() == 0 {
                    return Err("softmax needs rank >= 1".into());
                }
                Ok(input.clone())
            }
            Self::LayerNorm { .. } => {
                let last = input
                    .last_dim()
                    .ok_or_else(|| "layer_norm needs rank >= 1".to_string())?;
                for w in weights {
                    if w != &Shape::vector(last) {
                        return Err(format!("layer_norm parameter {w} does not match [{last}]"));
                    }
                }
                Ok(input.clone())
            }
            Self::GlobalAvgPool => match input.dims() {
                [_, _, c] => Ok(Shape::vector(*c)),
                _ => Err(format!("global_avg_pool expects [H, W, C], got {input}")),
            },
            Self::Flatten => Ok(Shape::vector(input.num_elements())),
            Self::Dense => {
                let k = match input.dims() {
                    [k] => *k,
                    _ => return Err(format!("dense expects a rank-1 input, got {input}")),
                };
                let kernel = &weights[0];
                let m = match kernel.dims() {
                    [rows, cols] if *rows == k => *cols,
                    _ => return Err(format!("dense kernel {kernel} does not accept input [{k}]")),
                };
                if let Some(bias) = weights.get(1) {
                    if bias != &Shape::vector(m) {
                        return Err(format!("dense bias {bias} does not match [{m}]"));
                    }
                }
                Ok(Shape::vector(m))
            }
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing a single operation in the graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeDef {
    /// Unique operation name (e.g., `"final_result"`).
    pub name: String,
    /// The computation this node performs.
    pub op: OpKind,
    /// Position in topological order (0-based).
    pub index: usize,
    /// Names of the nodes feeding this one.
    pub inputs: Vec<String>,
    /// Names of weight tensors required by this node (keys into SafeTensors).
    pub weight_names: Vec<String>,
    /// Shapes of the weight tensors (parallel to `weight_names`).
    pub weight_shapes: Vec<Shape>,
    /// Per-example shape of this node's output.
    pub output_shape: Shape,
}

impl NodeDef {
    /// Estimated resident size of this node's weights once decoded to `f32`.
    pub fn estimated_weight_bytes(&self) -> usize {
        self.weight_shapes
            .iter()
            .map(|s| s.size_bytes(DType::F32))
            .sum()
    }

    /// Returns a one-line description for listings.
    pub fn summary(&self) -> String {
        let inputs = if self.inputs.is_empty() {
            "-".to_string()
        } else {
            self.inputs.join(", ")
        };
        format!(
            "[{}] {} ({}) <- {} : {}",
            self.index, self.name, self.op, inputs, self.output_shape,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        assert_eq!(OpKind::canonical_name("Placeholder"), Some("placeholder"));
        assert_eq!(OpKind::canonical_name("LayerNorm"), Some("layer_norm"));
        assert_eq!(OpKind::canonical_name("gap"), Some("global_avg_pool"));
        assert_eq!(OpKind::canonical_name("linear"), Some("dense"));
        assert_eq!(OpKind::canonical_name("bogus"), None);
    }

    #[test]
    fn test_infer_pool_and_dense() {
        let pooled = OpKind::GlobalAvgPool
            .infer_shape(&Shape::new(vec![224, 224, 3]), &[])
            .unwrap();
        assert_eq!(pooled, Shape::vector(3));

        let out = OpKind::Dense
            .infer_shape(&pooled, &[Shape::matrix(3, 5), Shape::vector(5)])
            .unwrap();
        assert_eq!(out, Shape::vector(5));
    }

    #[test]
    fn test_infer_dense_errors() {
        let input = Shape::vector(3);
        assert!(OpKind::Dense.infer_shape(&input, &[]).is_err());
        assert!(OpKind::Dense.infer_shape(&input, &[Shape::matrix(4, 5)]).is_err());
        assert!(OpKind::Dense
            .infer_shape(&input, &[Shape::matrix(3, 5), Shape::vector(4)])
            .is_err());
        assert!(OpKind::Dense
            .infer_shape(&Shape::matrix(1, 3), &[Shape::matrix(3, 5)])
            .is_err());
    }

    #[test]
    fn test_infer_flatten_and_passthrough() {
        let s = Shape::new(vec![2, 2, 3]);
        assert_eq!(OpKind::Flatten.infer_shape(&s, &[]).unwrap(), Shape::vector(12));
        assert_eq!(OpKind::Relu.infer_shape(&s, &[]).unwrap(), s);
        assert!(OpKind::Relu.infer_shape(&s, &[Shape::vector(1)]).is_err());
    }

    #[test]
    fn test_infer_layer_norm() {
        let op = OpKind::LayerNorm { epsilon: 1e-5 };
        let s = Shape::vector(8);
        assert!(op.infer_shape(&s, &[Shape::vector(8), Shape::vector(8)]).is_ok());
        assert!(op.infer_shape(&s, &[Shape::vector(8)]).is_err());
        assert!(op.infer_shape(&s, &[Shape::vector(8), Shape::vector(4)]).is_err());
    }

    #[test]
    fn test_node_summary() {
        let node = NodeDef {
            name: "final_result".into(),
            op: OpKind::Softmax,
            index: 4,
            inputs: vec!["logits".into()],
            weight_names: vec![],
            weight_shapes: vec![],
            output_shape: Shape::vector(3),
        };
        let s = node.summary();
        assert!(s.contains("[4] final_result (softmax)"));
        assert!(s.contains("logits"));
        assert!(s.contains("[3]"));
    }

    #[test]
    fn test_serde_op_tag() {
        let json = serde_json::to_string(&OpKind::Rescale { scale: 2.0, offset: 0.0 }).unwrap();
        assert!(json.contains("\"op\":\"rescale\""));
        let back: OpKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OpKind::Rescale { scale: 2.0, offset: 0.0 });
    }
}
