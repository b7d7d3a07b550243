// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Image decoding and resizing into the graph's input layout.
//!
//! Any colour layout the `image` crate can decode (grayscale, RGBA, 16-bit)
//! is converted to 8-bit RGB, resized to the placeholder's `H × W`, and
//! emitted as a `[1, H, W, 3]` tensor of raw `0..=255` values. Scaling to
//! the model's expected range is left to the graph (`rescale` nodes).

use crate::{ClassifyError, RuntimeError};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError};
use std::path::Path;
use tensor_core::{Shape, Tensor};

/// Number of colour channels fed to the graph.
pub const CHANNELS: usize = 3;

/// Turns image files into single-element input batches.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    height: u32,
    width: u32,
    filter: FilterType,
}

impl ImagePreprocessor {
    pub fn new(height: u32, width: u32, filter: FilterType) -> Self {
        Self {
            height,
            width,
            filter,
        }
    }

    /// Builds a preprocessor matching a `[H, W, 3]` placeholder shape.
    pub fn for_input(shape: &Shape, filter: FilterType) -> Result<Self, RuntimeError> {
        let invalid = || RuntimeError::ConfigError(format!("input shape {shape} is not [H, W, 3]"));
        match shape.dims() {
            [h, w, c] if *c == CHANNELS => {
                let h = u32::try_from(*h).map_err(|_| invalid())?;
                let w = u32::try_from(*w).map_err(|_| invalid())?;
                Ok(Self::new(h, w, filter))
            }
            _ => Err(invalid()),
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Decodes the image at `path` and converts it to an input batch.
    pub fn load(&self, path: &Path) -> Result<Tensor, ClassifyError> {
        let image = Self::decode(path)?;
        self.to_tensor(&image)
    }

    /// Decodes an image file, sniffing the format from its contents.
    pub fn decode(path: &Path) -> Result<DynamicImage, ClassifyError> {
        let read_err = |source: std::io::Error| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ClassifyError::ImageNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ClassifyError::ImageRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        };

        let reader = image::io::Reader::open(path)
            .map_err(read_err)?
            .with_guessed_format()
            .map_err(read_err)?;
        if reader.format().is_none() {
            return Err(ClassifyError::UnsupportedImage {
                path: path.to_path_buf(),
                detail: "unrecognised image format".into(),
            });
        }

        let image = reader.decode().map_err(|e| match e {
            ImageError::Unsupported(u) => ClassifyError::UnsupportedImage {
                path: path.to_path_buf(),
                detail: u.to_string(),
            },
            ImageError::IoError(source) => read_err(source),
            other => ClassifyError::ImageDecode {
                path: path.to_path_buf(),
                source: other,
            },
        })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifyError::UnsupportedImage {
                path: path.to_path_buf(),
                detail: "image has no pixels".into(),
            });
        }

        tracing::debug!(
            "decoded {}: {}x{} {:?}",
            path.display(),
            image.width(),
            image.height(),
            image.color(),
        );
        Ok(image)
    }

    /// Converts a decoded image to a `[1, H, W, 3]` batch.
    pub fn to_tensor(&self, image: &DynamicImage) -> Result<Tensor, ClassifyError> {
        let rgb = image.to_rgb8();
        let resized = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            image::imageops::resize(&rgb, self.width, self.height, self.filter)
        };

        let data: Vec<f32> = resized.into_raw().into_iter().map(f32::from).collect();
        let shape = Shape::new(vec![1, self.height as usize, self.width as usize, CHANNELS]);
        Tensor::from_vec(shape, data).map_err(|source| {
            ClassifyError::Inference(RuntimeError::ExecutionError {
                node: "preprocess".into(),
                source,
            })
        })
    }
}
