#![cfg(feature = "backend-tract")]

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{Detection, DetectionResult, ObjectClass};
use crate::geometry::BoundingBox;

/// Values per candidate row: cx, cy, w, h, confidence, class id.
const ROW_LEN: usize = 6;
const CLASS_PERSON: f32 = 0.0;
const CLASS_HEAD: f32 = 1.0;

/// Tract-based backend for a local ONNX person/head detector.
///
/// The model takes a `1x3xHxW` RGB tensor scaled to 0..1 and returns
/// `1xNx6` candidate rows. Boxes are reported in model input pixels.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.5,
        })
    }

    /// Override the model-level confidence floor.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = view.iter().copied().collect();
        if flat.len() % ROW_LEN != 0 {
            return Err(anyhow!(
                "model output length {} is not a multiple of {}",
                flat.len(),
                ROW_LEN
            ));
        }

        Ok(flat
            .chunks_exact(ROW_LEN)
            .filter(|row| row[4].is_finite() && row[4] >= self.confidence_threshold)
            .filter_map(|row| {
                let class = if row[5] == CLASS_PERSON {
                    ObjectClass::Person
                } else if row[5] == CLASS_HEAD {
                    ObjectClass::Head
                } else {
                    return None;
                };
                Some(Detection::new(
                    class,
                    BoundingBox::new(row[0], row[1], row[2], row[3]),
                    row[4],
                ))
            })
            .collect())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(
            capability,
            DetectionCapability::PersonDetection | DetectionCapability::HeadDetection
        )
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult> {
        let started = Instant::now();
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let detections = self.decode(outputs)?;

        Ok(DetectionResult {
            detections,
            inference_ms: Some(started.elapsed().as_millis() as u64),
        })
    }
}
