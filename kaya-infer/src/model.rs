//! The model seam: one forward pass over a contiguous batch.

use kaya_features::{MODEL_AREA, MODEL_OUTPUT_SIZE, VALUE_OFFSET};
use thiserror::Error;

/// Model construction and evaluation errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("forward pass failed: {0}")]
    Forward(String),
}

/// A loaded network on one device.
///
/// `inputs` is `batch` rows of `MODEL_INPUT_SIZE` floats; the implementation
/// fills `batch` rows of `MODEL_OUTPUT_SIZE` floats. Called from the owning
/// executor's worker thread only.
pub trait Model: Send {
    fn forward(&mut self, inputs: &[f32], outputs: &mut [f32], batch: usize)
        -> Result<(), ModelError>;
}

/// Flat policy over the whole canvas and an even win probability. Baseline
/// for benchmarks and tests.
pub struct UniformModel;

impl Model for UniformModel {
    fn forward(
        &mut self,
        _inputs: &[f32],
        outputs: &mut [f32],
        batch: usize,
    ) -> Result<(), ModelError> {
        outputs.fill(0.0);
        let prior = 1.0 / MODEL_AREA as f32;
        for row in 0..batch {
            let base = row * MODEL_OUTPUT_SIZE;
            for cell in 0..MODEL_AREA {
                outputs[base + cell] = prior;
            }
            outputs[base + VALUE_OFFSET] = 0.5;
        }
        Ok(())
    }
}
