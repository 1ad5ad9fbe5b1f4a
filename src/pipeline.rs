use crate::{
    config::TensorLayout,
    decision::{decide, PredictionReport},
    decode::{decode, DecodeError},
    model_service::{InferenceError, ModelService},
    normalize::{normalize, NormalizeError},
};
use ndarray::Array4;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("Analysis task failed: {0}")]
    Task(String),
}

/// Fixed preprocessing parameters the model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessing {
    pub image_size: u32,
    pub layout: TensorLayout,
}

impl Preprocessing {
    pub fn prepare(&self, bytes: &[u8], filename: &str) -> Result<Array4<f32>, PipelineError> {
        let decoded = decode(bytes, filename)?;
        Ok(normalize(decoded, self.image_size, self.layout)?)
    }
}

/// Runs the whole pipeline for one file. CPU bound: call it off the async
/// runtime.
pub fn analyze<M: ModelService + ?Sized>(
    model: &M,
    preprocessing: &Preprocessing,
    bytes: &[u8],
    filename: &str,
) -> Result<PredictionReport, PipelineError> {
    let input = preprocessing.prepare(bytes, filename)?;
    let score = model.predict(&input)?;

    if !(0.0..=1.0).contains(&score) {
        return Err(InferenceError::ScoreOutOfRange(score).into());
    }

    let diagnosis = decide(f64::from(score));
    tracing::info!(
        filename,
        score,
        status = ?diagnosis.status,
        "Radiograph analyzed"
    );

    Ok(PredictionReport::new(filename, diagnosis))
}
