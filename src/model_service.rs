use ndarray::Array4;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Input tensor has shape {actual:?}, model expects {expected:?}")]
    ShapeMismatch {
        expected: [usize; 4],
        actual: Vec<usize>,
    },
    #[error("Inference failed: {0}")]
    Runtime(String),
    #[error("Session mutex poisoned")]
    Poisoned,
    #[error("Model returned an empty output tensor")]
    EmptyOutput,
    #[error("Model score {0} is outside [0, 1]")]
    ScoreOutOfRange(f32),
}

/// A fracture classifier: one image tensor in, the probability of a healthy
/// bone out. Implementations are shared across requests and called from the
/// blocking thread pool.
pub trait ModelService: Send + Sync + 'static {
    fn predict(&self, input: &Array4<f32>) -> Result<f32, InferenceError>;
}
