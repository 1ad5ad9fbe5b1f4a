use crate::{
    config::ModelConfig,
    model_service::{InferenceError, ModelService},
};
use ndarray::Array4;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::{
    fmt::Display,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("Failed to load model: {0}")]
    Runtime(String),
}

fn load_error(e: impl Display) -> ModelLoadError {
    ModelLoadError::Runtime(e.to_string())
}

fn runtime_error(e: impl Display) -> InferenceError {
    InferenceError::Runtime(e.to_string())
}

#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    input_shape: [usize; 4],
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ModelLoadError> {
        let path = model_config.get_path();
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path));
        }

        let sessions = (0..model_config.num_instances.max(1))
            .map(|_| {
                let session = Session::builder()
                    .map_err(load_error)?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .map_err(load_error)?
                    .commit_from_file(&path)
                    .map_err(load_error)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ModelLoadError>>()?;

        tracing::info!(
            "Created {} ONNX sessions from {:?}",
            sessions.len(),
            path
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            input_shape: model_config.input_shape(),
        })
    }

    pub fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }
}

impl ModelService for OrtModelService {
    fn predict(&self, input: &Array4<f32>) -> Result<f32, InferenceError> {
        if input.shape() != &self.input_shape[..] {
            return Err(InferenceError::ShapeMismatch {
                expected: self.input_shape,
                actual: input.shape().to_vec(),
            });
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[index]
            .lock()
            .map_err(|_| InferenceError::Poisoned)?;

        tracing::debug!("Handling request with session {}", index);
        let input = input.as_standard_layout();
        let tensor_ref = TensorRef::from_array_view(input.view()).map_err(runtime_error)?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(runtime_error)?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(runtime_error)?;

        let score = data.first().copied();
        score.ok_or(InferenceError::EmptyOutput)
    }
}
