use crate::{
    decision::PredictionReport,
    error::ApiError,
    model_service::ModelService,
    pipeline::{analyze, PipelineError, Preprocessing},
    storage::ObjectStore,
    telemetry::Metrics,
};
use bytes::Bytes;
use std::{sync::Arc, time::Instant};

/// Everything a request handler needs, built once at startup and read-only
/// afterwards. An empty slot means that collaborator failed to start.
pub struct ServiceContext<M, S> {
    model: Option<Arc<M>>,
    storage: Option<Arc<S>>,
    model_name: String,
    preprocessing: Preprocessing,
    pub metrics: Arc<Metrics>,
}

impl<M, S> Clone for ServiceContext<M, S> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            storage: self.storage.clone(),
            model_name: self.model_name.clone(),
            preprocessing: self.preprocessing,
            metrics: self.metrics.clone(),
        }
    }
}

impl<M: ModelService, S: ObjectStore> ServiceContext<M, S> {
    pub fn new(
        model: Option<M>,
        storage: Option<S>,
        model_name: impl Into<String>,
        preprocessing: Preprocessing,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            model: model.map(Arc::new),
            storage: storage.map(Arc::new),
            model_name: model_name.into(),
            preprocessing,
            metrics,
        }
    }

    pub fn model(&self) -> Result<Arc<M>, ApiError> {
        self.model.clone().ok_or(ApiError::ModelUnavailable)
    }

    pub fn storage(&self) -> Option<Arc<S>> {
        self.storage.clone()
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn storage_connected(&self) -> bool {
        self.storage.is_some()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Runs decode, normalization and inference on the blocking pool.
    pub async fn analyze(
        &self,
        model: Arc<M>,
        bytes: Bytes,
        filename: String,
        source: &str,
    ) -> Result<PredictionReport, PipelineError> {
        let preprocessing = self.preprocessing;
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            analyze(model.as_ref(), &preprocessing, &bytes, &filename)
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))?;

        self.metrics
            .record_pipeline_duration(source, started.elapsed().as_secs_f64());
        result
    }
}
