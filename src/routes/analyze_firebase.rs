use super::response_status;
use crate::{
    decision::PredictionReport, error::ApiError, model_service::ModelService,
    state::ServiceContext, storage::ObjectStore,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const ROUTE: &str = "/analyze_firebase";

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub path: Option<String>,
}

#[instrument(skip(state, payload))]
pub async fn analyze_firebase<M: ModelService, S: ObjectStore>(
    State(state): State<ServiceContext<M, S>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<PredictionReport>, ApiError> {
    let result = analyze_remote(&state, payload).await;
    state.metrics.record_request(ROUTE, response_status(&result));
    result.map(Json)
}

async fn analyze_remote<M: ModelService, S: ObjectStore>(
    state: &ServiceContext<M, S>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<PredictionReport, ApiError> {
    let model = state.model()?;

    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let path = request
        .path
        .filter(|path| !path.trim().is_empty())
        .ok_or(ApiError::MissingParameter("path"))?;

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::StorageOrProcessing("storage is not configured".to_string()))?;

    tracing::info!(path = %path, "Requesting object from storage");
    let bytes = storage.download(&path).await?;

    // The object path doubles as the filename, so its extension selects the decoder.
    state
        .analyze(model, bytes, path, "storage")
        .await
        .map_err(|e| ApiError::StorageOrProcessing(e.to_string()))
}
