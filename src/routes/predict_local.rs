use super::response_status;
use crate::{
    decision::PredictionReport, error::ApiError, model_service::ModelService,
    state::ServiceContext, storage::ObjectStore,
};
use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    response::Json,
};
use tracing::instrument;

const ROUTE: &str = "/predict_local";
const UPLOAD_FIELD: &str = "file";

#[instrument(skip(state, multipart))]
pub async fn predict_local<M: ModelService, S: ObjectStore>(
    State(state): State<ServiceContext<M, S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionReport>, ApiError> {
    let result = analyze_upload(&state, multipart).await;
    state.metrics.record_request(ROUTE, response_status(&result));
    result.map(Json)
}

async fn analyze_upload<M: ModelService, S: ObjectStore>(
    state: &ServiceContext<M, S>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PredictionReport, ApiError> {
    let model = state.model()?;
    let mut multipart =
        multipart.map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;
    let (filename, bytes) = read_upload(&mut multipart).await?;
    tracing::info!(filename = %filename, size = bytes.len(), "Received upload");

    Ok(state.analyze(model, bytes, filename, "upload").await?)
}

fn upload_error(e: MultipartError) -> ApiError {
    ApiError::from_rejection(e.status(), e.body_text())
}

async fn read_upload(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(upload_error)?;
        return Ok((filename, bytes));
    }

    Err(ApiError::MissingParameter(UPLOAD_FIELD))
}
