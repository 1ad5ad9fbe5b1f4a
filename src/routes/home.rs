use crate::{model_service::ModelService, state::ServiceContext, storage::ObjectStore};
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

const SUPPORTED_FORMATS: &str = "JPG, PNG, DICOM";

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub status: String,
    pub model: String,
    pub support: String,
    pub model_loaded: bool,
    pub storage_connected: bool,
}

/// Reports "online" as long as the server answers, even when the model or the
/// storage client failed to start.
pub async fn home<M: ModelService, S: ObjectStore>(
    State(state): State<ServiceContext<M, S>>,
) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "online".to_string(),
        model: state.model_name().to_string(),
        support: SUPPORTED_FORMATS.to_string(),
        model_loaded: state.model_loaded(),
        storage_connected: state.storage_connected(),
    })
}
