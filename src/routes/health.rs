use crate::{model_service::ModelService, state::ServiceContext, storage::ObjectStore};
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Availability {
    Available,
    Degraded,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: Availability,
}

/// Liveness probe. Answers 200 either way; `Degraded` means predictions
/// cannot be served because the model did not load.
pub async fn healthcheck<M: ModelService, S: ObjectStore>(
    State(state): State<ServiceContext<M, S>>,
) -> Json<HealthStatus> {
    let status = if state.model_loaded() {
        Availability::Available
    } else {
        Availability::Degraded
    };
    Json(HealthStatus { status })
}
