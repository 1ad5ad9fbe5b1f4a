use crate::{model_service::ModelService, state::ServiceContext, storage::ObjectStore};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn metrics_handler<M: ModelService, S: ObjectStore>(
    State(state): State<ServiceContext<M, S>>,
) -> Response {
    match state.metrics.render() {
        Ok(text) => text.into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
