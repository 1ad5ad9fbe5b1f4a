mod analyze_firebase;
mod health;
mod home;
mod metrics;
mod predict_local;

pub use analyze_firebase::AnalyzeRequest;
pub use home::ServiceInfo;

use crate::{error::ApiError, model_service::ModelService, state::ServiceContext, storage::ObjectStore};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};

pub fn api_routes<M: ModelService, S: ObjectStore>() -> Router<ServiceContext<M, S>> {
    Router::new()
        .route("/", get(home::home::<M, S>))
        .route("/health", get(health::healthcheck::<M, S>))
        .route("/metrics", get(metrics::metrics_handler::<M, S>))
        .route("/predict_local", post(predict_local::predict_local::<M, S>))
        .route(
            "/analyze_firebase",
            post(analyze_firebase::analyze_firebase::<M, S>),
        )
}

fn response_status<T>(result: &Result<T, ApiError>) -> u16 {
    match result {
        Ok(_) => StatusCode::OK.as_u16(),
        Err(err) => err.status_code().as_u16(),
    }
}
