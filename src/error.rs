use crate::{pipeline::PipelineError, storage::StorageError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Model is not loaded.")]
    ModelUnavailable,
    #[error("Missing field '{0}' in request.")]
    MissingParameter(&'static str),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Upload exceeds the size limit: {0}")]
    PayloadTooLarge(String),
    #[error("Error analyzing image: {0}")]
    Processing(#[from] PipelineError),
    #[error("Could not process image: {0}")]
    StorageOrProcessing(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ModelUnavailable | ApiError::Processing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::MissingParameter(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::StorageOrProcessing(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl ApiError {
    /// Keeps the size-limit status of a rejected body; anything else is a bad request.
    pub fn from_rejection(status: StatusCode, detail: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(detail)
        } else {
            ApiError::InvalidRequest(detail)
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::StorageOrProcessing(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(detail = %self, "Request failed");
        } else {
            tracing::warn!(detail = %self, "Request rejected");
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
