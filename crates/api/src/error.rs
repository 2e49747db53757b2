//! HTTP Error Responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Handler errors and the response shape each one produces.
///
/// `/update` failures report the message only while `/predict` failures
/// also carry the full error trace.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Update payload lacks one of the required gas keys
    #[error("Missing required gas values")]
    MissingGasValues,
    /// Body parsing or storage failure on `/update`
    #[error("{0:#}")]
    Update(anyhow::Error),
    /// Predictor or storage failure on `/predict`
    #[error("{0:#}")]
    Prediction(anyhow::Error),
}

/// Convenience type alias for handler return values
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::MissingGasValues => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Update(_) => {
                error!("Error in update: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
            ApiError::Prediction(err) => {
                let traceback = format!("{err:?}");
                error!("Error in prediction: {}\n{}", message, traceback);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message, "traceback": traceback })),
                )
                    .into_response()
            }
        }
    }
}
