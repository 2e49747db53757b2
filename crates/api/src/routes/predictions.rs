//! Prediction Routes

use anyhow::Context;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Response for the predict endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_aqi: f64,
    /// AQI of the newest stored reading, `null` when the store is empty
    pub current_aqi: Option<f64>,
}

/// Predict the next AQI and report it next to the latest stored value
pub async fn predict(State(state): State<Arc<AppState>>) -> ApiResult<Json<PredictResponse>> {
    info!("Predict endpoint called");
    let response = predict_with_current(&state)
        .await
        .map_err(ApiError::Prediction)?;

    Ok(Json(response))
}

async fn predict_with_current(state: &AppState) -> anyhow::Result<PredictResponse> {
    info!("Calling predictor {}", state.predictor.predictor_name());
    let predicted_aqi = state
        .predictor
        .predict()
        .await
        .with_context(|| format!("predictor {} failed", state.predictor.predictor_name()))?;
    info!("Prediction result: {}", predicted_aqi);

    let current_aqi = state
        .store
        .latest()
        .await
        .context("failed to read latest reading")?
        .map(|reading| reading.aqi);
    if current_aqi.is_none() {
        warn!("Database is empty, no current AQI available");
    }

    Ok(PredictResponse {
        predicted_aqi,
        current_aqi,
    })
}
