//! AQI Prediction Adapter
//!
//! Runs a predictor against the reading store and reduces whatever it
//! returns to a single AQI value.

mod adapter;
mod output;
mod predictors;

pub use adapter::PredictionAdapter;
pub use output::{PredictorOutput, PREDICTED_AQI_KEY};
pub use predictors::{
    CommandPredictor, FixedPredictor, Predictor, PredictorConfig, WindowAveragePredictor,
    DB_PATH_ENV,
};

use thiserror::Error;

/// Errors during prediction
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Predictor failed: {0}")]
    PredictorFailed(String),
    #[error("Failed to launch predictor: {0}")]
    Launch(#[from] std::io::Error),
    #[error("Predictor output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Unrecognized predictor output: {0}")]
    UnrecognizedOutput(String),
    #[error("No readings available to predict from")]
    NoReadings,
    #[error("Invalid predictor configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Storage(#[from] storage::StorageError),
}
