//! Predictor Output Shapes

use crate::InferenceError;
use serde_json::Value;

/// Key holding the value when a predictor returns a labeled object
pub const PREDICTED_AQI_KEY: &str = "predicted_aqi";

/// The two shapes a predictor may return
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictorOutput {
    /// A bare number, e.g. `54.56`
    Bare(f64),
    /// An object carrying the number, e.g. `{"predicted_aqi": 54.56}`
    Labeled { predicted_aqi: f64 },
}

impl PredictorOutput {
    /// The predicted AQI regardless of shape
    pub fn aqi(self) -> f64 {
        match self {
            PredictorOutput::Bare(value) => value,
            PredictorOutput::Labeled { predicted_aqi } => predicted_aqi,
        }
    }
}

impl TryFrom<Value> for PredictorOutput {
    type Error = InferenceError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => n.as_f64().map(PredictorOutput::Bare).ok_or_else(|| {
                InferenceError::UnrecognizedOutput(format!("number {n} is not representable"))
            }),
            Value::Object(map) => match map.get(PREDICTED_AQI_KEY).and_then(Value::as_f64) {
                Some(predicted_aqi) => Ok(PredictorOutput::Labeled { predicted_aqi }),
                None => Err(InferenceError::UnrecognizedOutput(format!(
                    "object without a numeric `{PREDICTED_AQI_KEY}`: {}",
                    Value::Object(map)
                ))),
            },
            other => Err(InferenceError::UnrecognizedOutput(format!(
                "expected a number or an object, got {other}"
            ))),
        }
    }
}
