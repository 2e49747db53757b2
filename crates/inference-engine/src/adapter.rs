//! Prediction Adapter

use crate::{InferenceError, Predictor, PredictorConfig, PredictorOutput};
use storage::ReadingStore;
use tracing::{debug, info};

/// Drives a predictor against the reading store and normalizes its result
pub struct PredictionAdapter {
    predictor: Box<dyn Predictor>,
    store: ReadingStore,
}

impl PredictionAdapter {
    /// Wrap an existing predictor
    pub fn new(predictor: Box<dyn Predictor>, store: ReadingStore) -> Self {
        info!("Creating prediction adapter with predictor: {}", predictor.name());
        Self { predictor, store }
    }

    /// Build the configured predictor and wrap it
    pub fn from_config(config: &PredictorConfig, store: ReadingStore) -> Result<Self, InferenceError> {
        Ok(Self::new(config.build()?, store))
    }

    /// Run the predictor once and return the predicted AQI.
    ///
    /// Failures are returned as-is; nothing is retried.
    pub async fn predict(&self) -> Result<f64, InferenceError> {
        let start = std::time::Instant::now();
        debug!("Calling predictor {}", self.predictor.name());

        let raw = self.predictor.run(&self.store).await?;
        debug!("Raw prediction: {}", raw);

        let aqi = PredictorOutput::try_from(raw)?.aqi();
        debug!(
            "Prediction {} completed in {}ms",
            aqi,
            start.elapsed().as_millis()
        );
        Ok(aqi)
    }

    /// Name of the wrapped predictor
    pub fn predictor_name(&self) -> &str {
        self.predictor.name()
    }
}
