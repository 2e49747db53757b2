//! Predictor Implementations

use crate::{InferenceError, PREDICTED_AQI_KEY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::ReadingStore;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Environment variable through which an external predictor learns the store path
pub const DB_PATH_ENV: &str = "AQI_DB_PATH";

/// Source of raw AQI predictions.
///
/// Implementations may return either a bare number or an object with a
/// `predicted_aqi` field. [`crate::PredictionAdapter`] resolves the shape.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Produce a raw prediction from the store's current contents
    async fn run(&self, store: &ReadingStore) -> Result<Value, InferenceError>;
}

fn default_window() -> usize {
    24
}

/// Predictor selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictorConfig {
    /// Mean of the most recent AQI values
    WindowAverage {
        #[serde(default = "default_window")]
        window: usize,
    },
    /// External program printing its prediction as JSON on stdout
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Constant output
    Fixed { value: Value },
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig::WindowAverage {
            window: default_window(),
        }
    }
}

impl PredictorConfig {
    /// Build the configured predictor
    pub fn build(&self) -> Result<Box<dyn Predictor>, InferenceError> {
        match self {
            PredictorConfig::WindowAverage { window } => {
                Ok(Box::new(WindowAveragePredictor::new(*window)?))
            }
            PredictorConfig::Command { program, args } => {
                Ok(Box::new(CommandPredictor::new(program, args.clone())?))
            }
            PredictorConfig::Fixed { value } => Ok(Box::new(FixedPredictor::new(value.clone()))),
        }
    }
}

/// Runs an external program (typically the model runner) once per prediction.
///
/// The program receives the store path in `AQI_DB_PATH` and must print its
/// result as JSON; the last non-empty line of stdout is taken as the result
/// so the program may log to stdout beforehand.
#[derive(Debug, Clone)]
pub struct CommandPredictor {
    program: String,
    args: Vec<String>,
}

impl CommandPredictor {
    pub fn new(program: &str, args: Vec<String>) -> Result<Self, InferenceError> {
        if program.trim().is_empty() {
            return Err(InferenceError::InvalidConfig(
                "command predictor needs a program".to_string(),
            ));
        }
        info!("Creating command predictor: {} {:?}", program, args);
        Ok(Self {
            program: program.to_string(),
            args,
        })
    }
}

#[async_trait]
impl Predictor for CommandPredictor {
    fn name(&self) -> &str {
        &self.program
    }

    async fn run(&self, store: &ReadingStore) -> Result<Value, InferenceError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .env(DB_PATH_ENV, store.db_path())
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(InferenceError::PredictorFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", self.program, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| {
                InferenceError::PredictorFailed(format!("{} printed nothing", self.program))
            })?;

        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Built-in predictor averaging the newest `window` AQI values
#[derive(Debug, Clone)]
pub struct WindowAveragePredictor {
    window: usize,
}

impl WindowAveragePredictor {
    pub fn new(window: usize) -> Result<Self, InferenceError> {
        if window == 0 {
            return Err(InferenceError::InvalidConfig(
                "window must be at least 1".to_string(),
            ));
        }
        Ok(Self { window })
    }
}

#[async_trait]
impl Predictor for WindowAveragePredictor {
    fn name(&self) -> &str {
        "window_average"
    }

    async fn run(&self, store: &ReadingStore) -> Result<Value, InferenceError> {
        let values = store.recent_aqi(self.window).await?;
        if values.is_empty() {
            warn!("No readings for window average");
            return Err(InferenceError::NoReadings);
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Ok(serde_json::json!({ PREDICTED_AQI_KEY: mean }))
    }
}

/// Returns the same value on every call
#[derive(Debug, Clone)]
pub struct FixedPredictor {
    value: Value,
}

impl FixedPredictor {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

#[async_trait]
impl Predictor for FixedPredictor {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn run(&self, _store: &ReadingStore) -> Result<Value, InferenceError> {
        Ok(self.value.clone())
    }
}
