//! Service Configuration

use config::{Config, ConfigError, Environment, File};
use inference_engine::PredictorConfig;
use serde::{Deserialize, Serialize};
use storage::StoreConfig;

/// Environment variable naming the config file (without extension)
pub const CONFIG_PATH_ENV: &str = "AQI_CONFIG";

/// Config file looked up when `AQI_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "aqi-service";

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Answer CORS requests from any origin
    pub cors_allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3007,
            cors_allow_any_origin: true,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level service configuration, built once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StoreConfig,
    pub predictor: PredictorConfig,
    /// Maximum level written to stdout (`trace` through `error`)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StoreConfig::default(),
            predictor: PredictorConfig::default(),
            log_level: "debug".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the file named by `AQI_CONFIG` (or `aqi-service.*`) and `AQI__*` variables
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Defaults, overridden by an optional file, overridden by the environment.
    ///
    /// Nested keys use a double underscore: `AQI__SERVER__PORT=4000`.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("AQI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
