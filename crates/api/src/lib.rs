//! AQI API Server
//!
//! HTTP endpoints for submitting sensor readings and requesting AQI
//! predictions.

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod routes;

pub use config::{AppConfig, ServerConfig};
pub use error::{ApiError, ApiResult};

use inference_engine::PredictionAdapter;
use storage::ReadingStore;

/// Application state shared across handlers
pub struct AppState {
    /// Configuration the service was started with
    pub config: Arc<AppConfig>,
    /// Reading store handle (connection options only)
    pub store: ReadingStore,
    /// Prediction adapter
    pub predictor: PredictionAdapter,
}

impl AppState {
    /// Assemble state from already-built components
    pub fn new(config: AppConfig, store: ReadingStore, predictor: PredictionAdapter) -> Self {
        Self {
            config: Arc::new(config),
            store,
            predictor,
        }
    }

    /// Open the store and build the configured predictor
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store = ReadingStore::open(&config.storage).await?;
        let predictor = PredictionAdapter::from_config(&config.predictor, store.clone())?;
        Ok(Self::new(config, store, predictor))
    }
}

/// `{"status": ...}` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/", get(home_handler))
        .route("/predict", get(routes::predictions::predict))
        .route("/update", post(routes::readings::update))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_allow_any_origin {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Liveness handler
async fn home_handler() -> Json<StatusResponse> {
    Json(StatusResponse::new("API is running"))
}

/// Initialize logging to stdout at the given level
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from_str(level)?)
        .with_target(true)
        .with_writer(std::io::stdout)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Serve the API on an already-bound listener
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    let app = create_router(state);
    axum::serve(listener, app).await
}

/// Run the server with the given configuration
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.server.bind_addr();
    let state = Arc::new(AppState::from_config(config).await?);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve(listener, state).await?;

    Ok(())
}
