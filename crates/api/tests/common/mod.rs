#![allow(dead_code)]

use std::sync::Arc;

use api::{create_router, AppConfig, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use inference_engine::{FixedPredictor, InferenceError, PredictionAdapter, Predictor};
use serde_json::Value;
use storage::{ReadingStore, StoreConfig};
use tempfile::TempDir;
use tower::ServiceExt;

pub const FULL_PAYLOAD: &str =
    r#"{"NO":1,"NO2":2,"NOX":3,"NH3":4,"CO":5,"BENZENE":6,"TOLUENE":7,"XYLENE":8,"AQI":42}"#;

/// Predictor that always fails, standing in for a broken model runner
pub struct FailingPredictor;

#[async_trait]
impl Predictor for FailingPredictor {
    fn name(&self) -> &str {
        "failing"
    }

    async fn run(&self, _store: &ReadingStore) -> Result<Value, InferenceError> {
        Err(InferenceError::PredictorFailed(
            "model_runner could not be imported".to_string(),
        ))
    }
}

/// Test service backed by a store in a temporary directory
pub struct TestApp {
    pub dir: TempDir,
    pub store: ReadingStore,
    pub router: Router,
}

impl TestApp {
    pub async fn new(predictor: Box<dyn Predictor>) -> Self {
        Self::with_capacity(predictor, 5040).await
    }

    pub async fn with_fixed(value: Value) -> Self {
        Self::new(Box::new(FixedPredictor::new(value))).await
    }

    pub async fn with_capacity(predictor: Box<dyn Predictor>, capacity: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = StoreConfig {
            db_path: dir.path().join("aqi_data.db"),
            capacity,
        };
        let store = ReadingStore::open(&storage).await.unwrap();
        let config = AppConfig {
            storage,
            ..AppConfig::default()
        };
        let adapter = PredictionAdapter::new(predictor, store.clone());
        let state = Arc::new(AppState::new(config, store.clone(), adapter));
        Self {
            dir,
            store,
            router: create_router(state),
        }
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post(&self, uri: &str, body: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
