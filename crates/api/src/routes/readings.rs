//! Reading Routes

use anyhow::{anyhow, Context};
use axum::http::{header::CONTENT_TYPE, HeaderMap};
use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use storage::NewReading;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::{AppState, StatusResponse};

/// Keys an update body must contain, matched case-sensitively
pub const REQUIRED_KEYS: [&str; 9] = [
    "NO", "NO2", "NOX", "NH3", "CO", "BENZENE", "TOLUENE", "XYLENE", "AQI",
];

/// Update body with the wire key names
#[derive(Debug, Deserialize)]
struct UpdatePayload {
    #[serde(rename = "NO")]
    no: f64,
    #[serde(rename = "NO2")]
    no2: f64,
    #[serde(rename = "NOX")]
    nox: f64,
    #[serde(rename = "NH3")]
    nh3: f64,
    #[serde(rename = "CO")]
    co: f64,
    #[serde(rename = "BENZENE")]
    benzene: f64,
    #[serde(rename = "TOLUENE")]
    toluene: f64,
    #[serde(rename = "XYLENE")]
    xylene: f64,
    #[serde(rename = "AQI")]
    aqi: f64,
}

impl From<UpdatePayload> for NewReading {
    fn from(p: UpdatePayload) -> Self {
        NewReading {
            no: p.no,
            no2: p.no2,
            nox: p.nox,
            nh3: p.nh3,
            co: p.co,
            benzene: p.benzene,
            toluene: p.toluene,
            xylene: p.xylene,
            aqi: p.aqi,
        }
    }
}

/// Store a new reading
pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<StatusResponse>> {
    info!("Update endpoint called");
    if !is_json_content(&headers) {
        return Err(ApiError::Update(anyhow!(
            "request content type must be application/json"
        )));
    }
    let reading = parse_reading(&body)?;

    state
        .store
        .insert(reading)
        .await
        .context("failed to store reading")
        .map_err(ApiError::Update)?;

    debug!("Stored reading with AQI {}", reading.aqi);
    Ok(Json(StatusResponse::new("success")))
}

/// `application/json` or an `application/*+json` subtype, parameters ignored
fn is_json_content(headers: &HeaderMap) -> bool {
    let Some(mime) = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
    else {
        return false;
    };
    let mime = mime.trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Whether a parsed body contains `key`.
///
/// Objects are checked by key, arrays by string element and strings by
/// substring; nothing else can contain a key.
fn body_contains(body: &Value, key: &str) -> bool {
    match body {
        Value::Object(fields) => fields.contains_key(key),
        Value::Array(items) => items.iter().any(|item| item.as_str() == Some(key)),
        Value::String(text) => text.contains(key),
        _ => false,
    }
}

/// Parse an update body.
///
/// Malformed JSON, scalars and non-numeric values are `Update` errors. Any
/// well formed body that does not contain every required key, including
/// arrays, is `MissingGasValues`.
fn parse_reading(body: &[u8]) -> ApiResult<NewReading> {
    let body: Value = serde_json::from_slice(body)
        .context("request body is not valid JSON")
        .map_err(ApiError::Update)?;

    if matches!(body, Value::Null | Value::Bool(_) | Value::Number(_)) {
        return Err(ApiError::Update(anyhow!(
            "request body must be a JSON object, got {body}"
        )));
    }

    if let Some(missing) = REQUIRED_KEYS.iter().find(|key| !body_contains(&body, key)) {
        warn!("Update rejected: missing {}", missing);
        return Err(ApiError::MissingGasValues);
    }

    let fields = match body {
        Value::Object(fields) => fields,
        other => {
            return Err(ApiError::Update(anyhow!(
                "gas values must be keyed by name, got {other}"
            )))
        }
    };
    let payload: UpdatePayload = serde_json::from_value(Value::Object(fields))
        .context("gas values must be numbers")
        .map_err(ApiError::Update)?;
    Ok(payload.into())
}
