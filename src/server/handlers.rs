//! Request handlers
//!
//! POST /predict, /predict/batch and /predict/one share the same scorer;
//! only the response shape differs.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::AppState;
use crate::error::{ScoringError, ValidationIssue};
use crate::features::{FeatureMatrix, FeatureVector};
use crate::scoring::{ScoringMode, SingleScore};

pub const SERVICE_TITLE: &str = "Arquitectura Analítica - Auditoría ML";

/// Batch body: a bare record list or `{"records": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchRequest {
    Records(Vec<Value>),
    Wrapped { records: Vec<Value> },
}

impl BatchRequest {
    pub fn into_records(self) -> Vec<Value> {
        match self {
            BatchRequest::Records(records) | BatchRequest::Wrapped { records } => records,
        }
    }
}

/// Service metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub title: String,
    pub version: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub mode: ScoringMode,
    pub version: String,
}

/// Error body returned for every failed scoring request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Maps each error category to its HTTP status
impl IntoResponse for ScoringError {
    fn into_response(self) -> Response {
        let status = match &self {
            ScoringError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ScoringError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ScoringError::Computation(_) => StatusCode::BAD_REQUEST,
        };

        let (row, field) = match &self {
            ScoringError::Validation(issue) => (issue.row, issue.field.clone()),
            _ => (None, None),
        };

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            row,
            field,
        };

        (status, Json(body)).into_response()
    }
}

/// GET /
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        title: SERVICE_TITLE.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.scorer.is_ready();
    Json(HealthResponse {
        status: if model_loaded { "ok" } else { "degraded" }.to_string(),
        model_loaded,
        mode: state.mode,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /predict
///
/// Follows the configured scoring mode.
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return rejected(rejection).into_response(),
    };

    match state.mode {
        ScoringMode::Batch => match serde_json::from_value::<BatchRequest>(body) {
            Ok(request) => score_batch(state, request).await.into_response(),
            Err(e) => invalid_body(e).into_response(),
        },
        ScoringMode::Single => match parse_vector(&body) {
            Ok(vector) => score_one(state, vector).await.into_response(),
            Err(e) => e.into_response(),
        },
    }
}

/// POST /predict/batch
pub async fn predict_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Vec<f64>>, ScoringError> {
    let Json(request) = body.map_err(rejected)?;
    score_batch(state, request).await
}

/// POST /predict/one
pub async fn predict_one(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SingleScore>, ScoringError> {
    let Json(body) = body.map_err(rejected)?;
    let vector = parse_vector(&body)?;
    score_one(state, vector).await
}

async fn score_batch(
    state: AppState,
    request: BatchRequest,
) -> Result<Json<Vec<f64>>, ScoringError> {
    ensure_ready(&state)?;
    let records = request.into_records();
    if records.len() > state.max_batch_rows {
        return Err(log_failure(ScoringError::Validation(ValidationIssue::new(format!(
            "batch has {} rows, limit is {}",
            records.len(),
            state.max_batch_rows
        )))));
    }

    let features = FeatureMatrix::from_records(&records).map_err(log_failure)?;
    let rows = features.nrows();
    let scorer = state.scorer.clone();
    let scores = run_blocking(move || scorer.score_batch(&features)).await?;

    info!(rows, "Batch scored");
    Ok(Json(scores))
}

async fn score_one(
    state: AppState,
    vector: FeatureVector,
) -> Result<Json<SingleScore>, ScoringError> {
    ensure_ready(&state)?;
    let scorer = state.scorer.clone();
    let result = run_blocking(move || scorer.score_one(&vector)).await?;

    info!(
        score = result.anomaly_score,
        status = %result.status,
        "Row scored"
    );
    Ok(Json(result))
}

fn ensure_ready(state: &AppState) -> Result<(), ScoringError> {
    state.scorer.bundle().map(|_| ()).map_err(log_failure)
}

/// Run CPU-bound scoring off the async workers; a panic becomes a
/// `ComputationError` instead of taking the server down
async fn run_blocking<T, F>(job: F) -> Result<T, ScoringError>
where
    F: FnOnce() -> Result<T, ScoringError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(log_failure),
        Err(join_error) => Err(log_failure(ScoringError::Computation(format!(
            "scoring task failed: {}",
            join_error
        )))),
    }
}

fn log_failure(err: ScoringError) -> ScoringError {
    match &err {
        ScoringError::Validation(issue) => warn!("Rejected scoring request: {}", issue),
        ScoringError::ModelUnavailable(reason) => {
            error!("Scoring refused, model unavailable: {}", reason)
        }
        ScoringError::Computation(message) => error!("Scoring computation failed: {}", message),
    }
    err
}

fn parse_vector(body: &Value) -> Result<FeatureVector, ScoringError> {
    FeatureVector::from_value(body).map_err(|issue| log_failure(ScoringError::Validation(issue)))
}

fn rejected(rejection: JsonRejection) -> ScoringError {
    log_failure(ScoringError::Validation(ValidationIssue::new(
        rejection.body_text(),
    )))
}

fn invalid_body(err: serde_json::Error) -> ScoringError {
    log_failure(ScoringError::Validation(ValidationIssue::new(format!(
        "invalid request body: {}",
        err
    ))))
}
