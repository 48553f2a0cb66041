//! HTTP API integration tests
//!
//! Endpoints exercised through the router

mod common;

use audit_scorer::config::ScorerConfig;
use audit_scorer::server::handlers::{ErrorResponse, HealthResponse, ServiceInfo};
use audit_scorer::{create_router, AppState, EnsembleScorer, ScoringMode, SingleScore};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{fixture_scorer, outlier_vector, record, sample_vector, seven_field_record};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(scorer: EnsembleScorer, mode: ScoringMode) -> Router {
    let mut config = ScorerConfig::default();
    config.scoring.mode = mode;
    config.scoring.max_batch_rows = 4;
    create_router(AppState::new(scorer, &config), &config)
}

fn app(mode: ScoringMode) -> Router {
    app_with(fixture_scorer(), mode)
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send<T: DeserializeOwned>(app: Router, request: Request<Body>) -> (StatusCode, T) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_service_info() {
    let (status, info): (_, ServiceInfo) = send(app(ScoringMode::Batch), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info.title, "Arquitectura Analítica - Auditoría ML");
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let (status, health): (_, HealthResponse) =
        send(app(ScoringMode::Single), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(health.model_loaded);
    assert_eq!(health.status, "ok");
    assert_eq!(health.mode, ScoringMode::Single);

    let unavailable = app_with(EnsembleScorer::unavailable("missing"), ScoringMode::Batch);
    let (status, health): (_, HealthResponse) = send(unavailable, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!health.model_loaded);
    assert_eq!(health.status, "degraded");
}

#[tokio::test]
async fn test_batch_endpoint_returns_one_score_per_row() {
    let body = json!([
        record(&sample_vector()),
        record(&outlier_vector()),
        record(&sample_vector())
    ]);
    let (status, scores): (_, Vec<f64>) =
        send(app(ScoringMode::Batch), post("/predict/batch", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scores.len(), 3);
    assert!(scores[1] > scores[0]);
}

#[tokio::test]
async fn test_batch_accepts_wrapped_records_and_arrays() {
    let body = json!({
        "records": [
            [1180.0, 350.0, 0.3, 14.0, 2.0, 40.0, 16.0, 1.0],
            record(&outlier_vector())
        ]
    });
    let (status, scores): (_, Vec<f64>) =
        send(app(ScoringMode::Batch), post("/predict/batch", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scores.len(), 2);
}

#[tokio::test]
async fn test_one_endpoint_returns_labelled_score() {
    let (status, value): (_, Value) = send(
        app(ScoringMode::Batch),
        post("/predict/one", &record(&outlier_vector())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(value["anomaly_score"].is_number());
    let status_label = value["status"].as_str().unwrap();
    assert!(status_label == "Anómala" || status_label == "Normal");

    let parsed: SingleScore = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.status, audit_scorer::AnomalyStatus::from_score(parsed.anomaly_score));
}

#[tokio::test]
async fn test_predict_follows_configured_mode() {
    let (status, scores): (_, Vec<f64>) = send(
        app(ScoringMode::Batch),
        post("/predict", &json!([record(&sample_vector())])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scores, vec![0.0]);

    let (status, single): (_, SingleScore) = send(
        app(ScoringMode::Single),
        post("/predict", &record(&sample_vector())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(single.anomaly_score.is_finite());
}

#[tokio::test]
async fn test_seven_fields_is_unprocessable() {
    let body = json!([record(&sample_vector()), seven_field_record()]);
    let (status, error): (_, ErrorResponse) =
        send(app(ScoringMode::Batch), post("/predict/batch", &body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error.error, "validation_error");
    assert_eq!(error.row, Some(1));
    assert_eq!(error.field.as_deref(), Some("rule_score"));

    let (status, error): (_, ErrorResponse) = send(
        app(ScoringMode::Batch),
        post("/predict/one", &seven_field_record()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error.error, "validation_error");
    assert_eq!(error.field.as_deref(), Some("rule_score"));
    assert_eq!(error.row, None);

    let (status, error): (_, ErrorResponse) = send(
        app(ScoringMode::Single),
        post("/predict", &seven_field_record()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error.field.as_deref(), Some("rule_score"));
}

#[tokio::test]
async fn test_malformed_json_is_unprocessable() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict/batch")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("[{\"hour\": 3"))
        .unwrap();
    let (status, error): (_, ErrorResponse) = send(app(ScoringMode::Batch), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error.error, "validation_error");
}

#[tokio::test]
async fn test_empty_and_oversized_batches_rejected() {
    let (status, _): (_, ErrorResponse) =
        send(app(ScoringMode::Batch), post("/predict/batch", &json!([]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let rows: Vec<Value> = (0..5).map(|_| record(&sample_vector())).collect();
    let (status, error): (_, ErrorResponse) =
        send(app(ScoringMode::Batch), post("/predict/batch", &json!(rows))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error.message.contains("limit is 4"));
}

#[tokio::test]
async fn test_unavailable_model_is_service_unavailable() {
    let app = app_with(
        EnsembleScorer::unavailable("bundle file missing"),
        ScoringMode::Batch,
    );
    let (status, error): (_, ErrorResponse) = send(
        app.clone(),
        post("/predict/batch", &json!([record(&sample_vector())])),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error.error, "model_unavailable");
    assert!(error.message.contains("bundle file missing"));

    let (status, _): (_, ErrorResponse) =
        send(app, post("/predict/one", &record(&sample_vector()))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_sub_model_failure_is_bad_request() {
    // decision function returns fewer values than rows
    let scorer = common::stub_scorer(
        [vec![0.0, 0.0], vec![0.0, 0.0], vec![0.0, 0.0], vec![0.0, 0.0]],
        0.0,
    );
    let rows: Vec<Value> = (0..3).map(|_| record(&sample_vector())).collect();
    let response = app_with(scorer, ScoringMode::Batch)
        .oneshot(post("/predict/batch", &json!(rows)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error.error, "computation_error");
}

#[tokio::test]
async fn test_panicking_detector_is_bad_request_and_server_survives() {
    let app = app_with(common::panicking_scorer(), ScoringMode::Batch);
    let rows = json!([record(&sample_vector()), record(&outlier_vector())]);

    for _ in 0..2 {
        let (status, error): (_, ErrorResponse) =
            send(app.clone(), post("/predict/batch", &rows)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "computation_error");
        assert!(error.message.contains("scoring task failed"));
    }

    let (status, error): (_, ErrorResponse) =
        send(app.clone(), post("/predict/one", &record(&sample_vector()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error.error, "computation_error");

    let (status, health): (_, HealthResponse) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(health.model_loaded);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = app(ScoringMode::Batch)
        .oneshot(get("/predict/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
