//! Integration tests for the server HTTP endpoints

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use nids_lib::pipeline::InferenceEngine;
use nids_lib::{Label, ModelKind, ServingMetrics, StructuredLogger};
use nids_server::api::{create_router, AppState, ErrorBody, HealthResponse, PredictResponse};
use std::io::Write;
use std::sync::Arc;
use tower::ServiceExt;

/// One stump on FlowDuration: flows longer than 500 lean towards attack
const FOREST_JSON: &str = r#"{
    "feature_names": ["FlowDuration", "TotalFwdPackets", "TotalBackwardPackets",
                      "FwdPacketLengthMean", "BwdPacketLengthMean",
                      "FlowBytesPerSec", "FlowPacketsPerSec"],
    "classes": [0, 1],
    "trees": [
        {"nodes": [
            {"feature": 0, "threshold": 500.0, "left": 1, "right": 2},
            {"value": [3.0, 1.0]},
            {"value": [1.0, 3.0]}
        ]}
    ]
}"#;

fn setup_test_app() -> (Router, Arc<AppState>) {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(FOREST_JSON.as_bytes()).unwrap();
    let engine = InferenceEngine::load(file.path(), None).unwrap();

    let state = Arc::new(
        AppState::new(
            Arc::new(engine),
            ServingMetrics::new(),
            StructuredLogger::new("test-instance"),
        )
        .with_max_upload_bytes(64 * 1024),
    );
    (create_router(state.clone()), state)
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn test_index_page_lists_every_feature() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Network Intrusion Detection System"));
    assert!(html.contains(r#"name="FlowPacketsPerSec""#));
    assert!(html.contains(r#"name="file""#));
}

#[tokio::test]
async fn test_api_predict_single_flow() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post(
            "/api/predict",
            "application/json",
            r#"{"FlowDuration": 900, "TotalFwdPackets": 3, "Protocol": 6}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: PredictResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.label, Label::Attack);
    assert_eq!(body.code, 1);
    assert!((body.confidence - 0.75).abs() < 1e-6);
    assert_eq!(body.message, "Prediction: Attack (Confidence: 0.75)");
}

#[tokio::test]
async fn test_api_predict_missing_fields_are_zero_filled() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post("/api/predict", "application/json", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: PredictResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.label, Label::Normal);
}

#[tokio::test]
async fn test_form_predict_renders_result() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post(
            "/predict",
            "application/x-www-form-urlencoded",
            "FlowDuration=1200&TotalFwdPackets=4",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Prediction: Attack (Confidence: 0.75)"));
    assert!(html.contains(r#"value="1200""#));
}

#[tokio::test]
async fn test_form_predict_rejects_text() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post(
            "/predict",
            "application/x-www-form-urlencoded",
            "FlowDuration=long",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains(r#"class="error""#));
}

#[tokio::test]
async fn test_api_batch_returns_labelled_csv() {
    let (app, state) = setup_test_app();
    let before = state.engine.stats().total_rows;

    let upload = "Protocol,FlowDuration,TotalFwdPackets\n\
                  tcp,100,2\n\
                  udp,900,8\n\
                  tcp,20,1\n";
    let response = app
        .oneshot(post("/api/batch", "text/csv", upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"predictions.csv\""
    );

    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("FlowDuration,TotalFwdPackets,"));
    assert!(lines[0].ends_with(",Prediction"));
    assert!(!lines[0].contains("Protocol"));
    assert!(lines[1].ends_with(",Normal"));
    assert!(lines[2].ends_with(",Attack"));
    assert!(lines[3].ends_with(",Normal"));

    assert!(state.engine.stats().total_rows >= before + 3);
}

#[tokio::test]
async fn test_api_batch_empty_body_is_no_content() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post("/api/batch", "text/csv", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_api_batch_non_numeric_is_unprocessable() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post("/api/batch", "text/csv", "FlowDuration\nforever\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(body.error.contains("FlowDuration"));
}

#[tokio::test]
async fn test_api_batch_ragged_csv_is_bad_request() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post(
            "/api/batch",
            "text/csv",
            "FlowDuration,TotalFwdPackets\n1,2\n3\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn multipart_upload(csv: &str) -> Request<Body> {
    let boundary = "nids-test-boundary";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"flows.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{b}--\r\n",
        b = boundary,
        csv = csv
    );
    post(
        "/batch",
        &format!("multipart/form-data; boundary={}", boundary),
        body,
    )
}

#[tokio::test]
async fn test_multipart_upload_renders_result_table() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(multipart_upload("FlowDuration,Protocol\n700,tcp\n40,udp\n1300,tcp\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("3 flows classified: 2 attack, 1 normal"));
    assert!(html.contains("<th>FlowDuration</th>"));
    assert!(html.contains("<th>Prediction</th>"));
    assert!(!html.contains("<th>Protocol</th>"));
    assert_eq!(html.matches(r#"<td class="attack">Attack</td>"#).count(), 2);
    assert_eq!(html.matches(r#"<td class="normal">Normal</td>"#).count(), 1);
    assert!(html.contains(r#"action="/batch/download""#));
}

#[tokio::test]
async fn test_multipart_upload_failure_renders_error_notice() {
    let (app, _) = setup_test_app();

    let response = app
        .clone()
        .oneshot(multipart_upload("FlowDuration\nforever\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains(r#"<div class="error">Error during batch prediction:"#));
    assert!(html.contains("FlowDuration"));

    let response = app
        .oneshot(multipart_upload("FlowDuration,TotalFwdPackets\n1,2\n3\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains(r#"class="error""#));
    assert!(!html.starts_with('{'));
}

#[tokio::test]
async fn test_batch_download_returns_labelled_csv() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post(
            "/batch/download",
            "application/x-www-form-urlencoded",
            "csv=FlowDuration%0D%0A700%0D%0A40%0D%0A",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"predictions.csv\""
    );

    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with(",Prediction"));
    assert!(lines[1].ends_with(",Attack"));
    assert!(lines[2].ends_with(",Normal"));
}

#[tokio::test]
async fn test_multipart_without_file_redirects_home() {
    let (app, _) = setup_test_app();

    let boundary = "nids-test-boundary";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         \r\n\
         --{b}--\r\n",
        b = boundary
    );
    let response = app
        .oneshot(post(
            "/batch",
            &format!("multipart/form-data; boundary={}", boundary),
            body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn test_healthz_reports_model() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.features.len(), 7);
    assert_eq!(health.features[0], "FlowDuration");
    let model = health.model.unwrap();
    assert_eq!(model.kind, ModelKind::Forest);
    assert_eq!(model.checksum.len(), 64);
    assert!(health.uptime_secs >= 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup_test_app();

    // Drive one prediction so the labelled counters have a series
    let _ = app
        .clone()
        .oneshot(post("/api/predict", "application/json", "{}"))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("nids_predictions_total"));
    assert!(text.contains("nids_prediction_latency_seconds"));
}

#[tokio::test]
async fn test_body_limit_rejects_oversized_upload() {
    let (app, _) = setup_test_app();

    let mut upload = String::from("FlowDuration\n");
    while upload.len() <= 64 * 1024 {
        upload.push_str("123456789\n");
    }
    let response = app
        .oneshot(post("/api/batch", "text/csv", upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
