//! HTTP surface: HTML page, prediction API, health and Prometheus metrics

use crate::ui::{self, BatchPanel, Notice};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Form, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use nids_lib::pipeline::{predict_csv, BatchOutcome, InferenceEngine, ResultFormatter};
use nids_lib::{
    FeatureSchema, FlowRecord, InferenceError, Label, ModelInfo, PipelineError, Prediction,
    ResultTable, ServingMetrics, StructuredLogger, TableError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::info;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: ServingMetrics,
    pub logger: StructuredLogger,
    pub started_at: DateTime<Utc>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(engine: Arc<InferenceEngine>, metrics: ServingMetrics, logger: StructuredLogger) -> Self {
        Self {
            engine,
            metrics,
            logger,
            started_at: Utc::now(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// JSON answer for a single-flow prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub label: Label,
    pub code: i64,
    pub confidence: f32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: Option<ModelInfo>,
    pub features: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub rows_predicted: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Request failure mapped onto an HTTP status
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Inference(InferenceError),
    Table(TableError),
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Table(e) => ApiError::Table(e),
            PipelineError::Inference(e) => ApiError::Inference(e),
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        ApiError::Internal(format!("inference task failed: {}", err))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Inference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Table(TableError::LengthMismatch { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Table(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg.clone(),
            ApiError::Inference(e) => e.to_string(),
            ApiError::Table(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Index page with the single-flow form and CSV upload
async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let schema = state.engine.schema();
    Html(ui::render_index(schema, &ui::default_values(schema), None, None))
}

/// Form submission from the index page; renders the page again with the result
async fn predict_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Response {
    let schema = state.engine.schema();
    let mut values = ui::default_values(schema);
    let mut record = FlowRecord::new();

    for name in schema.names() {
        let raw = fields.get(*name).map(|v| v.trim()).unwrap_or("");
        if raw.is_empty() {
            record.insert(*name, schema.input_default(name));
            continue;
        }
        values.insert(name.to_string(), raw.to_string());
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => record.insert(*name, v),
            _ => {
                let msg = format!("Invalid value for {}: {}", name, raw);
                let page = ui::render_index(schema, &values, Some(Notice::Error(&msg)), None);
                return (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response();
            }
        }
    }

    match classify_flow(&state, record).await {
        Ok(prediction) => {
            let msg = ResultFormatter::new().describe(&prediction);
            let page = ui::render_index(schema, &values, Some(Notice::Prediction(&msg)), None);
            Html(page).into_response()
        }
        Err(err) => {
            let msg = format!("Error during prediction: {}", err.message());
            let page = ui::render_index(schema, &values, Some(Notice::Error(&msg)), None);
            (err.status(), Html(page)).into_response()
        }
    }
}

/// Multipart CSV upload from the index page; renders the labelled table
async fn batch_upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let schema = state.engine.schema();
    let mut upload = Bytes::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return batch_error_page(schema, ApiError::BadRequest(e.to_string())),
        };
        if field.name() == Some("file") {
            upload = match field.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => return batch_error_page(schema, ApiError::BadRequest(e.to_string())),
            };
            break;
        }
    }

    let text = String::from_utf8_lossy(&upload).into_owned();
    match run_batch(&state, upload).await {
        Ok(Some((table, _))) => {
            let panel = BatchPanel::Result {
                table: &table,
                upload: &text,
            };
            let page = ui::render_index(schema, &ui::default_values(schema), None, Some(panel));
            Html(page).into_response()
        }
        Ok(None) => Redirect::to("/").into_response(),
        Err(err) => batch_error_page(schema, err),
    }
}

#[derive(Debug, Deserialize)]
struct DownloadForm {
    csv: String,
}

/// Download button under the rendered results; answers with `predictions.csv`
async fn batch_download(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DownloadForm>,
) -> Response {
    match run_batch(&state, Bytes::from(form.csv)).await {
        Ok(Some((_, csv))) => csv_download(csv),
        Ok(None) => Redirect::to("/").into_response(),
        Err(err) => batch_error_page(state.engine.schema(), err),
    }
}

fn batch_error_page(schema: FeatureSchema, err: ApiError) -> Response {
    let msg = err.message();
    let page = ui::render_index(
        schema,
        &ui::default_values(schema),
        None,
        Some(BatchPanel::Error(&msg)),
    );
    (err.status(), Html(page)).into_response()
}

async fn api_predict(
    State(state): State<Arc<AppState>>,
    Json(record): Json<FlowRecord>,
) -> Result<Json<PredictResponse>, ApiError> {
    let prediction = classify_flow(&state, record).await?;
    Ok(Json(PredictResponse {
        label: prediction.label,
        code: prediction.code,
        confidence: prediction.confidence,
        message: ResultFormatter::new().describe(&prediction),
    }))
}

/// Raw CSV body in, labelled CSV out; 204 when the body is empty
async fn api_batch(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    match run_batch(&state, body).await? {
        Some((_, csv)) => Ok(csv_download(csv)),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.engine.info().cloned(),
        features: state
            .engine
            .schema()
            .names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        started_at: state.started_at,
        uptime_secs: (now - state.started_at).num_seconds(),
        rows_predicted: state.engine.stats().total_rows,
    })
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return ApiError::Internal(format!("failed to encode metrics: {}", e)).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn classify_flow(state: &Arc<AppState>, record: FlowRecord) -> Result<Prediction, ApiError> {
    let start = Instant::now();
    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.predict_flow(&record)).await?;

    match result {
        Ok(prediction) => {
            let elapsed = start.elapsed();
            state.metrics.observe_single_latency(elapsed.as_secs_f64());
            state.metrics.record_labels(&[prediction.label]);
            state
                .logger
                .log_single_prediction(&prediction, elapsed.as_micros());
            Ok(prediction)
        }
        Err(e) => {
            state.metrics.inc_inference_errors();
            state.logger.log_inference_failure("single", &e);
            Err(ApiError::Inference(e))
        }
    }
}

/// Run the CSV pipeline off the async runtime. `None` means nothing was uploaded.
async fn run_batch(
    state: &Arc<AppState>,
    upload: Bytes,
) -> Result<Option<(ResultTable, Vec<u8>)>, ApiError> {
    let start = Instant::now();
    let engine = state.engine.clone();
    let outcome = tokio::task::spawn_blocking(move || predict_csv(&engine, &upload)).await?;

    match outcome {
        Ok(BatchOutcome::Skipped) => {
            state.metrics.inc_empty_uploads();
            state.logger.log_empty_upload();
            Ok(None)
        }
        Ok(BatchOutcome::Completed { table, csv }) => {
            let elapsed = start.elapsed();
            state.metrics.observe_batch_latency(elapsed.as_secs_f64());
            state.metrics.observe_batch_rows(table.len());
            state.metrics.record_labels(table.labels());
            state
                .logger
                .log_batch(table.len(), table.count(Label::Attack), elapsed.as_millis());
            Ok(Some((table, csv)))
        }
        Err(e) => {
            state.metrics.inc_inference_errors();
            state.logger.log_inference_failure("batch", &e);
            Err(e.into())
        }
    }
}

fn csv_download(csv: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"predictions.csv\"",
            ),
        ],
        csv,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/batch", post(batch_upload))
        .route("/batch/download", post(batch_download))
        .route("/api/predict", post(api_predict))
        .route("/api/batch", post(api_batch))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
