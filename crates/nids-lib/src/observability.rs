//! Observability infrastructure for the prediction server
//!
//! Provides:
//! - Prometheus metrics (prediction latency, label counts, batch sizes, model info)
//! - Structured JSON logging with tracing

use crate::models::{Label, ModelInfo, Prediction};
use prometheus::{
    register_gauge_vec, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, GaugeVec, Histogram, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
];

const BATCH_ROW_BUCKETS: &[f64] = &[1.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServingMetricsInner> = OnceLock::new();

struct ServingMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    batch_rows: Histogram,
    inference_errors: IntCounter,
    empty_uploads: IntCounter,
    model_info: GaugeVec,
}

impl ServingMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "nids_prediction_latency_seconds",
                "Time spent aligning, classifying and formatting a request",
                &["mode"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "nids_predictions_total",
                "Flows classified, by predicted label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            batch_rows: register_histogram!(
                "nids_batch_rows",
                "Rows per batch upload",
                BATCH_ROW_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_rows"),

            inference_errors: register_int_counter!(
                "nids_inference_errors_total",
                "Prediction requests that failed"
            )
            .expect("Failed to register inference_errors"),

            empty_uploads: register_int_counter!(
                "nids_empty_uploads_total",
                "Batch requests without any CSV content"
            )
            .expect("Failed to register empty_uploads"),

            model_info: register_gauge_vec!(
                "nids_model_info",
                "Information about the loaded classifier",
                &["kind", "checksum"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Serving metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ServingMetrics {
    _private: (),
}

impl Default for ServingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServingMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServingMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServingMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_single_latency(&self, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&["single"])
            .observe(duration_secs);
    }

    pub fn observe_batch_latency(&self, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&["batch"])
            .observe(duration_secs);
    }

    pub fn record_labels(&self, labels: &[Label]) {
        for label in labels {
            self.inner()
                .predictions_total
                .with_label_values(&[label.as_str()])
                .inc();
        }
    }

    pub fn observe_batch_rows(&self, rows: usize) {
        self.inner().batch_rows.observe(rows as f64);
    }

    pub fn inc_inference_errors(&self) {
        self.inner().inference_errors.inc();
    }

    pub fn inc_empty_uploads(&self) {
        self.inner().empty_uploads.inc();
    }

    pub fn set_model_info(&self, info: &ModelInfo) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[info.kind.as_str(), info.checksum.as_str()])
            .set(1.0);
    }
}

/// Structured logger for serving events
///
/// One JSON event per significant occurrence, tagged with the instance name.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, bind: &str) {
        info!(
            event = "server_started",
            instance = %self.instance,
            version = %version,
            bind = %bind,
            "NIDS server started"
        );
    }

    pub fn log_model_loaded(&self, info: &ModelInfo, elapsed_ms: u128) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            kind = info.kind.as_str(),
            path = %info.path,
            checksum = %info.checksum,
            size_bytes = info.size_bytes,
            elapsed_ms = elapsed_ms,
            "Classifier loaded"
        );
    }

    pub fn log_single_prediction(&self, prediction: &Prediction, elapsed_us: u128) {
        info!(
            event = "single_prediction",
            instance = %self.instance,
            label = prediction.label.as_str(),
            code = prediction.code,
            confidence = prediction.confidence,
            elapsed_us = elapsed_us,
            "Classified single flow"
        );
    }

    pub fn log_batch(&self, rows: usize, attacks: usize, elapsed_ms: u128) {
        if attacks > 0 {
            warn!(
                event = "batch_prediction",
                instance = %self.instance,
                rows = rows,
                attacks = attacks,
                elapsed_ms = elapsed_ms,
                "Batch contains flows classified as attacks"
            );
        } else {
            info!(
                event = "batch_prediction",
                instance = %self.instance,
                rows = rows,
                attacks = attacks,
                elapsed_ms = elapsed_ms,
                "Classified batch"
            );
        }
    }

    pub fn log_empty_upload(&self) {
        info!(
            event = "empty_upload",
            instance = %self.instance,
            "No CSV content supplied, skipping batch"
        );
    }

    pub fn log_inference_failure(&self, mode: &str, error: &dyn std::error::Error) {
        error!(
            event = "inference_failed",
            instance = %self.instance,
            mode = %mode,
            error = %error,
            "Prediction request failed"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            instance = %self.instance,
            reason = %reason,
            "NIDS server shutting down"
        );
    }
}
