//! Error types for model loading, inference and table handling

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading the model artifact at startup.
///
/// Any of these is fatal: the server cannot answer a single request
/// without a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported model format {0:?} (expected .onnx or .json)")]
    UnsupportedFormat(String),

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to parse model: {0}")]
    Parse(String),

    #[error("model features {found:?} do not match schema {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("invalid model: {0}")]
    Invalid(String),
}

/// Failures raised by a prediction call
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("row {row}: column {column} holds non-numeric value {value:?}")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: column {column} has no value")]
    MissingValue { row: usize, column: String },

    #[error("row {row}: column {column} holds {value}, which is infinite or too large for float32")]
    OutOfRange {
        row: usize,
        column: String,
        value: f64,
    },

    #[error("model expects {expected} features per row, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("unexpected model output: {0}")]
    UnexpectedOutput(String),

    #[error("inference backend error: {0}")]
    Backend(String),
}

/// CSV and table shape failures
#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {row} has {actual} cells, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{predictions} predictions supplied for {rows} rows")]
    LengthMismatch { rows: usize, predictions: usize },
}

/// Any failure of the batch pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
