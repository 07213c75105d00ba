//! Core library for the network intrusion detection demo
//!
//! This crate provides:
//! - The fixed flow feature schema and table types
//! - Feature alignment of arbitrary input tables
//! - Model loading (ONNX and tree-ensemble JSON) and inference
//! - Result labelling and CSV serialization
//! - Synthetic demo dataset generation
//! - Metrics and structured logging

pub mod dataset;
pub mod error;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod schema;
pub mod table;

pub use error::{InferenceError, ModelError, PipelineError, TableError};
pub use models::*;
pub use observability::{ServingMetrics, StructuredLogger};
pub use schema::{FeatureSchema, FEATURE_NAMES, PREDICTION_COLUMN};
pub use table::{AlignedRow, AlignedTable, Cell, RawTable, ResultTable};
