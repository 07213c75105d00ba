//! Model inference over aligned tables
//!
//! `OnnxClassifier` runs a RandomForest exported to ONNX through tract.
//! `InferenceEngine` owns the loaded classifier for the life of the process
//! and turns aligned rows into class codes and confidences.

use super::features::FeatureAligner;
use super::loader::{load_model, LoadedModel};
use super::{argmax, Classifier, FeatureMatrix};
use crate::error::{InferenceError, ModelError};
use crate::models::{FlowRecord, Label, ModelInfo, Prediction};
use crate::schema::FeatureSchema;
use crate::table::{AlignedRow, AlignedTable, Cell};
use anyhow::Context;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Inference calls slower than this are logged and counted
const SLOW_INFERENCE_MS: u128 = 250;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX classifier run one row at a time through tract
///
/// Expects the layout produced by `skl2onnx` with `zipmap=False`: input
/// `float [1, n_features]`, outputs `label int64 [1]` and
/// `probabilities float [1, n_classes]`. A model with a single probability
/// output is also accepted; its label is the arg-max class index.
pub struct OnnxClassifier {
    model: TractModel,
    n_features: usize,
}

impl OnnxClassifier {
    pub fn from_bytes(model_bytes: &[u8], n_features: usize) -> Result<Self, ModelError> {
        let model = Self::load_model(model_bytes, n_features)
            .map_err(|e| ModelError::Parse(format!("{:#}", e)))?;
        Ok(Self { model, n_features })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], n_features: usize) -> TractResult<TractModel> {
        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")
    }

    fn run_row(&self, row: &[f32]) -> Result<(i64, Vec<f32>), InferenceError> {
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, self.n_features), row.to_vec())
            .map_err(|e| InferenceError::Backend(e.to_string()))?
            .into();

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Backend(format!("{:#}", e)))?;

        match outputs.len() {
            0 => Err(InferenceError::UnexpectedOutput("model produced no outputs".into())),
            1 => {
                let proba = tensor_to_probabilities(&outputs[0])?;
                let code = argmax(&proba)
                    .ok_or_else(|| InferenceError::UnexpectedOutput("empty probabilities".into()))?;
                Ok((code as i64, proba))
            }
            _ => {
                let labels = outputs[0]
                    .cast_to::<i64>()
                    .map_err(|e| InferenceError::UnexpectedOutput(format!("label output: {}", e)))?;
                let code = labels
                    .as_slice::<i64>()
                    .map_err(|e| InferenceError::UnexpectedOutput(e.to_string()))?
                    .first()
                    .copied()
                    .ok_or_else(|| InferenceError::UnexpectedOutput("empty label output".into()))?;
                Ok((code, tensor_to_probabilities(&outputs[1])?))
            }
        }
    }

    fn check_width(&self, features: &FeatureMatrix) -> Result<(), InferenceError> {
        if features.n_features() != self.n_features {
            return Err(InferenceError::FeatureCount {
                expected: self.n_features,
                actual: features.n_features(),
            });
        }
        Ok(())
    }
}

fn tensor_to_probabilities(output: &Tensor) -> Result<Vec<f32>, InferenceError> {
    let cast = output.cast_to::<f32>().map_err(|e| {
        InferenceError::UnexpectedOutput(format!(
            "probability output is not a float tensor (export with zipmap disabled): {}",
            e
        ))
    })?;
    let values = cast
        .as_slice::<f32>()
        .map_err(|e| InferenceError::UnexpectedOutput(e.to_string()))?;
    Ok(values.to_vec())
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<i64>, InferenceError> {
        self.check_width(features)?;
        features
            .rows()
            .map(|row| self.run_row(row).map(|(code, _)| code))
            .collect()
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f32>>, InferenceError> {
        self.check_width(features)?;
        features
            .rows()
            .map(|row| self.run_row(row).map(|(_, proba)| proba))
            .collect()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_rows: u64,
    pub slow_calls: u64,
}

/// Read-only prediction front end over a loaded classifier
///
/// Constructed once at startup and shared behind an `Arc`; there is no way
/// to swap or mutate the model afterwards.
pub struct InferenceEngine {
    model: Box<dyn Classifier>,
    aligner: FeatureAligner,
    info: Option<ModelInfo>,
    rows_predicted: AtomicU64,
    slow_calls: AtomicU64,
}

impl InferenceEngine {
    pub fn new(model: Box<dyn Classifier>, schema: FeatureSchema) -> Result<Self, ModelError> {
        if model.n_features() != schema.len() {
            return Err(ModelError::Invalid(format!(
                "model expects {} features, schema has {}",
                model.n_features(),
                schema.len()
            )));
        }
        Ok(Self {
            model,
            aligner: FeatureAligner::new(schema),
            info: None,
            rows_predicted: AtomicU64::new(0),
            slow_calls: AtomicU64::new(0),
        })
    }

    /// Load the artifact at `path` for the flow schema
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> Result<Self, ModelError> {
        let schema = FeatureSchema::flow();
        Self::from_loaded(load_model(path, schema, expected_sha256)?, schema)
    }

    pub fn from_loaded(loaded: LoadedModel, schema: FeatureSchema) -> Result<Self, ModelError> {
        let mut engine = Self::new(loaded.classifier, schema)?;
        engine.info = Some(loaded.info);
        Ok(engine)
    }

    pub fn info(&self) -> Option<&ModelInfo> {
        self.info.as_ref()
    }

    pub fn schema(&self) -> FeatureSchema {
        self.aligner.schema()
    }

    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }

    /// Raw class code for one aligned row
    pub fn predict_label(&self, row: AlignedRow<'_>) -> Result<i64, InferenceError> {
        let matrix = to_matrix(self.schema(), std::iter::once(row))?;
        let codes = self.timed(1, || self.model.predict(&matrix))?;
        single(codes)
    }

    /// Highest class probability for one aligned row
    pub fn predict_confidence(&self, row: AlignedRow<'_>) -> Result<f32, InferenceError> {
        let matrix = to_matrix(self.schema(), std::iter::once(row))?;
        let proba = single(self.timed(1, || self.model.predict_proba(&matrix))?)?;
        max_probability(&proba)
    }

    /// Class code per row, in input order
    pub fn predict_batch(&self, table: &AlignedTable) -> Result<Vec<i64>, InferenceError> {
        let matrix = to_matrix(self.schema(), table.rows())?;
        let codes = self.timed(table.len(), || self.model.predict(&matrix))?;
        if codes.len() != table.len() {
            return Err(InferenceError::UnexpectedOutput(format!(
                "{} predictions for {} rows",
                codes.len(),
                table.len()
            )));
        }
        Ok(codes)
    }

    /// Align a manually entered flow and classify it
    pub fn predict_flow(&self, record: &FlowRecord) -> Result<Prediction, InferenceError> {
        let table = self.aligner.align_record(record);
        let row = table
            .row(0)
            .ok_or_else(|| InferenceError::UnexpectedOutput("alignment produced no row".into()))?;
        let code = self.predict_label(row)?;
        let confidence = self.predict_confidence(row)?;
        Ok(Prediction {
            label: Label::from_code(code),
            code,
            confidence,
        })
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_rows: self.rows_predicted.load(Ordering::Relaxed),
            slow_calls: self.slow_calls.load(Ordering::Relaxed),
        }
    }

    fn timed<T>(
        &self,
        rows: usize,
        call: impl FnOnce() -> Result<T, InferenceError>,
    ) -> Result<T, InferenceError> {
        let start = Instant::now();
        let result = call();
        let elapsed = start.elapsed();

        self.rows_predicted.fetch_add(rows as u64, Ordering::Relaxed);
        if elapsed.as_millis() > SLOW_INFERENCE_MS {
            self.slow_calls.fetch_add(1, Ordering::Relaxed);
            warn!(
                elapsed_ms = elapsed.as_millis(),
                rows = rows,
                "Inference exceeded {}ms target",
                SLOW_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), rows = rows, "Inference completed");
        }
        result
    }
}

/// Convert aligned rows into the dense matrix the model consumes.
///
/// This is where non-numeric, missing and out-of-range cells finally fail.
fn to_matrix<'a>(
    schema: FeatureSchema,
    rows: impl Iterator<Item = AlignedRow<'a>>,
) -> Result<FeatureMatrix, InferenceError> {
    let mut data = Vec::new();
    for row in rows {
        for (cell, column) in row.cells().iter().zip(schema.names()) {
            let value = match cell {
                Cell::Number(v) => {
                    let narrowed = *v as f32;
                    if !narrowed.is_finite() {
                        return Err(InferenceError::OutOfRange {
                            row: row.index(),
                            column: column.to_string(),
                            value: *v,
                        });
                    }
                    narrowed
                }
                Cell::Missing => {
                    return Err(InferenceError::MissingValue {
                        row: row.index(),
                        column: column.to_string(),
                    })
                }
                Cell::Text(s) => {
                    return Err(InferenceError::NonNumeric {
                        row: row.index(),
                        column: column.to_string(),
                        value: s.clone(),
                    })
                }
            };
            data.push(value);
        }
    }
    FeatureMatrix::new(schema.len(), data)
}

fn single<T>(mut values: Vec<T>) -> Result<T, InferenceError> {
    if values.len() != 1 {
        return Err(InferenceError::UnexpectedOutput(format!(
            "expected one result, got {}",
            values.len()
        )));
    }
    values
        .pop()
        .ok_or_else(|| InferenceError::UnexpectedOutput("no result".into()))
}

fn max_probability(proba: &[f32]) -> Result<f32, InferenceError> {
    argmax(proba)
        .map(|i| proba[i].clamp(0.0, 1.0))
        .ok_or_else(|| InferenceError::UnexpectedOutput("empty probabilities".into()))
}
