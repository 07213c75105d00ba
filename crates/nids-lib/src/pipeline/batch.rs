//! Batch prediction over an uploaded CSV document

use super::inference::InferenceEngine;
use super::output::ResultFormatter;
use crate::error::PipelineError;
use crate::table::{RawTable, ResultTable};

/// What a batch upload produced
#[derive(Debug)]
pub enum BatchOutcome {
    /// Nothing was uploaded; the batch step is a no-op
    Skipped,
    Completed { table: ResultTable, csv: Vec<u8> },
}

/// Read CSV bytes, align, classify and serialize the labelled table
pub fn predict_csv(engine: &InferenceEngine, upload: &[u8]) -> Result<BatchOutcome, PipelineError> {
    if upload.iter().all(u8::is_ascii_whitespace) {
        return Ok(BatchOutcome::Skipped);
    }

    let raw = RawTable::from_csv_reader(upload)?;
    let aligned = engine.aligner().align(&raw);
    let predictions = engine.predict_batch(&aligned)?;

    let formatter = ResultFormatter::new();
    let table = formatter.annotate(&aligned, &predictions)?;
    let csv = formatter.to_csv_bytes(&table)?;

    Ok(BatchOutcome::Completed { table, csv })
}
