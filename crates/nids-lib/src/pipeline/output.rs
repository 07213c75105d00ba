//! Prediction output formatting
//!
//! Maps class codes to labels, attaches them to the aligned table and
//! serializes the result for download.

use crate::error::TableError;
use crate::models::{Label, Prediction};
use crate::table::{AlignedTable, ResultTable};

/// Stateless formatter for single and batch prediction results
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn new() -> Self {
        Self
    }

    /// `"Attack"` for class code 1, `"Normal"` for anything else
    pub fn label_of(&self, code: i64) -> &'static str {
        Label::from_code(code).as_str()
    }

    /// Copy the aligned table and append a `Prediction` label per row
    pub fn annotate(
        &self,
        table: &AlignedTable,
        predictions: &[i64],
    ) -> Result<ResultTable, TableError> {
        if table.len() != predictions.len() {
            return Err(TableError::LengthMismatch {
                rows: table.len(),
                predictions: predictions.len(),
            });
        }
        let labels = predictions.iter().map(|c| Label::from_code(*c)).collect();
        Ok(ResultTable::new(table.clone(), labels))
    }

    /// UTF-8 CSV with a header row and no index column
    pub fn to_csv_bytes(&self, result: &ResultTable) -> Result<Vec<u8>, TableError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(result.columns())?;

        for (row, label) in result.rows() {
            let record = row
                .cells()
                .iter()
                .map(|c| c.to_string())
                .chain(std::iter::once(label.as_str().to_string()));
            wtr.write_record(record)?;
        }

        wtr.into_inner().map_err(|e| TableError::Io(e.into_error()))
    }

    /// Display line for a single-flow prediction
    pub fn describe(&self, prediction: &Prediction) -> String {
        format!(
            "Prediction: {} (Confidence: {:.2})",
            prediction.label, prediction.confidence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::features::FeatureAligner;
    use crate::schema::{FeatureSchema, FEATURE_NAMES, PREDICTION_COLUMN};
    use crate::table::{Cell, RawTable};

    fn aligned(rows: usize) -> AlignedTable {
        let raw = RawTable::from_numbers(
            &["FlowDuration", "FlowBytesPerSec"],
            (0..rows).map(|i| vec![i as f64, 0.5]).collect(),
        )
        .unwrap();
        FeatureAligner::new(FeatureSchema::flow()).align(&raw)
    }

    #[test]
    fn test_label_of() {
        let f = ResultFormatter::new();
        assert_eq!(f.label_of(1), "Attack");
        assert_eq!(f.label_of(0), "Normal");
    }

    #[test]
    fn test_annotate_appends_prediction_column() {
        let f = ResultFormatter::new();
        let table = aligned(3);
        let result = f.annotate(&table, &[1, 0, 1]).unwrap();

        let mut expected: Vec<&str> = FEATURE_NAMES.to_vec();
        expected.push(PREDICTION_COLUMN);
        assert_eq!(result.columns(), expected);
        assert_eq!(result.features(), &table);
        assert_eq!(result.labels(), &[Label::Attack, Label::Normal, Label::Attack]);
        assert_eq!(result.count(Label::Attack), 2);

        for (i, (row, _)) in result.rows().enumerate() {
            assert_eq!(row.get("FlowDuration"), Some(&Cell::Number(i as f64)));
        }
    }

    #[test]
    fn test_annotate_length_mismatch() {
        let f = ResultFormatter::new();
        let err = f.annotate(&aligned(2), &[1]).unwrap_err();
        assert!(matches!(
            err,
            TableError::LengthMismatch {
                rows: 2,
                predictions: 1
            }
        ));
    }

    #[test]
    fn test_csv_bytes_layout() {
        let f = ResultFormatter::new();
        let result = f.annotate(&aligned(2), &[0, 1]).unwrap();
        let csv = String::from_utf8(f.to_csv_bytes(&result).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "FlowDuration,TotalFwdPackets,TotalBackwardPackets,FwdPacketLengthMean,\
             BwdPacketLengthMean,FlowBytesPerSec,FlowPacketsPerSec,Prediction"
        );
        assert_eq!(lines[1], "0,0,0,0,0,0.5,0,Normal");
        assert_eq!(lines[2], "1,0,0,0,0,0.5,0,Attack");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_describe_single_prediction() {
        let f = ResultFormatter::new();
        let prediction = Prediction {
            label: Label::Attack,
            code: 1,
            confidence: 0.8,
        };
        assert_eq!(f.describe(&prediction), "Prediction: Attack (Confidence: 0.80)");
    }
}
