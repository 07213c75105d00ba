//! Tabular containers for flow data
//!
//! `RawTable` holds whatever the user uploaded, `AlignedTable` holds exactly
//! the schema columns in schema order, and `ResultTable` adds the predicted
//! label per row.

use crate::error::TableError;
use crate::models::Label;
use crate::schema::{FeatureSchema, PREDICTION_COLUMN};
use std::fmt;
use std::io::Read;

/// One cell of an input table
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Missing,
    /// Content that does not parse as a number; kept verbatim
    Text(String),
}

impl Cell {
    /// Parse a CSV field. Empty fields and `NaN` are missing values.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_nan() => Cell::Missing,
            Ok(v) => Cell::Number(v),
            Err(_) => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Missing => Ok(()),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Arbitrary user-supplied table: any columns, any order
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(TableError::RaggedRow {
                row,
                expected: columns.len(),
                actual: cells.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Build a numeric table, mostly useful for tests and fixtures
    pub fn from_numbers(columns: &[&str], rows: Vec<Vec<f64>>) -> Result<Self, TableError> {
        Self::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(Cell::Number).collect())
                .collect(),
        )
    }

    /// Read a CSV document with a header row
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::parse).collect());
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with this name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Table whose columns are exactly the schema, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    schema: FeatureSchema,
    rows: Vec<Vec<Cell>>,
}

impl AlignedTable {
    /// Rows must already be schema-wide and in schema order
    pub(crate) fn from_aligned_rows(schema: FeatureSchema, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Self { schema, rows }
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.schema.names()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<AlignedRow<'_>> {
        self.rows.get(index).map(|cells| AlignedRow {
            schema: self.schema,
            index,
            cells,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = AlignedRow<'_>> + '_ {
        self.rows.iter().enumerate().map(|(index, cells)| AlignedRow {
            schema: self.schema,
            index,
            cells,
        })
    }

    /// All values of one schema column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.schema.position(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }
}

/// Borrowed view of one aligned row
#[derive(Debug, Clone, Copy)]
pub struct AlignedRow<'a> {
    schema: FeatureSchema,
    index: usize,
    cells: &'a [Cell],
}

impl<'a> AlignedRow<'a> {
    /// Position of this row in its table
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    pub fn get(&self, name: &str) -> Option<&'a Cell> {
        self.schema.position(name).map(|i| &self.cells[i])
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }
}

/// Aligned features plus one predicted label per row
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    features: AlignedTable,
    labels: Vec<Label>,
}

impl ResultTable {
    pub(crate) fn new(features: AlignedTable, labels: Vec<Label>) -> Self {
        debug_assert_eq!(features.len(), labels.len());
        Self { features, labels }
    }

    /// Schema columns followed by `Prediction`
    pub fn columns(&self) -> Vec<&'static str> {
        let mut cols = self.features.columns().to_vec();
        cols.push(PREDICTION_COLUMN);
        cols
    }

    pub fn features(&self) -> &AlignedTable {
        &self.features
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (AlignedRow<'_>, Label)> + '_ {
        self.features.rows().zip(self.labels.iter().copied())
    }

    pub fn count(&self, label: Label) -> usize {
        self.labels.iter().filter(|l| **l == label).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse("42"), Cell::Number(42.0));
        assert_eq!(Cell::parse(" 3.5 "), Cell::Number(3.5));
        assert_eq!(Cell::parse("1e3"), Cell::Number(1000.0));
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("NaN"), Cell::Missing);
        assert_eq!(Cell::parse("tcp"), Cell::Text("tcp".to_string()));
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(100.0).to_string(), "100");
        assert_eq!(Cell::Number(50.5).to_string(), "50.5");
        assert_eq!(Cell::Missing.to_string(), "");
        assert_eq!(Cell::Text("x".into()).to_string(), "x");
    }

    #[test]
    fn test_read_csv_with_header() {
        let data = "FlowDuration,Protocol\n100,tcp\n,udp\n";
        let table = RawTable::from_csv_reader(data.as_bytes()).unwrap();

        assert_eq!(table.columns(), &["FlowDuration", "Protocol"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][0], Cell::Number(100.0));
        assert_eq!(table.rows()[1][0], Cell::Missing);
        assert_eq!(table.column_index("Protocol"), Some(1));
    }

    #[test]
    fn test_ragged_csv_is_rejected() {
        let data = "a,b\n1,2\n3\n";
        assert!(RawTable::from_csv_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_ragged_rows_rejected_on_construction() {
        let err = RawTable::new(vec!["a".into(), "b".into()], vec![vec![Cell::Missing]])
            .unwrap_err();
        assert!(matches!(
            err,
            TableError::RaggedRow {
                row: 0,
                expected: 2,
                actual: 1
            }
        ));
    }
}
