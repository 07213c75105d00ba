//! Feature alignment for ML inference
//!
//! Conforms arbitrary input tables to the model's feature schema: absent
//! schema columns are filled with the schema default, unknown columns are
//! dropped and the rest are put in training order. Alignment never fails;
//! bad cell contents are left for the inference call to reject.

use crate::models::FlowRecord;
use crate::schema::FeatureSchema;
use crate::table::{AlignedTable, Cell, RawTable};

/// Aligns input tables and records to a feature schema
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAligner {
    schema: FeatureSchema,
}

impl FeatureAligner {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    /// Align an uploaded table. Row count is preserved.
    pub fn align(&self, raw: &RawTable) -> AlignedTable {
        // For each schema column: where to read it from, or the fill value
        let sources: Vec<Result<usize, f64>> = self
            .schema
            .names()
            .iter()
            .map(|name| match raw.column_index(name) {
                Some(idx) => Ok(idx),
                None => Err(self.schema.default_fill(name).unwrap_or_default()),
            })
            .collect();

        let rows = raw
            .rows()
            .iter()
            .map(|cells| {
                sources
                    .iter()
                    .map(|src| match src {
                        Ok(idx) => cells[*idx].clone(),
                        Err(fill) => Cell::Number(*fill),
                    })
                    .collect()
            })
            .collect();

        AlignedTable::from_aligned_rows(self.schema, rows)
    }

    /// Align one manually entered flow into a single-row table
    pub fn align_record(&self, record: &FlowRecord) -> AlignedTable {
        let row = self
            .schema
            .names()
            .iter()
            .map(|name| {
                let value = record
                    .get(name)
                    .or_else(|| self.schema.default_fill(name))
                    .unwrap_or_default();
                Cell::Number(value)
            })
            .collect();

        AlignedTable::from_aligned_rows(self.schema, vec![row])
    }
}
