//! Batch prediction of a CSV file

use anyhow::{Context, Result};
use nids_lib::{Label, PREDICTION_COLUMN};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::client::ApiClient;
use crate::output::{color_label, print_info, print_json, print_success, print_warning, OutputFormat};

/// Rows shown in the terminal before the table is cut off
const MAX_TABLE_ROWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub attacks: usize,
    pub normal: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

pub async fn predict_file(
    client: &ApiClient,
    input: &Path,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let upload = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let Some(csv) = client.predict_batch(upload).await? else {
        print_warning(&format!("{} is empty, nothing to predict", input.display()));
        return Ok(());
    };

    if let Some(path) = &output {
        std::fs::write(path, &csv)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let mut summary = summarize(&csv)?;
    summary.output = output;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            match &summary.output {
                Some(path) => print_success(&format!("Predictions written to {}", path.display())),
                None => print_table(&csv)?,
            }
            print_info(&format!(
                "{} flows: {} attack, {} normal",
                summary.rows, summary.attacks, summary.normal
            ));
        }
    }

    Ok(())
}

/// Count labels in the `Prediction` column of a result CSV
pub fn summarize(csv: &[u8]) -> Result<BatchSummary> {
    let mut rdr = csv::Reader::from_reader(csv);
    let column = rdr
        .headers()
        .context("Failed to read result header")?
        .iter()
        .position(|h| h == PREDICTION_COLUMN)
        .context("Result has no Prediction column")?;

    let mut summary = BatchSummary {
        rows: 0,
        attacks: 0,
        normal: 0,
        output: None,
    };
    for record in rdr.records() {
        let record = record.context("Failed to parse result row")?;
        summary.rows += 1;
        if record.get(column) == Some(Label::Attack.as_str()) {
            summary.attacks += 1;
        } else {
            summary.normal += 1;
        }
    }
    Ok(summary)
}

fn print_table(csv: &[u8]) -> Result<()> {
    let mut rdr = csv::Reader::from_reader(csv);
    let headers = rdr.headers().context("Failed to read result header")?.clone();
    let label_column = headers.iter().position(|h| h == PREDICTION_COLUMN);

    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));

    let mut total = 0;
    for record in rdr.records() {
        let record = record.context("Failed to parse result row")?;
        total += 1;
        if total > MAX_TABLE_ROWS {
            continue;
        }
        let cells: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(i, cell)| match (Some(i) == label_column, cell) {
                (true, "Attack") => color_label(Label::Attack),
                (true, "Normal") => color_label(Label::Normal),
                _ => cell.to_string(),
            })
            .collect();
        builder.push_record(cells);
    }

    println!("{}", builder.build().with(Style::rounded()));
    if total > MAX_TABLE_ROWS {
        println!("... {} more rows (use --output to save them all)", total - MAX_TABLE_ROWS);
    }
    Ok(())
}
