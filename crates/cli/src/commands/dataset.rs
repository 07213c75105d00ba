//! Local demo dataset generation

use anyhow::{Context, Result};
use nids_lib::dataset::{generate_demo_dataset, write_csv};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::output::{print_json, print_success, OutputFormat};

#[derive(Debug, Serialize)]
struct GenerateSummary {
    samples: usize,
    attacks: usize,
    seed: u64,
    output: PathBuf,
}

pub fn generate(samples: usize, seed: u64, output: &Path, format: OutputFormat) -> Result<()> {
    let flows = generate_demo_dataset(samples, seed);

    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    write_csv(&flows, BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let summary = GenerateSummary {
        samples: flows.len(),
        attacks: flows.iter().filter(|f| f.label == 1).count(),
        seed,
        output: output.to_path_buf(),
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_success(&format!(
            "Dataset generated: {} samples ({} attacks) -> {}",
            summary.samples,
            summary.attacks,
            output.display()
        )),
    }
    Ok(())
}
