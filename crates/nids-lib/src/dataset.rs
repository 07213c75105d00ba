//! Synthetic CICIDS2017-style demo dataset
//!
//! Feature values are drawn uniformly and labels are independent of them
//! (70% normal, 30% attack). Good for exercising the pipeline end to end,
//! useless for judging model quality.

use crate::error::TableError;
use crate::schema::FEATURE_NAMES;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::io::Write;

pub const DEFAULT_SAMPLES: usize = 2000;
pub const DEFAULT_SEED: u64 = 42;

/// Class label column written after the features
pub const LABEL_COLUMN: &str = "Label";

/// Probability that a generated flow is labelled as an attack
const ATTACK_RATIO: f64 = 0.3;

/// One generated flow plus its class label (0 normal, 1 attack)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabeledFlow {
    pub flow_duration: u32,
    pub total_fwd_packets: u32,
    pub total_backward_packets: u32,
    pub fwd_packet_length_mean: f64,
    pub bwd_packet_length_mean: f64,
    pub flow_bytes_per_sec: f64,
    pub flow_packets_per_sec: f64,
    pub label: u8,
}

/// Generate `n_samples` flows, reproducible for a given seed
pub fn generate_demo_dataset(n_samples: usize, seed: u64) -> Vec<LabeledFlow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_samples)
        .map(|_| LabeledFlow {
            flow_duration: rng.gen_range(1..1_000_000),
            total_fwd_packets: rng.gen_range(1..5000),
            total_backward_packets: rng.gen_range(1..5000),
            fwd_packet_length_mean: rng.gen::<f64>() * 500.0,
            bwd_packet_length_mean: rng.gen::<f64>() * 500.0,
            flow_bytes_per_sec: rng.gen::<f64>() * 1e6,
            flow_packets_per_sec: rng.gen::<f64>() * 1000.0,
            label: u8::from(rng.gen_bool(ATTACK_RATIO)),
        })
        .collect()
}

/// Write flows as CSV: the seven feature columns followed by `Label`.
///
/// The header is written even when `flows` is empty.
pub fn write_csv<W: Write>(flows: &[LabeledFlow], writer: W) -> Result<(), TableError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(FEATURE_NAMES.iter().chain(std::iter::once(&LABEL_COLUMN)))?;
    for flow in flows {
        wtr.serialize(flow)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FeatureAligner;
    use crate::schema::FeatureSchema;
    use crate::table::RawTable;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_demo_dataset(50, DEFAULT_SEED);
        let b = generate_demo_dataset(50, DEFAULT_SEED);
        let c = generate_demo_dataset(50, 7);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_value_ranges() {
        for flow in generate_demo_dataset(500, 1) {
            assert!((1..1_000_000).contains(&flow.flow_duration));
            assert!((1..5000).contains(&flow.total_fwd_packets));
            assert!((1..5000).contains(&flow.total_backward_packets));
            assert!((0.0..500.0).contains(&flow.fwd_packet_length_mean));
            assert!((0.0..500.0).contains(&flow.bwd_packet_length_mean));
            assert!((0.0..1e6).contains(&flow.flow_bytes_per_sec));
            assert!((0.0..1000.0).contains(&flow.flow_packets_per_sec));
            assert!(flow.label <= 1);
        }
    }

    #[test]
    fn test_label_ratio() {
        let flows = generate_demo_dataset(DEFAULT_SAMPLES, DEFAULT_SEED);
        let attacks = flows.iter().filter(|f| f.label == 1).count() as f64;
        let ratio = attacks / flows.len() as f64;
        assert!((0.25..0.35).contains(&ratio), "attack ratio was {}", ratio);
    }

    #[test]
    fn test_csv_header_matches_schema_and_aligns() {
        let flows = generate_demo_dataset(10, DEFAULT_SEED);
        let mut buf = Vec::new();
        write_csv(&flows, &mut buf).unwrap();

        let raw = RawTable::from_csv_reader(buf.as_slice()).unwrap();
        let mut expected: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        expected.push(LABEL_COLUMN.to_string());
        assert_eq!(raw.columns(), expected.as_slice());

        let aligned = FeatureAligner::new(FeatureSchema::flow()).align(&raw);
        assert_eq!(aligned.len(), 10);
        assert_eq!(
            aligned.row(0).unwrap().get("FlowDuration").unwrap().as_number(),
            Some(flows[0].flow_duration as f64)
        );
    }

    #[test]
    fn test_empty_dataset_still_has_header() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "FlowDuration,TotalFwdPackets,TotalBackwardPackets,FwdPacketLengthMean,\
             BwdPacketLengthMean,FlowBytesPerSec,FlowPacketsPerSec,Label\n"
        );

        let raw = RawTable::from_csv_reader(text.as_bytes()).unwrap();
        assert!(raw.is_empty());
        assert_eq!(raw.columns().len(), 8);
    }
}
