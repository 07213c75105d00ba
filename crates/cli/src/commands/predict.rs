//! Single-flow prediction

use anyhow::Result;
use clap::Args;
use nids_lib::{FeatureSchema, FlowRecord};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{prediction_line, print_json, OutputFormat};

/// Flow features; anything left out takes the form default
#[derive(Debug, Clone, Default, Args)]
pub struct FlowArgs {
    #[arg(long)]
    pub flow_duration: Option<f64>,
    #[arg(long)]
    pub total_fwd_packets: Option<f64>,
    #[arg(long)]
    pub total_backward_packets: Option<f64>,
    #[arg(long)]
    pub fwd_packet_length_mean: Option<f64>,
    #[arg(long)]
    pub bwd_packet_length_mean: Option<f64>,
    #[arg(long)]
    pub flow_bytes_per_sec: Option<f64>,
    #[arg(long)]
    pub flow_packets_per_sec: Option<f64>,
}

impl FlowArgs {
    /// Build the flow sent to the server, in schema order
    pub fn to_record(&self, schema: FeatureSchema) -> FlowRecord {
        let given = [
            self.flow_duration,
            self.total_fwd_packets,
            self.total_backward_packets,
            self.fwd_packet_length_mean,
            self.bwd_packet_length_mean,
            self.flow_bytes_per_sec,
            self.flow_packets_per_sec,
        ];
        schema
            .names()
            .iter()
            .zip(given)
            .map(|(name, value)| (*name, value.unwrap_or_else(|| schema.input_default(name))))
            .collect()
    }
}

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Value")]
    value: f64,
}

pub async fn predict_flow(client: &ApiClient, args: &FlowArgs, format: OutputFormat) -> Result<()> {
    let schema = FeatureSchema::flow();
    let flow = args.to_record(schema);
    let response = client.predict(&flow).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let rows: Vec<FeatureRow> = schema
                .names()
                .iter()
                .map(|name| FeatureRow {
                    name: name.to_string(),
                    value: flow.get(name).unwrap_or_default(),
                })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\n{}", prediction_line(response.label, response.confidence));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_fields_take_form_defaults() {
        let args = FlowArgs {
            flow_duration: Some(900.0),
            flow_bytes_per_sec: Some(12.5),
            ..Default::default()
        };
        let record = args.to_record(FeatureSchema::flow());

        assert_eq!(record.len(), 7);
        assert_eq!(record.get("FlowDuration"), Some(900.0));
        assert_eq!(record.get("FlowBytesPerSec"), Some(12.5));
        assert_eq!(record.get("TotalFwdPackets"), Some(1.0));
        assert_eq!(record.get("FwdPacketLengthMean"), Some(0.0));
        assert_eq!(record.get("FlowPacketsPerSec"), Some(1.0));
    }
}
