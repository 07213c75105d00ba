//! Server status

use anyhow::Result;
use tabled::{builder::Builder, settings::Style};

use crate::client::ApiClient;
use crate::output::{format_bytes, print_json, print_warning, OutputFormat};

pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    if format == OutputFormat::Json {
        return print_json(&health);
    }

    let mut builder = Builder::default();
    builder.push_record(["Status".to_string(), health.status.clone()]);
    builder.push_record([
        "Started".to_string(),
        health.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ]);
    builder.push_record(["Uptime".to_string(), format!("{}s", health.uptime_secs)]);
    builder.push_record(["Rows predicted".to_string(), health.rows_predicted.to_string()]);
    builder.push_record(["Features".to_string(), health.features.join(", ")]);

    match &health.model {
        Some(model) => {
            builder.push_record(["Model".to_string(), model.path.clone()]);
            builder.push_record(["Kind".to_string(), model.kind.as_str().to_string()]);
            builder.push_record(["Size".to_string(), format_bytes(model.size_bytes as u64)]);
            builder.push_record(["SHA-256".to_string(), model.checksum.clone()]);
        }
        None => print_warning("Server reports no model loaded"),
    }

    println!("{}", builder.build().with(Style::rounded()));
    Ok(())
}
