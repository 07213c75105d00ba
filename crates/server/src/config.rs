//! Server configuration

use anyhow::Result;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Model artifact, `.onnx` or `.json`
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Expected SHA-256 of the model artifact, hex encoded
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Largest accepted request body (CSV uploads included)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Name attached to every structured log event
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/intrusion_model.onnx")
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "nids-demo".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            model_path: default_model_path(),
            model_sha256: None,
            max_upload_bytes: default_max_upload_bytes(),
            instance_name: default_instance_name(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `nids.{toml,json,yaml}` file,
    /// overridden by `NIDS_*` environment variables
    pub fn load() -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::with_name("nids").required(false))
            .add_source(Environment::with_prefix("NIDS"));
        Self::from_builder(builder)
    }

    /// Deserialize from an already assembled source stack
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Socket address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
