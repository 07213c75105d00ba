//! API client for communicating with the NIDS server

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use nids_lib::{Label, ModelInfo};
use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the NIDS server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// POST a CSV document and return the CSV answer.
    ///
    /// `None` when the server had nothing to predict (204 No Content).
    pub async fn post_csv(&self, path: &str, body: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "text/csv")
            .body(body)
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = check_status(response)
            .await?
            .bytes()
            .await
            .context("Failed to read response body")?;
        Ok(Some(bytes.to_vec()))
    }

    pub async fn predict(&self, flow: &nids_lib::FlowRecord) -> Result<PredictResponse> {
        self.post_json("api/predict", flow).await
    }

    pub async fn predict_batch(&self, csv: Vec<u8>) -> Result<Option<Vec<u8>>> {
        self.post_csv("api/batch", csv).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("healthz").await
    }
}

/// Turn a non-success status into an error carrying the server's message
async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => anyhow::bail!("API error ({}): {}", status, err.error),
        Err(_) => anyhow::bail!("API error ({}): {}", status, body),
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub label: Label,
    pub code: i64,
    pub confidence: f32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: Option<ModelInfo>,
    pub features: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    #[serde(default)]
    pub rows_predicted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
