use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use findit_core::LabelDetector;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectionRequest<'a> {
    image_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetectionResponse {
    #[serde(default)]
    etiquetas: Vec<String>,
}

/// Client for the label-detection function: posts a photo URL, gets back labels
pub struct HttpLabelDetector {
    client: Client,
    endpoint: String,
}

impl HttpLabelDetector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl LabelDetector for HttpLabelDetector {
    async fn detect_labels(&self, locator: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&DetectionRequest { image_url: locator })
            .send()
            .await
            .context("Label detection request failed")?
            .error_for_status()
            .context("Label detection returned an error status")?;

        let body: DetectionResponse = response
            .json()
            .await
            .context("Failed to parse label detection response")?;

        tracing::debug!("Detected {} labels", body.etiquetas.len());
        Ok(body
            .etiquetas
            .into_iter()
            .map(|label| label.to_lowercase())
            .collect())
    }
}
