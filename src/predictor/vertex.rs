//! Vertex AI image-classification backend over the REST `:predict` API.
//!
//! Bearer tokens come from `GCP_ACCESS_TOKEN` when configured, otherwise from the GCE
//! metadata server of the instance the service runs on. Metadata tokens are cached until
//! shortly before they expire.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::backend::ClassifierBackend;
use super::error::{PredictorError, PredictorResult};
use super::types::Classification;
use crate::config::VertexSettings;
use crate::constants::{CLASSIFIER_CONFIDENCE_THRESHOLD, CLASSIFIER_MAX_PREDICTIONS};
use crate::image::EncodedImage;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<ClassificationPrediction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationPrediction {
    #[serde(default)]
    display_names: Vec<String>,
    #[serde(default)]
    confidences: Vec<f64>,
}

impl PredictResponse {
    /// Highest-ranked pair of the first prediction. Vertex returns labels already sorted by
    /// confidence.
    fn top_classification(self) -> Option<Classification> {
        let first = self.predictions.into_iter().next()?;
        let label = first.display_names.into_iter().next()?;
        Some(Classification {
            label,
            score: first.confidences.first().copied(),
        })
    }
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Calls a deployed Vertex AI classification endpoint.
pub struct VertexBackend {
    settings: VertexSettings,
    http: HttpClient,
    metadata_http: HttpClient,
    token: Mutex<Option<CachedToken>>,
}

impl VertexBackend {
    pub fn new(settings: VertexSettings) -> Self {
        Self {
            settings,
            http: HttpClient::new(),
            metadata_http: HttpClient::builder()
                .timeout(METADATA_TIMEOUT)
                .build()
                .unwrap_or_else(|_| HttpClient::new()),
            token: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &VertexSettings {
        &self.settings
    }

    async fn access_token(&self) -> PredictorResult<String> {
        if let Some(token) = &self.settings.access_token {
            return Ok(token.clone());
        }

        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|cached| Instant::now() < cached.refresh_at)
            .map(|cached| cached.token.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        let fetched = self.fetch_metadata_token().await?;
        let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let token = fetched.access_token;
        *self.token.lock() = Some(CachedToken {
            token: token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token)
    }

    async fn fetch_metadata_token(&self) -> PredictorResult<MetadataToken> {
        let resp = self
            .metadata_http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| PredictorError::Transport(format!("Metadata token request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PredictorError::UpstreamStatus {
                status: resp.status().as_u16(),
                body: "metadata token request rejected".to_string(),
            });
        }

        resp.json::<MetadataToken>()
            .await
            .map_err(|e| PredictorError::Decode(format!("Metadata token: {e}")))
    }

    fn request_body(image: &EncodedImage) -> serde_json::Value {
        json!({
            "instances": [{ "content": image.to_base64() }],
            "parameters": {
                "confidenceThreshold": CLASSIFIER_CONFIDENCE_THRESHOLD,
                "maxPredictions": CLASSIFIER_MAX_PREDICTIONS,
            },
        })
    }

    fn classify_status(&self, status: StatusCode, body: String) -> PredictorError {
        if status == StatusCode::NOT_FOUND || body.to_lowercase().contains("not found") {
            return PredictorError::EndpointNotFound {
                endpoint: self.settings.endpoint_path(),
            };
        }
        PredictorError::UpstreamStatus {
            status: status.as_u16(),
            body,
        }
    }
}

impl std::fmt::Debug for VertexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexBackend")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ClassifierBackend for VertexBackend {
    async fn classify(&self, image: &EncodedImage) -> PredictorResult<Option<Classification>> {
        let token = self.access_token().await?;
        let url = self.settings.predict_url();
        debug!(endpoint = %self.settings.endpoint_path(), image_bytes = image.len(), "Sending image to Vertex AI");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&Self::request_body(image))
            .send()
            .await
            .map_err(|e| PredictorError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(self.classify_status(status, body));
        }

        let parsed: PredictResponse = resp
            .json()
            .await
            .map_err(|e| PredictorError::Decode(e.to_string()))?;

        Ok(parsed.top_classification())
    }
}
