use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::backend::ClassifierBackend;
use super::error::PredictorError;
use super::types::SecondaryPrediction;
use super::vertex::VertexBackend;
use crate::config::Config;
use crate::image::EncodedImage;

/// Corroborating classifier. Disabled or failing classifiers yield `None`, never an error.
#[derive(Clone, Default)]
pub struct SecondaryPredictor {
    backend: Option<Arc<dyn ClassifierBackend>>,
}

impl SecondaryPredictor {
    pub fn new(backend: Arc<dyn ClassifierBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Vertex-backed predictor when the flag is on and every identifier is configured.
    pub fn from_config(config: &Config) -> Self {
        match config.vertex_settings() {
            Some(settings) => Self::new(Arc::new(VertexBackend::new(settings))),
            None => Self::disabled(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    #[instrument(skip(self, image), fields(image_bytes = image.len()))]
    pub async fn predict(&self, image: &EncodedImage) -> Option<SecondaryPrediction> {
        let backend = self.backend.as_ref()?;

        match backend.classify(image).await {
            Ok(Some(classification)) => {
                let prediction = SecondaryPrediction::from_classification(&classification);
                debug!(
                    label = %classification.label,
                    confidence = ?prediction.confidence,
                    "Secondary prediction received"
                );
                Some(prediction)
            }
            Ok(None) => {
                warn!("Classifier returned no predictions");
                None
            }
            Err(e @ PredictorError::EndpointNotFound { .. }) => {
                warn!(
                    error = %e,
                    hint = "check GCP_PROJECT, GCP_VERTEX_PROJECT, GCP_LOCATION and GCP_ENDPOINT_ID",
                    "Classifier endpoint not found, continuing without it"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Classifier call failed, continuing without it");
                None
            }
        }
    }
}

impl std::fmt::Debug for SecondaryPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryPredictor")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
