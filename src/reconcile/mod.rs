//! Merges the two predictor outputs into one response.
//!
//! Both adapters run concurrently under the same deadline. The headline always comes from the
//! primary; the secondary verdict is only a side channel for comparison.

#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::image::EncodedImage;
use crate::predictor::{
    ClassifierVerdict, NormalizedPrediction, PredictorError, PredictorResult, PrimaryPredictor,
    SecondaryPrediction, SecondaryPredictor,
};
use crate::sanitize::Validity;

/// Final, immutable result of one validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledResult {
    denomination: String,
    currency: String,
    validity: Validity,
    confidence: u8,
    features: Vec<String>,
    print_quality_score: Option<u8>,
    notes: String,
    gemini_validity: Validity,
    gemini_confidence: u8,
    vertex_validity: Option<ClassifierVerdict>,
    vertex_confidence: Option<u8>,
    models_disagree: bool,
}

impl ReconciledResult {
    /// Copies every headline field from `primary`; `secondary` only fills the side channel.
    pub fn merge(primary: NormalizedPrediction, secondary: Option<SecondaryPrediction>) -> Self {
        let (vertex_validity, vertex_confidence) = match secondary {
            Some(s) => (s.validity, s.confidence),
            None => (None, None),
        };
        let models_disagree = vertex_validity
            .as_ref()
            .is_some_and(|verdict| !verdict.agrees_with(primary.validity));

        Self {
            gemini_validity: primary.validity,
            gemini_confidence: primary.confidence,
            denomination: primary.denomination,
            currency: primary.currency,
            validity: primary.validity,
            confidence: primary.confidence,
            features: primary.features,
            print_quality_score: primary.print_quality_score,
            notes: primary.notes,
            vertex_validity,
            vertex_confidence,
            models_disagree,
        }
    }

    pub fn denomination(&self) -> &str {
        &self.denomination
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn print_quality_score(&self) -> Option<u8> {
        self.print_quality_score
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn gemini_validity(&self) -> Validity {
        self.gemini_validity
    }

    pub fn gemini_confidence(&self) -> u8 {
        self.gemini_confidence
    }

    pub fn vertex_validity(&self) -> Option<&ClassifierVerdict> {
        self.vertex_validity.as_ref()
    }

    pub fn vertex_confidence(&self) -> Option<u8> {
        self.vertex_confidence
    }

    /// `true` only when both verdicts exist and differ.
    pub fn models_disagree(&self) -> bool {
        self.models_disagree
    }
}

/// Runs both predictors for one image.
#[derive(Debug, Clone)]
pub struct Reconciler {
    primary: PrimaryPredictor,
    secondary: SecondaryPredictor,
    upstream_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        primary: PrimaryPredictor,
        secondary: SecondaryPredictor,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            upstream_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PrimaryPredictor::from_config(config),
            SecondaryPredictor::from_config(config),
            config.upstream_timeout,
        )
    }

    pub fn primary(&self) -> &PrimaryPredictor {
        &self.primary
    }

    pub fn secondary(&self) -> &SecondaryPredictor {
        &self.secondary
    }

    /// Fails only when the primary fails or misses the deadline.
    #[instrument(skip(self, image), fields(image_bytes = image.len()))]
    pub async fn reconcile(
        &self,
        image: &EncodedImage,
        model_override: Option<&str>,
    ) -> PredictorResult<ReconciledResult> {
        let deadline = self.upstream_timeout;

        let (primary, secondary) = tokio::join!(
            tokio::time::timeout(deadline, self.primary.predict(image, model_override)),
            tokio::time::timeout(deadline, self.secondary.predict(image)),
        );

        let primary = primary.map_err(|_| PredictorError::Timeout(deadline))??;
        let secondary = secondary.unwrap_or_else(|_| {
            warn!(timeout = ?deadline, "Classifier timed out, continuing without it");
            None
        });

        let result = ReconciledResult::merge(primary, secondary);
        info!(
            validity = %result.validity(),
            confidence = result.confidence(),
            vertex_validity = ?result.vertex_validity().map(ClassifierVerdict::as_str),
            models_disagree = result.models_disagree(),
            "Validation reconciled"
        );
        Ok(result)
    }
}
