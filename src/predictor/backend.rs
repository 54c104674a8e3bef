//! Upstream seams. Adapters own the normalization; backends only move bytes.

use async_trait::async_trait;

use super::error::PredictorResult;
use super::types::Classification;
use crate::image::EncodedImage;

/// Generative vision-language model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Sends `prompt` and `image` to `model` and returns the raw response text.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &EncodedImage,
    ) -> PredictorResult<String>;
}

/// Image classifier endpoint.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Returns the highest-ranked label of the first prediction, or `None` when the
    /// endpoint returned no labels.
    async fn classify(&self, image: &EncodedImage) -> PredictorResult<Option<Classification>>;
}
