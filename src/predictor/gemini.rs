//! Gemini backend over `genai`.

use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatRequest, ContentPart, MessageContent};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, ModelIden};
use tracing::debug;

use super::backend::GenerativeBackend;
use super::error::{PredictorError, PredictorResult};
use crate::image::EncodedImage;

/// Sends prompt + inline image to Gemini and returns the first text part of the reply.
pub struct GeminiBackend {
    client: Client,
}

impl GeminiBackend {
    /// Builds a client that authenticates every request with `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(api_key.clone())))
            },
        );
        let client = Client::builder().with_auth_resolver(auth_resolver).build();
        Self { client }
    }

    fn build_request(prompt: &str, image: &EncodedImage) -> ChatRequest {
        let mut content = MessageContent::default();
        content.push(ContentPart::Text(prompt.to_string()));
        content.push(ContentPart::from_binary_base64(
            image.mime_type(),
            image.to_base64(),
            None,
        ));
        ChatRequest::new(vec![ChatMessage::user(content)])
    }
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &EncodedImage,
    ) -> PredictorResult<String> {
        let request = Self::build_request(prompt, image);
        debug!(model, image_bytes = image.len(), "Sending image to Gemini");

        let response = self
            .client
            .exec_chat(model, request, None)
            .await
            .map_err(|e| PredictorError::Transport(e.to_string()))?;

        response
            .first_text()
            .map(str::to_string)
            .filter(|text| !text.trim().is_empty())
            .ok_or(PredictorError::EmptyResponse)
    }
}
