//! In-memory backends for tests and local runs without cloud credentials.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::backend::{ClassifierBackend, GenerativeBackend};
use super::error::{PredictorError, PredictorResult};
use super::types::Classification;
use crate::image::EncodedImage;

#[derive(Debug, Clone)]
enum GenerativeReply {
    Text(String),
    TransportError(String),
}

/// Replies with a fixed text (or transport failure) and records the requested models.
#[derive(Debug)]
pub struct MockGenerativeBackend {
    reply: GenerativeReply,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockGenerativeBackend {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::from_reply(GenerativeReply::Text(text.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_reply(GenerativeReply::TransportError(message.into()))
    }

    fn from_reply(reply: GenerativeReply) -> Self {
        Self {
            reply,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Models requested so far, in call order.
    pub fn requested_models(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl GenerativeBackend for MockGenerativeBackend {
    async fn generate(
        &self,
        model: &str,
        _prompt: &str,
        _image: &EncodedImage,
    ) -> PredictorResult<String> {
        self.calls.lock().push(model.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            GenerativeReply::Text(text) => Ok(text.clone()),
            GenerativeReply::TransportError(message) => {
                Err(PredictorError::Transport(message.clone()))
            }
        }
    }
}

#[derive(Debug, Clone)]
enum ClassifierReply {
    Label(Classification),
    Empty,
    NotFound,
    TransportError(String),
}

/// Replies with a fixed classification or a canned failure.
#[derive(Debug)]
pub struct MockClassifierBackend {
    reply: ClassifierReply,
    delay: Option<Duration>,
    calls: Mutex<usize>,
}

impl MockClassifierBackend {
    pub fn with_label(label: impl Into<String>, score: Option<f64>) -> Self {
        Self::from_reply(ClassifierReply::Label(Classification {
            label: label.into(),
            score,
        }))
    }

    pub fn empty() -> Self {
        Self::from_reply(ClassifierReply::Empty)
    }

    pub fn not_found() -> Self {
        Self::from_reply(ClassifierReply::NotFound)
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_reply(ClassifierReply::TransportError(message.into()))
    }

    fn from_reply(reply: ClassifierReply) -> Self {
        Self {
            reply,
            delay: None,
            calls: Mutex::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ClassifierBackend for MockClassifierBackend {
    async fn classify(&self, _image: &EncodedImage) -> PredictorResult<Option<Classification>> {
        *self.calls.lock() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            ClassifierReply::Label(classification) => Ok(Some(classification.clone())),
            ClassifierReply::Empty => Ok(None),
            ClassifierReply::NotFound => Err(PredictorError::EndpointNotFound {
                endpoint: "projects/mock/locations/mock/endpoints/0".to_string(),
            }),
            ClassifierReply::TransportError(message) => {
                Err(PredictorError::Transport(message.clone()))
            }
        }
    }
}
