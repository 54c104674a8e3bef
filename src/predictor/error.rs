use std::time::Duration;

use thiserror::Error;

/// Failures of a single upstream prediction call.
#[derive(Debug, Error)]
pub enum PredictorError {
    /// The adapter has no credential; only the variable name is carried.
    #[error("missing credential: {name}")]
    MissingCredential { name: &'static str },

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("classifier endpoint not found: {endpoint}")]
    EndpointNotFound { endpoint: String },

    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    #[error("upstream returned no text")]
    EmptyResponse,

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
}

pub type PredictorResult<T> = Result<T, PredictorError>;
