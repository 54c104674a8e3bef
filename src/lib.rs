//! Cashguard library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! The exports are organized by module:
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`EncodedImage`] - Decoded request image
//! - [`Reconciler`], [`ReconciledResult`] - Validation entry point and its output
//!
//! ## Prediction
//! - [`PrimaryPredictor`] - Generative model adapter (headline verdict)
//! - [`SecondaryPredictor`] - Image classifier adapter (corroborating signal)
//! - [`GenerativeBackend`], [`ClassifierBackend`] - Upstream seams
//! - [`RawPrediction`], [`parse_strict`], [`extract_loose`] - Tolerant response reading
//! - [`Validity`], [`clamp_percent`] - Bounded verdicts and percentages
//!
//! ## Admission
//! - [`AdmissionControl`], [`InMemoryRateLimiter`] - Per-client rate limiting
//!
//! ## Test/Mock Support
//! Mock backends are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod extract;
pub mod gateway;
pub mod hashing;
pub mod image;
pub mod predictor;
pub mod ratelimit;
pub mod reconcile;
pub mod sanitize;

pub use config::{Config, ConfigError, Environment, VertexSettings};
pub use extract::{
    ExtractedFields, ParseError, ParsedFields, RawPrediction, extract_loose, parse_strict,
};
pub use hashing::{client_log_id, hash_client_key, hash_to_u64};
pub use image::{EncodedImage, ImageError};
pub use predictor::{
    Classification, ClassifierBackend, ClassifierVerdict, GeminiBackend, GenerativeBackend,
    NormalizedPrediction, PredictorError, PredictorResult, PrimaryPredictor, SecondaryPrediction,
    SecondaryPredictor, VertexBackend,
};
#[cfg(any(test, feature = "mock"))]
pub use predictor::{MockClassifierBackend, MockGenerativeBackend};
pub use ratelimit::{
    AdmissionControl, InMemoryRateLimiter, RateLimitConfig, RateLimitRecord, client_key,
};
pub use reconcile::{ReconciledResult, Reconciler};
pub use sanitize::{Validity, clamp_confidence, clamp_percent, clamp_print_quality};
