//! Upstream predictor adapters.
//!
//! - [`PrimaryPredictor`]: generative model, authoritative, failures propagate.
//! - [`SecondaryPredictor`]: image classifier, corroborating, failures become `None`.
//!
//! Both sit on backend traits ([`GenerativeBackend`], [`ClassifierBackend`]) so the
//! normalization logic is tested without network access.

pub mod backend;
pub mod error;
pub mod gemini;
pub mod primary;
pub mod secondary;
pub mod types;
pub mod vertex;

#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use backend::{ClassifierBackend, GenerativeBackend};
pub use error::{PredictorError, PredictorResult};
pub use gemini::GeminiBackend;
pub use primary::{PrimaryPredictor, VALIDATION_PROMPT, normalize};
pub use secondary::SecondaryPredictor;
pub use types::{
    Classification, ClassifierVerdict, NormalizedPrediction, SecondaryPrediction,
    probability_to_percent,
};
pub use vertex::VertexBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockClassifierBackend, MockGenerativeBackend};
