use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use super::backend::GenerativeBackend;
use super::error::{PredictorError, PredictorResult};
use super::gemini::GeminiBackend;
use super::types::NormalizedPrediction;
use crate::config::Config;
use crate::constants::{DEFAULT_CURRENCY, DEFAULT_DENOMINATION, DEFAULT_FEATURE};
use crate::extract::{
    ExtractedFields, ParsedFields, RawPrediction, TextField, extract_json_numeric_field,
};
use crate::image::EncodedImage;
use crate::sanitize::{Validity, clamp_confidence, clamp_print_quality, coerce_number};

/// Instruction sent with every image. Kept verbatim; the response contract depends on it.
pub const VALIDATION_PROMPT: &str = r#"Analyze this currency bill image and determine:
1. The denomination (e.g., $1, $5, $10, $20, $50, $100)
2. The currency type (e.g., USD)
3. Whether the bill appears VALID or INVALID.
4. Provide a confidence score from 0-100 for your VALID/INVALID assessment.
5. List 3-5 security features detected (e.g., watermark, security thread, color-shifting ink, microprinting, etc.)
6. Print quality assessment: Evaluate the sharpness, clarity, and printing quality of the bill.
   Provide a printQualityScore from 0-100.

Respond in JSON format:
{
  "denomination": "string",
  "currency": "string",
  "validity": "Valid" or "Invalid",
  "confidence": number (0-100),
  "features": ["feature1", "feature2", ...],
  "printQualityScore": number (0-100),
  "notes": "string (any additional observations)"
}"#;

/// Headline predictor backed by a generative vision-language model.
///
/// Upstream failures propagate; malformed output never does.
#[derive(Clone)]
pub struct PrimaryPredictor {
    backend: Option<Arc<dyn GenerativeBackend>>,
    default_model: String,
}

impl PrimaryPredictor {
    pub fn new(backend: Arc<dyn GenerativeBackend>, default_model: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            default_model: default_model.into(),
        }
    }

    /// A predictor without credentials. Every call fails with
    /// [`PredictorError::MissingCredential`].
    pub fn unconfigured(default_model: impl Into<String>) -> Self {
        Self {
            backend: None,
            default_model: default_model.into(),
        }
    }

    /// Gemini-backed predictor when `GEMINI_API_KEY` is set, unconfigured otherwise.
    pub fn from_config(config: &Config) -> Self {
        match config.gemini_api_key.as_deref() {
            Some(key) => Self::new(Arc::new(GeminiBackend::new(key)), &config.gemini_model),
            None => Self::unconfigured(&config.gemini_model),
        }
    }

    #[inline]
    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// A non-blank override wins over the configured model.
    pub fn resolve_model<'a>(&'a self, model_override: Option<&'a str>) -> &'a str {
        model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
    }

    #[instrument(skip(self, image), fields(image_bytes = image.len()))]
    pub async fn predict(
        &self,
        image: &EncodedImage,
        model_override: Option<&str>,
    ) -> PredictorResult<NormalizedPrediction> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(PredictorError::MissingCredential {
                name: Config::ENV_GEMINI_API_KEY,
            })?;
        let model = self.resolve_model(model_override);

        let text = backend.generate(model, VALIDATION_PROMPT, image).await?;
        let raw = RawPrediction::from_text(&text);
        debug!(model, parsed = raw.is_parsed(), "Primary prediction received");

        Ok(normalize(raw))
    }
}

impl std::fmt::Debug for PrimaryPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryPredictor")
            .field("configured", &self.is_configured())
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Applies defaults and bounds to either extraction path.
pub fn normalize(raw: RawPrediction) -> NormalizedPrediction {
    match raw {
        RawPrediction::Parsed(fields) => normalize_parsed(fields),
        RawPrediction::Extracted(fields) => normalize_extracted(fields),
    }
}

fn normalize_parsed(fields: ParsedFields) -> NormalizedPrediction {
    let confidence = fields
        .confidence
        .as_ref()
        .and_then(coerce_number)
        .or_else(|| {
            serde_json::to_string(&fields)
                .ok()
                .and_then(|text| extract_json_numeric_field(&text, TextField::Confidence))
        });

    // Only a real JSON number counts; "85" as a string falls back to the default.
    let print_quality = fields
        .print_quality_score
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite());

    NormalizedPrediction {
        denomination: text_or(fields.denomination.as_ref(), DEFAULT_DENOMINATION),
        currency: text_or(fields.currency.as_ref(), DEFAULT_CURRENCY),
        validity: Validity::from_value(fields.validity.as_ref()),
        confidence: clamp_confidence(confidence),
        features: features_from_value(fields.features.as_ref()),
        print_quality_score: Some(clamp_print_quality(print_quality)),
        notes: match fields.notes {
            Some(Value::String(notes)) => notes,
            _ => String::new(),
        },
    }
}

fn normalize_extracted(fields: ExtractedFields) -> NormalizedPrediction {
    NormalizedPrediction {
        denomination: fields
            .denomination
            .unwrap_or_else(|| DEFAULT_DENOMINATION.to_string()),
        currency: fields
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        validity: fields.validity,
        confidence: clamp_confidence(fields.confidence),
        features: non_empty_features(fields.features),
        print_quality_score: Some(clamp_print_quality(fields.print_quality_score)),
        notes: fields.notes,
    }
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

fn features_from_value(value: Option<&Value>) -> Vec<String> {
    let features = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    non_empty_features(features)
}

fn non_empty_features(features: Vec<String>) -> Vec<String> {
    if features.is_empty() {
        vec![DEFAULT_FEATURE.to_string()]
    } else {
        features
    }
}
