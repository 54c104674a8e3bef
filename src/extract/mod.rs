//! Tolerant reading of generative-model output.
//!
//! Two independent stages:
//!
//! 1. [`parse_strict`] tries a fenced ```` ```json ```` block, the outermost brace-delimited
//!    span, then the whole text, and keeps the first that parses as a JSON object.
//! 2. [`extract_loose`] recovers the same fields from prose with per-field patterns. It never
//!    fails; every field resolves to a value or an explicit `None`.
//!
//! [`RawPrediction::from_text`] runs stage 2 only when stage 1 fails, and the result is
//! resolved into a typed variant once, at the adapter boundary.
//!
//! # Known limitation
//!
//! The loose validity heuristic flags any mention of "invalid", including negations such as
//! "shows no signs of being invalid". This mirrors the production behaviour and is kept on
//! purpose until product intent says otherwise.

pub mod error;


pub use error::ParseError;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::constants::{DEFAULT_FEATURE, FALLBACK_NOTES_CHARS};
use crate::sanitize::Validity;

/// Security features recognised in prose, in reporting order.
pub const FEATURE_KEYWORDS: [&str; 8] = [
    "watermark",
    "security thread",
    "color-shifting",
    "microprinting",
    "serial number",
    "portrait",
    "seal",
    "signature",
];

/// Fields of a response that parsed as a JSON object. Values stay loosely typed until the
/// adapter validates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denomination: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_quality_score: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
}

/// Fields recovered from prose when no JSON object could be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub denomination: Option<String>,
    pub currency: Option<String>,
    pub validity: Validity,
    pub confidence: Option<f64>,
    pub features: Vec<String>,
    pub print_quality_score: Option<f64>,
    pub notes: String,
}

/// A model response resolved to exactly one extraction path.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPrediction {
    Parsed(ParsedFields),
    Extracted(ExtractedFields),
}

impl RawPrediction {
    /// Strict parse first; loose extraction only on failure.
    pub fn from_text(text: &str) -> Self {
        match parse_strict(text) {
            Ok(fields) => RawPrediction::Parsed(fields),
            Err(e) => {
                warn!(error = %e, "Model response is not a JSON object, using text fallback");
                RawPrediction::Extracted(extract_loose(text))
            }
        }
    }

    #[inline]
    pub fn is_parsed(&self) -> bool {
        matches!(self, RawPrediction::Parsed(_))
    }
}

/// Keys recoverable by pattern from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Denomination,
    Currency,
    Confidence,
    PrintQualityScore,
}

impl TextField {
    #[inline]
    pub fn key(self) -> &'static str {
        match self {
            TextField::Denomination => "denomination",
            TextField::Currency => "currency",
            TextField::Confidence => "confidence",
            TextField::PrintQualityScore => "printQualityScore",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, TextField::Confidence | TextField::PrintQualityScore)
    }

    fn pattern(self) -> &'static Regex {
        static PATTERNS: [OnceLock<Regex>; 4] = [const { OnceLock::new() }; 4];
        PATTERNS[self as usize].get_or_init(|| {
            let key = regex::escape(self.key());
            let value = if self.is_numeric() {
                r#""?(\d+(?:\.\d+)?)"#
            } else {
                r#"(?:"([^"]+)"|([^\s,;"}\]]+))"#
            };
            Regex::new(&format!(r#"(?i)"?\b{key}\b"?\s*[:=]\s*{value}"#))
                .expect("field pattern is valid")
        })
    }

    /// Numeric value of the exact JSON key `"key": n`. Prose mentions do not match.
    fn quoted_pattern(self) -> &'static Regex {
        static PATTERNS: [OnceLock<Regex>; 4] = [const { OnceLock::new() }; 4];
        PATTERNS[self as usize].get_or_init(|| {
            let key = regex::escape(self.key());
            Regex::new(&format!(r#""{key}"\s*:\s*(\d+(?:\.\d+)?)"#))
                .expect("quoted field pattern is valid")
        })
    }
}

static FENCED_JSON: OnceLock<Regex> = OnceLock::new();
static BRACED_SPAN: OnceLock<Regex> = OnceLock::new();

fn fenced_json_regex() -> &'static Regex {
    FENCED_JSON.get_or_init(|| {
        Regex::new(r"(?s)```(?i:json)\s*(.*?)\s*```").expect("FENCED_JSON is valid")
    })
}

fn braced_span_regex() -> &'static Regex {
    BRACED_SPAN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("BRACED_SPAN is valid"))
}

/// JSON candidates in `text`, most specific first: a ```` ```json ```` block, the span from
/// the first `{` to the last `}`, then the whole text.
fn json_candidates(text: &str) -> impl Iterator<Item = &str> {
    let fenced = fenced_json_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    let braced = braced_span_regex().find(text).map(|m| m.as_str());
    fenced
        .into_iter()
        .chain(braced)
        .chain(std::iter::once(text))
}

/// Returns the most likely JSON candidate in `text`: a ```` ```json ```` block, else the span
/// from the first `{` to the last `}`, else the whole text.
pub fn locate_json(text: &str) -> &str {
    json_candidates(text).next().unwrap_or(text)
}

/// Parses the first JSON candidate of `text` that holds an object into [`ParsedFields`].
///
/// Fails with the error of the most specific candidate when none parses.
pub fn parse_strict(text: &str) -> Result<ParsedFields, ParseError> {
    let mut first_err = None;
    for candidate in json_candidates(text) {
        match parse_object(candidate) {
            Ok(fields) => return Ok(fields),
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }
    Err(first_err.unwrap_or(ParseError::NotAnObject { found: "nothing" }))
}

fn parse_object(candidate: &str) -> Result<ParsedFields, ParseError> {
    let value: Value = serde_json::from_str(candidate)?;
    if !value.is_object() {
        return Err(ParseError::NotAnObject {
            found: json_kind(&value),
        });
    }
    Ok(ParsedFields::deserialize(value)?)
}

/// Recovers every field from prose. Never fails.
pub fn extract_loose(text: &str) -> ExtractedFields {
    ExtractedFields {
        denomination: extract_string_field(text, TextField::Denomination),
        currency: extract_string_field(text, TextField::Currency),
        validity: Validity::from_label(text),
        confidence: extract_numeric_field(text, TextField::Confidence),
        features: extract_features(text),
        print_quality_score: extract_numeric_field(text, TextField::PrintQualityScore),
        notes: text.chars().take(FALLBACK_NOTES_CHARS).collect(),
    }
}

/// Value following `key:` (quoted, or a bare token such as `$50`).
pub fn extract_string_field(text: &str, field: TextField) -> Option<String> {
    let caps = field.pattern().captures(text)?;
    if let Some(quoted) = caps.get(1) {
        return Some(quoted.as_str().to_string());
    }
    let bare = caps.get(2)?.as_str().trim_end_matches(['.', ':']);
    (!bare.is_empty() && !bare.eq_ignore_ascii_case("null")).then(|| bare.to_string())
}

/// Numeric literal following `key:`.
pub fn extract_numeric_field(text: &str, field: TextField) -> Option<f64> {
    let caps = field.pattern().captures(text)?;
    caps.get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Numeric value of the quoted JSON key `"key": n` in serialized JSON.
pub fn extract_json_numeric_field(text: &str, field: TextField) -> Option<f64> {
    let caps = field.quoted_pattern().captures(text)?;
    caps.get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Known security features mentioned anywhere in `text`, in keyword order, capitalised.
pub fn extract_features(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let found: Vec<String> = FEATURE_KEYWORDS
        .iter()
        .filter(|keyword| lowered.contains(*keyword))
        .map(|keyword| capitalize(keyword))
        .collect();

    if found.is_empty() {
        vec![DEFAULT_FEATURE.to_string()]
    } else {
        found
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
