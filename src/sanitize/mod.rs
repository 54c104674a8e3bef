//! Clamping and coercion of untrusted numeric and enum-like fields.
//!
//! Every function here is total: unusable input resolves to the caller's default, never to
//! an error. Percentages are materialised as `u8` in `0..=100`.


use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_CONFIDENCE, DEFAULT_PRINT_QUALITY, PERCENT_MAX};

/// Two-valued authenticity verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Validity {
    Valid,
    Invalid,
}

impl Validity {
    /// Maps any label to a verdict: a case-insensitive "invalid" anywhere means `Invalid`.
    pub fn from_label(label: &str) -> Self {
        if label.to_lowercase().contains("invalid") {
            Validity::Invalid
        } else {
            Validity::Valid
        }
    }

    /// Like [`Validity::from_label`], but non-string values resolve to `Valid`.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(label)) => Self::from_label(label),
            _ => Validity::Valid,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Validity::Valid => "Valid",
            Validity::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounds to the nearest integer and clamps into `0..=100`; non-finite input yields `default`.
#[inline]
pub fn clamp_percent(value: f64, default: u8) -> u8 {
    if !value.is_finite() {
        return default.min(PERCENT_MAX);
    }
    value.round().clamp(0.0, f64::from(PERCENT_MAX)) as u8
}

/// [`clamp_percent`] with the confidence default (75) for absent input.
#[inline]
pub fn clamp_confidence(value: Option<f64>) -> u8 {
    value.map_or(DEFAULT_CONFIDENCE, |v| clamp_percent(v, DEFAULT_CONFIDENCE))
}

/// [`clamp_percent`] with the print-quality default (70) for absent input.
#[inline]
pub fn clamp_print_quality(value: Option<f64>) -> u8 {
    value.map_or(DEFAULT_PRINT_QUALITY, |v| {
        clamp_percent(v, DEFAULT_PRINT_QUALITY)
    })
}

/// Accepts JSON numbers and numeric strings (leading-number semantics, so `"88%"` is 88).
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
}

/// Coerces a loosely typed field into a percentage, falling back to `default`.
pub fn coerce_percent(value: Option<&Value>, default: u8) -> u8 {
    value
        .and_then(coerce_number)
        .map_or(default.min(PERCENT_MAX), |v| clamp_percent(v, default))
}

static FLOAT_PREFIX: OnceLock<Regex> = OnceLock::new();

fn float_prefix_regex() -> &'static Regex {
    FLOAT_PREFIX.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?")
            .expect("FLOAT_PREFIX is valid")
    })
}

/// Parses the longest numeric prefix of `text` after leading whitespace.
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let m = float_prefix_regex().find(text.trim_start())?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}
