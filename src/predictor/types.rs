use serde::{Serialize, Serializer};

use crate::sanitize::{Validity, clamp_percent};

/// Bounded, UI-ready output of the generative model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPrediction {
    pub denomination: String,
    pub currency: String,
    pub validity: Validity,
    /// `0..=100`.
    pub confidence: u8,
    pub features: Vec<String>,
    /// `0..=100` when present.
    pub print_quality_score: Option<u8>,
    pub notes: String,
}

/// Top-ranked label and probability returned by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    /// Probability in `0..=1`; `None` when the classifier reported none.
    pub score: Option<f64>,
}

/// Classifier verdict. The classifier taxonomy is open, so unknown labels survive as
/// upper-cased text instead of being forced into [`Validity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierVerdict {
    Valid,
    Invalid,
    Other(String),
}

impl ClassifierVerdict {
    /// `real`/`valid` → Valid, `fake`/`invalid`/`counterfeit` → Invalid, empty → `None`,
    /// anything else upper-cased.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            "" => None,
            "real" | "valid" => Some(ClassifierVerdict::Valid),
            "fake" | "invalid" | "counterfeit" => Some(ClassifierVerdict::Invalid),
            _ => Some(ClassifierVerdict::Other(normalized.to_uppercase())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClassifierVerdict::Valid => Validity::Valid.as_str(),
            ClassifierVerdict::Invalid => Validity::Invalid.as_str(),
            ClassifierVerdict::Other(label) => label,
        }
    }

    /// `true` when this verdict names the same outcome as `validity`.
    pub fn agrees_with(&self, validity: Validity) -> bool {
        self.as_str() == validity.as_str()
    }
}

impl std::fmt::Display for ClassifierVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ClassifierVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Normalized classifier output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryPrediction {
    /// `None` when the classifier returned an empty label.
    pub validity: Option<ClassifierVerdict>,
    /// Percentage; `None` when the classifier reported no probability.
    pub confidence: Option<u8>,
}

impl SecondaryPrediction {
    pub fn from_classification(classification: &Classification) -> Self {
        Self {
            validity: ClassifierVerdict::from_label(&classification.label),
            confidence: probability_to_percent(classification.score),
        }
    }
}

/// `round(p × 100)` clamped to `0..=100`. Absence stays absent rather than becoming a
/// midpoint.
pub fn probability_to_percent(probability: Option<f64>) -> Option<u8> {
    probability
        .map(|p| p * 100.0)
        .filter(|p| p.is_finite())
        .map(|p| clamp_percent(p, 0))
}
