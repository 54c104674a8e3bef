//! Cross-cutting, shared constants.
//!
//! Defaults applied when an upstream prediction is missing or unusable live here so the
//! sanitizer, the extractor and both adapters agree on them.

/// Confidence used when the generative model gives nothing numeric.
pub const DEFAULT_CONFIDENCE: u8 = 75;

/// Print-quality score used when the generative model omits it.
pub const DEFAULT_PRINT_QUALITY: u8 = 70;

/// Denomination reported when none can be recovered.
pub const DEFAULT_DENOMINATION: &str = "$20";

/// Currency reported when none can be recovered.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Single feature reported when no known security feature is found.
pub const DEFAULT_FEATURE: &str = "Security features detected";

/// Number of characters of raw model text kept as notes on the fallback path.
pub const FALLBACK_NOTES_CHARS: usize = 200;

/// Upper bound of every materialised percentage.
pub const PERCENT_MAX: u8 = 100;

/// Default generative model identifier.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";

/// MIME type assumed for raw (non data-URL) base64 payloads.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Classifier inference parameter: minimum score for a returned label.
pub const CLASSIFIER_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Classifier inference parameter: maximum labels returned.
pub const CLASSIFIER_MAX_PREDICTIONS: u32 = 5;

/// Default admission window length.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default admitted calls per key per window.
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 10;

/// Default bound on tracked client keys.
pub const DEFAULT_RATE_LIMIT_MAX_KEYS: u64 = 100_000;

/// Default deadline applied to each upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Bucket shared by every client that presents no address headers.
pub const UNKNOWN_CLIENT_KEY: &str = "unknown";

/// Service name reported by the health endpoints.
pub const SERVICE_NAME: &str = "cashguard";

/// Largest accepted request body. Base64 inflates images by a third.
pub const MAX_REQUEST_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Response header carrying the outcome of a request.
pub const CASHGUARD_STATUS_HEADER: &str = "x-cashguard-status";
pub const CASHGUARD_STATUS_HEALTHY: &str = "healthy";
pub const CASHGUARD_STATUS_READY: &str = "ready";
pub const CASHGUARD_STATUS_NOT_READY: &str = "not_ready";
pub const CASHGUARD_STATUS_VALIDATED: &str = "validated";
