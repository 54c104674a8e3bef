use serde::{Deserialize, Serialize};

use crate::reconcile::ReconciledResult;

/// Body of `POST /api/validate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Generative model override.
    #[serde(default)]
    pub model: Option<String>,
}

impl ValidateRequest {
    /// `None` for a missing, null or blank image.
    pub fn image_payload(&self) -> Option<&str> {
        self.image_base64
            .as_deref()
            .filter(|payload| !payload.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub result: ReconciledResult,
}

impl ValidateResponse {
    pub fn new(result: ReconciledResult) -> Self {
        Self {
            success: true,
            result,
        }
    }
}
