use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::ConfigError;
use crate::constants::CASHGUARD_STATUS_HEADER;
use crate::image::ImageError;
use crate::predictor::PredictorError;

/// Failures that cross the service boundary. Messages are generic; the source error is only
/// attached as `details` in development mode.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Invalid request payload")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("Image data is required")]
    MissingImage,

    #[error("Invalid image data")]
    InvalidImage(#[from] ImageError),

    #[error("Server configuration error")]
    Configuration(#[from] ConfigError),

    #[error("Failed to validate image")]
    Upstream(#[from] PredictorError),
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::InvalidPayload(_)
            | GatewayError::MissingImage
            | GatewayError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            GatewayError::Configuration(_) | GatewayError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Value of the status header.
    pub fn status_label(&self) -> &'static str {
        match self {
            GatewayError::RateLimited => "rate_limited",
            GatewayError::InvalidPayload(_) => "invalid_request",
            GatewayError::MissingImage | GatewayError::InvalidImage(_) => "invalid_image",
            GatewayError::Configuration(_) => "config_error",
            GatewayError::Upstream(_) => "upstream_error",
        }
    }

    fn details(&self) -> Option<String> {
        std::error::Error::source(self).map(ToString::to_string)
    }

    pub fn to_response(&self, expose_details: bool) -> Response {
        let status = self.status_code();

        let mut headers = HeaderMap::new();
        headers.insert(
            CASHGUARD_STATUS_HEADER,
            HeaderValue::from_static(self.status_label()),
        );

        let body = Json(ErrorResponse {
            success: false,
            error: self.to_string(),
            details: if expose_details { self.details() } else { None },
        });

        (status, headers, body).into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.to_response(false)
    }
}
