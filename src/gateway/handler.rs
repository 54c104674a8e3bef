use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{Config, ConfigError};
use crate::constants::{CASHGUARD_STATUS_HEADER, CASHGUARD_STATUS_VALIDATED};
use crate::gateway::error::GatewayError;
use crate::gateway::payload::{ValidateRequest, ValidateResponse};
use crate::gateway::state::HandlerState;
use crate::hashing::client_log_id;
use crate::image::EncodedImage;
use crate::ratelimit::client_key;

#[instrument(
    skip(state, headers, body),
    fields(request_id = %uuid::Uuid::new_v4(), client = tracing::field::Empty)
)]
pub async fn validate_handler(
    State(state): State<HandlerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match validate(&state, &headers, &body).await {
        Ok(response) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                CASHGUARD_STATUS_HEADER,
                HeaderValue::from_static(CASHGUARD_STATUS_VALIDATED),
            );
            (StatusCode::OK, headers, Json(response)).into_response()
        }
        Err(e) => {
            log_failure(&e);
            e.to_response(state.expose_details)
        }
    }
}

async fn validate(
    state: &HandlerState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ValidateResponse, GatewayError> {
    let client = client_key(headers);
    tracing::Span::current().record("client", client_log_id(&client).as_str());

    if !state.admission.check_admission(&client).await {
        return Err(GatewayError::RateLimited);
    }

    let request = parse_request(body)?;
    let payload = request.image_payload().ok_or(GatewayError::MissingImage)?;
    let image = EncodedImage::from_base64_payload(payload)?;
    debug!(
        image_bytes = image.len(),
        mime_type = image.mime_type(),
        "Image decoded"
    );

    let primary = state.reconciler.primary();
    if !primary.is_configured() {
        return Err(ConfigError::MissingEnvVar {
            name: Config::ENV_GEMINI_API_KEY,
        }
        .into());
    }

    let result = state
        .reconciler
        .reconcile(&image, request.model.as_deref())
        .await?;

    info!(
        validity = %result.validity(),
        confidence = result.confidence(),
        "Image validated"
    );
    Ok(ValidateResponse::new(result))
}

/// A JSON `null` body is an empty request, not a malformed one.
fn parse_request(body: &[u8]) -> Result<ValidateRequest, GatewayError> {
    serde_json::from_slice::<Option<ValidateRequest>>(body)
        .map(Option::unwrap_or_default)
        .map_err(GatewayError::InvalidPayload)
}

fn log_failure(e: &GatewayError) {
    match e {
        GatewayError::RateLimited => warn!("Rate limit exceeded"),
        GatewayError::InvalidPayload(source) => {
            debug!(error = %source, "Rejected malformed request body")
        }
        GatewayError::MissingImage => debug!("Rejected request without image"),
        GatewayError::InvalidImage(source) => debug!(error = %source, "Rejected undecodable image"),
        GatewayError::Configuration(source) => error!(error = %source, "Primary predictor is not configured"),
        GatewayError::Upstream(source) => error!(error = %source, "Validation failed"),
    }
}
