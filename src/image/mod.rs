//! Request-scoped image payloads.
//!
//! Accepts either a `data:<mime>;base64,<payload>` URL or raw base64 and decodes it once so
//! malformed input is rejected before any upstream call.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use thiserror::Error;

use crate::constants::DEFAULT_IMAGE_MIME;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image data is empty")]
    Empty,

    #[error("image data URL is not base64 encoded")]
    NotBase64Encoded,

    #[error("image data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Decoded still image plus its MIME type. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    mime_type: String,
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Decodes a data URL or raw base64 string.
    pub fn from_base64_payload(payload: &str) -> Result<Self, ImageError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(ImageError::Empty);
        }

        let (mime_type, data) = match payload.split_once(',') {
            Some((header, data)) if header.starts_with("data:") => {
                let mut parts = header["data:".len()..].split(';');
                let mime = parts.next().map(str::trim).unwrap_or_default();
                if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                    return Err(ImageError::NotBase64Encoded);
                }
                let mime = if mime.is_empty() {
                    DEFAULT_IMAGE_MIME
                } else {
                    mime
                };
                (mime, data)
            }
            Some((_, data)) => (DEFAULT_IMAGE_MIME, data),
            None => (DEFAULT_IMAGE_MIME, payload),
        };

        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(ImageError::Empty);
        }

        let bytes = STANDARD
            .decode(&compact)
            .or_else(|_| STANDARD_NO_PAD.decode(&compact))?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        Ok(Self::new(bytes, mime_type))
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Standard padded base64 of the image bytes, as upstream APIs expect.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}
