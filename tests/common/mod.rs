#![allow(dead_code)]

pub mod harness;
pub mod http_client;

/// JPEG SOI/APP0 marker bytes, enough for the decoder.
pub const JPEG_DATA_URL: &str = "data:image/jpeg;base64,/9j/4A==";
