// src/engine/io.rs
//
// Payload I/O: base64 / data-URI transport encoding for request and
// response images.

use crate::error::MockupError;
use base64::{engine::general_purpose, Engine as _};

type IoResult<T> = std::result::Result<T, MockupError>;

/// Strip an optional `scheme,` prefix (e.g. `data:image/png;base64,`).
///
/// Everything up to and including the first comma is dropped.
pub fn strip_data_uri(data: &str) -> &str {
    match data.split_once(',') {
        Some((_, payload)) => payload,
        None => data,
    }
}

/// Decode a request image field. `field` only feeds the error message.
pub fn decode_payload(field: &'static str, data: &str) -> IoResult<Vec<u8>> {
    let payload = strip_data_uri(data).trim();
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| MockupError::invalid_payload(field, e.to_string()))
}

pub fn encode_payload(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}
