//! Image decoding from uploads and base64 data URIs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;

use crate::error::{VisionError, VisionResult};

/// Return the payload of a data URI, i.e. everything after the first comma.
///
/// The header (`data:image/jpeg;base64`) is not validated.
pub fn split_data_uri(uri: &str) -> VisionResult<&str> {
    uri.split_once(',')
        .map(|(_, payload)| payload)
        .ok_or_else(|| VisionError::InvalidDataUri("missing ',' after header".to_string()))
}

/// Decode a standard-alphabet base64 payload.
///
/// ASCII whitespace anywhere in the payload is ignored, so line-wrapped
/// (MIME style) encodings are accepted.
pub fn decode_base64_payload(payload: &str) -> VisionResult<Vec<u8>> {
    let compact: String = payload.split_ascii_whitespace().collect();
    STANDARD
        .decode(compact)
        .map_err(|e| VisionError::InvalidBase64(e.to_string()))
}

/// Extract the raw image bytes carried by a data URI.
pub fn decode_data_uri(uri: &str) -> VisionResult<Vec<u8>> {
    decode_base64_payload(split_data_uri(uri)?)
}

/// Decode an encoded image (JPEG, PNG, ...), guessing the format from its bytes.
pub fn decode_image(bytes: &[u8]) -> VisionResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(VisionError::decode("empty image"));
    }

    image::load_from_memory(bytes).map_err(|e| VisionError::decode(e.to_string()))
}
