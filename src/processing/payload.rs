//! Base64 image payloads and their byte-size estimate.
//!
//! Images travel to the remote list as bare base64 text (no `data:` prefix), so the
//! budget is checked against the payload rather than the raw JPEG. The estimate
//! works from the text alone: three bytes per four characters, minus one byte per
//! trailing `=`.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

const PADDING: char = '=';

/// Estimate the decoded byte length of a base64 payload of length `L`.
///
/// Yields `L*3/4`, `L*3/4 - 1` or `L*3/4 - 2` for zero, one or two trailing
/// padding characters.
pub fn estimate_decoded_len(payload: &str) -> usize {
    let base = payload.len() * 3 / 4;
    let padding = if payload.ends_with("==") {
        2
    } else if payload.ends_with(PADDING) {
        1
    } else {
        0
    };
    base.saturating_sub(padding)
}

/// A compressed photo ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// Standard-alphabet, padded base64 of the encoded image bytes
    pub payload: String,
    /// Width the image was encoded at
    pub width: u32,
    /// Height the image was encoded at
    pub height: u32,
    /// Encoder quality in percent
    pub quality: u8,
}

impl EncodedImage {
    /// Wrap freshly encoded bytes.
    pub fn from_bytes(bytes: &[u8], width: u32, height: u32, quality: u8) -> Self {
        Self {
            payload: general_purpose::STANDARD.encode(bytes),
            width,
            height,
            quality,
        }
    }

    /// Estimated size of the encoded image in bytes.
    pub fn estimated_bytes(&self) -> usize {
        estimate_decoded_len(&self.payload)
    }

    /// Decode the payload back into the encoded image bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(&self.payload)
    }

    /// Quality as the 0.0..=1.0 fraction used when reporting attempts.
    pub fn quality_fraction(&self) -> f32 {
        self.quality as f32 / 100.0
    }
}
