//! Wire schemas for the remote list.
//!
//! Responses are decoded into these types before anything downstream looks at them;
//! a body that does not match is rejected as a network error at the boundary.

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, CaptureResult};

/// Body of a successful baseline fetch: `{"data": [...]}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BaselineResponse {
    pub data: Vec<serde_json::Value>,
}

impl BaselineResponse {
    /// Decode a baseline body, rejecting anything without a `data` array.
    pub fn parse(body: &str) -> CaptureResult<Self> {
        serde_json::from_str(body).map_err(|e| {
            CaptureError::network("fetch baseline")
                .with_reason("response does not contain a 'data' array")
                .with_source(e)
        })
    }

    pub fn count(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Body of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Session identifier the record belongs to
    pub folder_name: String,
    /// 1-based position as a decimal string
    pub row: String,
    /// Operator barcode or synthetic identifier
    pub barcode: String,
    /// Bare base64 of the front photo, empty when absent
    pub front_image: String,
    /// Bare base64 of the back photo, empty when absent
    pub back_image: String,
}

/// Acknowledgement of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitAck {
    pub status: u16,
    /// Response body; kept verbatim as a JSON string when it is not JSON
    pub body: serde_json::Value,
}

impl SubmitAck {
    pub fn from_body(status: u16, body: &str) -> Self {
        let body = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(body)
                .unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
        };
        Self { status, body }
    }
}
