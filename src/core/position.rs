//! Position reconciliation against a remote, append-only list.
//!
//! The remote list hands out no identifiers, so the client derives each record's
//! 1-based position from the last observed remote count plus the record's local
//! index. Both functions here are pure and are evaluated at submission time.
//!
//! Positions are only distinct while the baseline stays put and no other client
//! writes to the same list. Nothing here detects a baseline that moved underneath
//! an unsent record.

use serde::{Deserialize, Serialize};

use crate::core::record::CaptureRecord;

/// Prefix of identifiers synthesized for records without a barcode.
pub const SYNTHETIC_PREFIX: &str = "INDEX_";

/// Count of records already persisted remotely at the last successful fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteBaseline(u64);

impl RemoteBaseline {
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    pub fn count(&self) -> u64 {
        self.0
    }

    /// Position of the record at `local_index` against this baseline.
    pub fn position_of(&self, local_index: usize) -> u64 {
        position(self.0, local_index)
    }
}

/// 1-based remote position: `baseline + local_index + 1`.
pub fn position(baseline: u64, local_index: usize) -> u64 {
    baseline + local_index as u64 + 1
}

/// Identifier sent for a record, and whether it was synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentifier {
    pub value: String,
    pub synthetic: bool,
}

/// Synthetic identifier for `position`, e.g. `INDEX_8`.
pub fn synthetic_identifier(position: u64) -> String {
    format!("{SYNTHETIC_PREFIX}{position}")
}

/// The record's barcode when it is non-blank, otherwise the synthetic identifier.
pub fn resolve_identifier(record: &CaptureRecord, position: u64) -> ResolvedIdentifier {
    match record.operator_barcode() {
        Some(code) => ResolvedIdentifier {
            value: code.to_string(),
            synthetic: false,
        },
        None => ResolvedIdentifier {
            value: synthetic_identifier(position),
            synthetic: true,
        },
    }
}
