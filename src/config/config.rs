//! # Configuration Module
//!
//! This module provides the client configuration shared by the CLI and the library.
//! Values come from command-line flags (with environment fallbacks) and are checked
//! once by [`ClientConfig::validate`] before anything touches the network.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `endpoint` | `String` | http(s) URL | Remote list endpoint |
//! | `session_file` | `PathBuf` | Any path | File holding the persisted session identity |
//! | `budget_bytes` | `usize` | > 0 | Per-photo compression budget |
//! | `max_attempts` | `u32` | 1-32 | Compression attempts before settling |
//! | `connect_timeout_secs` | `u64` | > 0 | TCP connect timeout |
//! | `request_timeout_secs` | `u64` | > 0 | Whole-request timeout |
//!
//! ## Examples
//!
//! ```rust
//! use field_capture::config::config::ClientConfig;
//!
//! let config = ClientConfig {
//!     endpoint: "https://lists.example.com/notfoundproductslist".to_string(),
//!     ..ClientConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.compression_options().budget_bytes, 50 * 1024);
//! ```

use std::path::PathBuf;

use crate::error::{CaptureError, CaptureResult};
use crate::processing::CompressionOptions;
use crate::processing::compression::DEFAULT_BUDGET_BYTES;

/// Configuration for a field capture client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Remote list endpoint used for both baseline fetches and submissions.
    pub endpoint: String,

    /// File holding the persisted session identity.
    pub session_file: PathBuf,

    /// Maximum estimated size of each compressed photo, in bytes.
    pub budget_bytes: usize,

    /// Number of compression attempts before the smallest candidate is accepted.
    pub max_attempts: u32,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    /// Defaults:
    /// - `endpoint`: local development server
    /// - `session_file`: `.fieldcap-session` in the working directory
    /// - `budget_bytes`: 50 KiB
    /// - `max_attempts`: 10
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/notfoundproductslist".to_string(),
            session_file: PathBuf::from(".fieldcap-session"),
            budget_bytes: DEFAULT_BUDGET_BYTES,
            max_attempts: 10,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
        }
    }
}

impl ClientConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> CaptureResult<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(CaptureError::config(
                "endpoint",
                &self.endpoint,
                "must be an http:// or https:// URL",
            ));
        }
        if self.budget_bytes == 0 {
            return Err(CaptureError::config(
                "budget_bytes",
                "0",
                "budget must be greater than 0",
            ));
        }
        if !(1..=32).contains(&self.max_attempts) {
            return Err(CaptureError::config(
                "max_attempts",
                self.max_attempts.to_string(),
                "must be between 1 and 32",
            ));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(CaptureError::config(
                "timeout",
                format!("{}/{}", self.connect_timeout_secs, self.request_timeout_secs),
                "timeouts must be greater than 0 seconds",
            ));
        }
        Ok(())
    }

    /// Compression options derived from this configuration.
    pub fn compression_options(&self) -> CompressionOptions {
        CompressionOptions {
            budget_bytes: self.budget_bytes,
            max_attempts: self.max_attempts,
            ..CompressionOptions::default()
        }
    }
}
