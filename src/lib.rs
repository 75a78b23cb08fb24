//! # Field Capture Client
//!
//! Client core for field data collection: an operator works through physical
//! products, capturing a barcode plus a front and a back photo for each, and submits
//! every record to a remote list that grows by append.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `processing`: Budgeted photo compression (resize + JPEG + base64)
//! - `core`: Capture records, position reconciliation, and the row buffer
//! - `sync`: The remote list contract and its HTTP client
//! - `capture`: Device interfaces (scanner, camera, editor) and console devices
//! - `session`: The capture coordinator state machine
//! - `config`: Client configuration and the persisted session identity
//! - `logging`: `tracing` subscriber setup
//!
//! ## Positions
//!
//! The remote list assigns no identifiers. Each record is written at
//! `baseline + local_index + 1`, where the baseline is the remote count observed
//! at the last fetch. Records without a barcode are sent as `INDEX_<position>`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use field_capture::config::{ClientConfig, SessionIdentity};
//! use field_capture::processing::CompressionEngine;
//! use field_capture::session::CaptureCoordinator;
//! use field_capture::sync::HttpRemoteSync;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let session = SessionIdentity::load(&config.session_file)?;
//! let remote = Arc::new(HttpRemoteSync::from_config(&config)?);
//! let engine = CompressionEngine::jpeg(config.compression_options());
//!
//! let mut coordinator = CaptureCoordinator::start(session, remote, engine).await?;
//! let receipt = coordinator.submit(0).await?;
//! println!("stored as {} at row {}", receipt.identifier.value, receipt.position);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod processing;
pub mod session;
pub mod sync;

/// Re-export error types for convenience
pub use error::{CaptureError, CaptureResult, HasRecoverySuggestion, HasSeverity, Retryable};

pub use crate::core::position::{RemoteBaseline, position, resolve_identifier};
pub use crate::core::record::{CaptureRecord, ImageSide};
pub use crate::core::row_buffer::RowBuffer;
pub use processing::{CompressionEngine, CompressionOptions, CompressionOutcome, EncodedImage};
pub use session::{CaptureCoordinator, CaptureState};
pub use sync::{HttpRemoteSync, RemoteSync};

/// Compress one raw photo with the default schedule and the given budget.
///
/// # Examples
///
/// ```rust,no_run
/// let raw = std::fs::read("front.jpg").unwrap();
/// let outcome = field_capture::compress_photo(&raw, 50 * 1024).unwrap();
/// if let Some(miss) = outcome.budget_miss {
///     eprintln!("kept {} bytes over budget", miss.achieved_bytes - miss.budget_bytes);
/// }
/// ```
pub fn compress_photo(raw: &[u8], budget_bytes: usize) -> CaptureResult<CompressionOutcome> {
    CompressionEngine::jpeg(CompressionOptions::with_budget(budget_bytes)).compress(raw)
}
