//! # Processing Module
//!
//! Image compression for captured photos: the budget-driven attempt loop, the codec
//! seam it drives, and the base64 payloads it produces.

pub mod codec;
pub mod compression;
pub mod payload;

// Re-export commonly used types for convenience
pub use codec::{ImageCodec, JpegCodec};
pub use compression::{
    Attempt, BudgetMiss, CompressionEngine, CompressionOptions, CompressionOutcome,
    attempt_schedule,
};
pub use payload::{EncodedImage, estimate_decoded_len};
