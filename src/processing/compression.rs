//! # Budget-Driven Compression
//!
//! Drives a captured photo under a byte budget by re-encoding it with a shrinking
//! width and a falling quality until the base64 payload fits.
//!
//! ## Attempt Schedule
//!
//! Attempt `n` (0-indexed) uses `width = max(min_width, initial_width / 2^n)` and
//! `quality = max(min_quality, initial_quality - n * quality_step)`. With the
//! defaults that is `(2400, 0.5), (1200, 0.4), (600, 0.3), (300, 0.2), (150, 0.1),
//! (100, 0.1), ...` for at most ten attempts. Quality is held in whole percent so
//! the sequence is exact and reproducible.
//!
//! ## Budget Misses
//!
//! When no attempt fits, the last candidate is returned together with a
//! [`BudgetMiss`] and a warning is logged. The capture still goes ahead with the
//! best-effort image.

use tracing::{debug, warn};

use crate::error::{CaptureError, CaptureResult, ErrorSeverity};
use crate::processing::codec::{ImageCodec, JpegCodec};
use crate::processing::payload::EncodedImage;

/// Budget used by the field client when nothing else is configured: 50 KiB.
pub const DEFAULT_BUDGET_BYTES: usize = 50 * 1024;

/// Tuning for the attempt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Maximum acceptable estimated payload size in bytes
    pub budget_bytes: usize,
    /// Number of encode attempts before settling for the last candidate
    pub max_attempts: u32,
    /// Width of the first attempt
    pub initial_width: u32,
    /// Width never goes below this
    pub min_width: u32,
    /// Quality of the first attempt, in percent
    pub initial_quality: u8,
    /// Quality drop per attempt, in percent
    pub quality_step: u8,
    /// Quality never goes below this, in percent
    pub min_quality: u8,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            budget_bytes: DEFAULT_BUDGET_BYTES,
            max_attempts: 10,
            initial_width: 2400,
            min_width: 100,
            initial_quality: 50,
            quality_step: 10,
            min_quality: 10,
        }
    }
}

impl CompressionOptions {
    /// Defaults with a different budget.
    pub fn with_budget(budget_bytes: usize) -> Self {
        Self {
            budget_bytes,
            ..Self::default()
        }
    }
}

/// One `(width, quality)` pair from the attempt schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 0-based attempt number
    pub index: u32,
    pub width: u32,
    /// Quality in percent
    pub quality: u8,
}

impl Attempt {
    /// Quality as a 0.0..=1.0 fraction.
    pub fn quality_fraction(&self) -> f32 {
        self.quality as f32 / 100.0
    }
}

/// The full, deterministic attempt schedule for `options`.
pub fn attempt_schedule(options: &CompressionOptions) -> impl Iterator<Item = Attempt> + use<> {
    let opts = *options;
    let mut width = opts.initial_width.max(opts.min_width);
    let mut quality = opts.initial_quality.max(opts.min_quality);
    (0..opts.max_attempts).map(move |index| {
        let attempt = Attempt {
            index,
            width,
            quality,
        };
        width = (width / 2).max(opts.min_width);
        quality = quality.saturating_sub(opts.quality_step).max(opts.min_quality);
        attempt
    })
}

/// Degraded-result signal: the budget was not reached within the allotted attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetMiss {
    pub budget_bytes: usize,
    pub achieved_bytes: usize,
}

impl BudgetMiss {
    /// The miss as a warning-level error, for surfaces that report it to the operator.
    pub fn warning(&self) -> CaptureError {
        CaptureError::compression(
            "compress photo",
            format!(
                "best candidate is ~{} bytes, over the {} byte budget",
                self.achieved_bytes, self.budget_bytes
            ),
        )
        .with_severity(ErrorSeverity::Warning)
        .with_recovery_suggestion("Retake the photo with less background if the size matters")
    }
}

/// Result of compressing one photo.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    /// Accepted candidate, or the last one tried on a budget miss
    pub image: EncodedImage,
    /// Every attempt made, in order
    pub attempts: Vec<Attempt>,
    /// Set when the returned image is over budget
    pub budget_miss: Option<BudgetMiss>,
}

impl CompressionOutcome {
    /// True when the returned image fits the budget.
    pub fn within_budget(&self) -> bool {
        self.budget_miss.is_none()
    }
}

/// Adaptive compressor wrapping an [`ImageCodec`].
#[derive(Debug, Clone)]
pub struct CompressionEngine<C: ImageCodec = JpegCodec> {
    codec: C,
    options: CompressionOptions,
}

impl CompressionEngine<JpegCodec> {
    /// JPEG engine with the given options.
    pub fn jpeg(options: CompressionOptions) -> Self {
        Self::new(JpegCodec, options)
    }
}

impl<C: ImageCodec> CompressionEngine<C> {
    pub fn new(codec: C, options: CompressionOptions) -> Self {
        Self { codec, options }
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    /// Compress `raw` under the configured budget.
    pub fn compress(&self, raw: &[u8]) -> CaptureResult<CompressionOutcome> {
        self.compress_with_budget(raw, self.options.budget_bytes)
    }

    /// Compress `raw` under `budget_bytes`, keeping the rest of the configured schedule.
    pub fn compress_with_budget(
        &self,
        raw: &[u8],
        budget_bytes: usize,
    ) -> CaptureResult<CompressionOutcome> {
        if self.options.max_attempts == 0 {
            return Err(CaptureError::config(
                "max_attempts",
                "0",
                "at least one compression attempt is required",
            ));
        }

        let source = self.codec.decode(raw)?;
        let mut attempts = Vec::with_capacity(self.options.max_attempts as usize);
        let mut last: Option<EncodedImage> = None;

        for attempt in attempt_schedule(&self.options) {
            let frame = self.codec.encode(&source, attempt.width, attempt.quality)?;
            let image =
                EncodedImage::from_bytes(&frame.bytes, frame.width, frame.height, attempt.quality);
            let estimated = image.estimated_bytes();
            attempts.push(attempt);

            debug!(
                attempt = attempt.index,
                width = attempt.width,
                quality = attempt.quality_fraction(),
                estimated_bytes = estimated,
                budget_bytes,
                "compression attempt"
            );

            if estimated <= budget_bytes {
                debug!(
                    width = attempt.width,
                    quality = attempt.quality_fraction(),
                    estimated_bytes = estimated,
                    "compressed under budget"
                );
                return Ok(CompressionOutcome {
                    image,
                    attempts,
                    budget_miss: None,
                });
            }
            last = Some(image);
        }

        let image = last.ok_or_else(|| {
            CaptureError::compression("compress photo", "no compression attempt produced output")
        })?;
        let miss = BudgetMiss {
            budget_bytes,
            achieved_bytes: image.estimated_bytes(),
        };
        warn!(
            attempts = attempts.len(),
            budget_bytes = miss.budget_bytes,
            achieved_bytes = miss.achieved_bytes,
            "could not compress under budget, returning smallest candidate"
        );
        Ok(CompressionOutcome {
            image,
            attempts,
            budget_miss: Some(miss),
        })
    }
}
