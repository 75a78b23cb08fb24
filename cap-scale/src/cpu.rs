// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGB8 in → RGB8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeOptions, Resizer};

use crate::plan::ScalePlan;

#[derive(Debug)]
pub enum ScaleError {
    SourceTooSmall,
    BufferTooSmall,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::SourceTooSmall => write!(f, "Source buffer shorter than input dimensions"),
            ScaleError::BufferTooSmall => write!(f, "Output buffer too small"),
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Main scaling entry point.
/// `src_rgb` must hold `plan.input.w * plan.input.h * 3` tightly packed bytes.
/// `dst` must be at least `plan.out_len()` bytes (RGB).
pub fn scale_rgb_cpu(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let src_len = plan.input_len();
    let dst_len = plan.out_len();
    if src_rgb.len() < src_len {
        return Err(ScaleError::SourceTooSmall);
    }
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }

    if plan.is_identity() {
        dst[..dst_len].copy_from_slice(&src_rgb[..src_len]);
        return Ok(());
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(plan.input.w, plan.input.h, &src_rgb[..src_len])?;
    let mut dst_image = TypedImage::<U8x3>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    let opts = ResizeOptions::new();
    resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?;

    Ok(())
}

/// Convenience wrapper that allocates the output buffer.
pub fn scale_rgb_to_vec(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    plan: &ScalePlan,
) -> Result<Vec<u8>, ScaleError> {
    let mut out = vec![0u8; plan.out_len()];
    scale_rgb_cpu(resizer, src_rgb, plan, &mut out)?;
    Ok(out)
}
