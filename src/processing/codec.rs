//! Codec seam driven by the compression loop.
//!
//! The engine only needs two things from a codec: decode the raw camera output once,
//! then re-encode it at a given width and quality as many times as the attempt
//! schedule asks. [`JpegCodec`] is the production implementation; tests plug in
//! codecs with a predictable size model.

use cap_scale::cpu::scale_rgb_to_vec;
use cap_scale::plan::{Size, build_plan};
use fast_image_resize::Resizer;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::error::{CaptureError, CaptureResult};

/// Output of a single encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Abstract image codec interface.
pub trait ImageCodec: Send + Sync {
    /// Decoded form of the camera output, reused across attempts.
    type Source: Send + Sync;

    /// Decode raw camera output.
    fn decode(&self, raw: &[u8]) -> CaptureResult<Self::Source>;

    /// Encode `source` resized to `width` pixels wide at `quality` percent.
    fn encode(&self, source: &Self::Source, width: u32, quality: u8) -> CaptureResult<EncodedFrame>;
}

/// Decoded photo held as tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct DecodedPhoto {
    pub rgb: Vec<u8>,
    pub size: Size,
}

/// Baseline JPEG codec backed by `image` for decode/encode and `cap-scale` for resize.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    type Source = DecodedPhoto;

    fn decode(&self, raw: &[u8]) -> CaptureResult<DecodedPhoto> {
        let decoded = image::load_from_memory(raw)
            .map_err(|e| CaptureError::compression_from("decode photo", e))?;
        let rgb = decoded.to_rgb8();
        let size = Size {
            w: rgb.width(),
            h: rgb.height(),
        };
        if size.w == 0 || size.h == 0 {
            return Err(CaptureError::compression(
                "decode photo",
                "photo has zero width or height",
            ));
        }
        Ok(DecodedPhoto {
            rgb: rgb.into_raw(),
            size,
        })
    }

    fn encode(&self, source: &DecodedPhoto, width: u32, quality: u8) -> CaptureResult<EncodedFrame> {
        let plan = build_plan(source.size, width);
        let mut resizer = Resizer::new();
        let pixels = scale_rgb_to_vec(&mut resizer, &source.rgb, &plan)?;

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
            .encode(&pixels, plan.out.w, plan.out.h, ExtendedColorType::Rgb8)
            .map_err(|e| CaptureError::compression_from("encode jpeg", e))?;

        Ok(EncodedFrame {
            bytes,
            width: plan.out.w,
            height: plan.out.h,
        })
    }
}
