// SPDX-License-Identifier: MIT
//! # Width Plan Computation
//!
//! The compression loop asks for a photo at an exact width and lets the height
//! follow the source aspect ratio. This module turns that request into concrete
//! output dimensions.
//!
//! - Width is taken as requested, including when it exceeds the source width
//! - Height is rounded to the nearest pixel and clamped to at least 1px
//! - Neither side exceeds [`MAX_DIMENSION`]; a plan that would is shrunk as a
//!   whole, keeping the aspect ratio, so very tall sources come out narrower
//!   than requested
//! - A zero-sized source or target collapses to a 1x1 plan

/// Largest width or height a plan will produce. JPEG stores both as 16-bit values.
pub const MAX_DIMENSION: u32 = 65_535;

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Computed scaling plan for a single resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// Byte length of a tightly packed RGB8 buffer holding the output.
    pub fn out_len(&self) -> usize {
        (self.out.w as usize) * (self.out.h as usize) * 3
    }

    /// Byte length of a tightly packed RGB8 buffer holding the input.
    pub fn input_len(&self) -> usize {
        (self.input.w as usize) * (self.input.h as usize) * 3
    }

    /// True when the plan leaves the image dimensions untouched.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute the plan for resizing `input` to `width` pixels wide.
pub fn build_plan(input: Size, width: u32) -> ScalePlan {
    let limit = MAX_DIMENSION as f64;
    let mut w = width.clamp(1, MAX_DIMENSION) as f64;
    let mut h = if input.w == 0 || input.h == 0 {
        1.0
    } else {
        input.h as f64 * w / input.w as f64
    };
    if h > limit {
        w *= limit / h;
        h = limit;
    }
    ScalePlan {
        input,
        out: Size {
            w: (w.round() as u32).max(1),
            h: (h.round() as u32).clamp(1, MAX_DIMENSION),
        },
    }
}
