// SPDX-License-Identifier: MIT
//! # cap-scale: Width-Targeted Photo Scaling
//!
//! This crate shrinks captured product photos to a requested width before they
//! are re-encoded under a byte budget. It is the resize half of the field capture
//! compression loop; encoding and budget tracking live in the main crate.
//!
//! ## Key Components
//!
//! - [`plan`]: Output dimension computation for a target width
//! - [`cpu`]: CPU resize of tightly packed RGB8 buffers using SIMD acceleration
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use cap_scale::{cpu::scale_rgb_cpu, plan::{build_plan, Size}};
//!
//! let input_size = Size { w: 4032, h: 3024 };
//! let plan = build_plan(input_size, 1200);
//! assert_eq!(plan.out.h, 900);
//!
//! let input_rgb = vec![0u8; (input_size.w * input_size.h * 3) as usize];
//! let mut resizer = fast_image_resize::Resizer::new();
//! let mut output = vec![0u8; plan.out_len()];
//! scale_rgb_cpu(&mut resizer, &input_rgb, &plan, &mut output)?;
//! # Ok::<(), cap_scale::cpu::ScaleError>(())
//! ```

pub mod cpu;
pub mod plan;
