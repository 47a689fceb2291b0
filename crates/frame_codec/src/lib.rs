//! # Frame Codec
//!
//! Pure conversions from raw CARLA camera buffers to stored arrays.
//!
//! - `decode_color`: BGRA → triangle-filter downscale → grayscale → bottom-up rows
//! - `decode_depth`: BGRA-packed depth → distance → nearest downscale → bottom-up rows
//!
//! Both are functions of `(buffer, width, height, scale)` only.

mod color;
mod depth;
mod error;

pub use color::decode_color;
pub use depth::{decode_depth, DEPTH_NORMALIZER};
pub use error::{CodecError, Result};

use contracts::{FramePayload, RawImage, SensorKind};
use ndarray::ArrayView3;

/// Decode a raw callback buffer according to the sensor that produced it
pub fn decode(kind: SensorKind, raw: &RawImage, scale: u32) -> Result<FramePayload> {
    match kind {
        SensorKind::Color => {
            decode_color(&raw.data, raw.width, raw.height, scale).map(FramePayload::Image)
        }
        SensorKind::Depth => {
            decode_depth(&raw.data, raw.width, raw.height, scale).map(FramePayload::Depth)
        }
    }
}

/// Checked `(height, width, 4)` view over a BGRA buffer, plus the downscaled size
fn bgra_view(
    raw: &[u8],
    width: u32,
    height: u32,
    scale: u32,
) -> Result<(ArrayView3<'_, u8>, (usize, usize))> {
    if width == 0 || height == 0 {
        return Err(CodecError::EmptyImage { width, height });
    }
    if scale == 0 {
        return Err(CodecError::InvalidScale { scale });
    }

    let (w, h, s) = (width as usize, height as usize, scale as usize);
    let expected = w * h * 4;
    if raw.len() != expected {
        return Err(CodecError::BufferSize {
            expected,
            actual: raw.len(),
        });
    }

    let (out_h, out_w) = (h / s, w / s);
    if out_h == 0 || out_w == 0 {
        return Err(CodecError::ScaleTooLarge {
            width,
            height,
            scale,
        });
    }

    let view = ArrayView3::from_shape((h, w, 4), raw)?;
    Ok((view, (out_h, out_w)))
}
