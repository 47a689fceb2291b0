//! Color frames: BGRA → grayscale

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};
use ndarray::{s, Array2, ArrayView3, Axis};

use crate::error::{CodecError, Result};

/// BT.601 luma weights in 14-bit fixed point
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Decode a BGRA color buffer into a bottom-up grayscale image.
///
/// With `scale > 1` the image is first downscaled to
/// `(height / scale, width / scale)` with `FilterType::Triangle`. This is a
/// tent-weighted approximation of area resampling, not a box average: the
/// kernel widens with the ratio so every source pixel contributes, but pixels
/// near a block centre weigh more.
///
/// # Errors
/// `CodecError` when the buffer length is not `width * height * 4` or the
/// dimensions / scale are degenerate.
pub fn decode_color(raw: &[u8], width: u32, height: u32, scale: u32) -> Result<Array2<u8>> {
    let (pixels, (out_h, out_w)) = crate::bgra_view(raw, width, height, scale)?;
    if scale == 1 {
        return Ok(gray_bottom_up(pixels));
    }

    // Channel order is irrelevant to resampling, the BGRA bytes ride in an Rgba container
    let source = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(width, height, raw).ok_or(
        CodecError::BufferSize {
            expected: pixels.len(),
            actual: raw.len(),
        },
    )?;
    let resized = imageops::resize(&source, out_w as u32, out_h as u32, FilterType::Triangle);
    let view = ArrayView3::from_shape((out_h, out_w, 4), resized.as_raw().as_slice())?;
    Ok(gray_bottom_up(view))
}

fn gray_bottom_up(bgra: ArrayView3<'_, u8>) -> Array2<u8> {
    let gray = bgra.map_axis(Axis(2), |px| luma(px[2], px[1], px[0]));
    gray.slice(s![..;-1, ..]).to_owned()
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B + (1 << (LUMA_SHIFT - 1));
    (y >> LUMA_SHIFT) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, bgra: [u8; 4]) -> Vec<u8> {
        bgra.repeat((width * height) as usize)
    }

    #[test]
    fn test_all_zero_buffer_gives_all_zero_image() {
        for (width, height, scale) in [(64, 32, 1), (64, 32, 2), (1280, 720, 3), (90, 30, 4)] {
            let gray = decode_color(&vec![0u8; (width * height * 4) as usize], width, height, scale)
                .unwrap();
            assert_eq!(
                gray.dim(),
                ((height / scale) as usize, (width / scale) as usize)
            );
            assert!(gray.iter().all(|&v| v == 0));
        }
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        // pure red / green / blue
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn test_channel_order_is_bgra() {
        // B=0, G=0, R=255
        let gray = decode_color(&solid(4, 2, [0, 0, 255, 255]), 4, 2, 1).unwrap();
        assert!(gray.iter().all(|&v| v == 76));
    }

    #[test]
    fn test_constant_image_survives_downscale() {
        let gray = decode_color(&solid(40, 20, [50, 100, 150, 255]), 40, 20, 4).unwrap();
        assert_eq!(gray.dim(), (5, 10));
        let expected = luma(150, 100, 50);
        assert!(gray.iter().all(|&v| v == expected));
    }

    #[test]
    fn test_rows_are_flipped() {
        // Top row white, bottom row black
        let mut raw = solid(3, 2, [0, 0, 0, 255]);
        raw[..12].copy_from_slice(&[255u8; 12]);

        let gray = decode_color(&raw, 3, 2, 1).unwrap();
        assert_eq!(gray.row(0).to_vec(), vec![0, 0, 0]);
        assert_eq!(gray.row(1).to_vec(), vec![255, 255, 255]);
    }
}
