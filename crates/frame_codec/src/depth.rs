//! Depth frames: BGRA-packed 24-bit depth → float distance

use ndarray::{s, Array2, Axis};

use crate::error::Result;

/// `(256^3 - 1) / 1000`: maps the 24-bit code to the engine's far-plane units
pub const DEPTH_NORMALIZER: f64 = 16777.215;

/// Decode a CARLA depth buffer into a bottom-up distance map.
///
/// Each pixel packs `B * 65536 + G * 256 + R`, divided by [`DEPTH_NORMALIZER`].
/// Downscaling samples the nearest source pixel (`[i * scale, j * scale]`) so
/// depth edges are never blended across object boundaries.
///
/// # Errors
/// `CodecError` when the buffer length is not `width * height * 4` or the
/// dimensions / scale are degenerate.
pub fn decode_depth(raw: &[u8], width: u32, height: u32, scale: u32) -> Result<Array2<f32>> {
    let (pixels, (out_h, out_w)) = crate::bgra_view(raw, width, height, scale)?;
    let step = scale as usize;

    let sampled = pixels.slice(s![..out_h * step;step, ..out_w * step;step, ..3]);
    let depth = sampled.map_axis(Axis(2), |bgr| unpack(bgr[0], bgr[1], bgr[2]));
    Ok(depth.slice(s![..;-1, ..]).to_owned())
}

#[inline]
fn unpack(b: u8, g: u8, r: u8) -> f32 {
    let encoded = b as f64 * 65536.0 + g as f64 * 256.0 + r as f64;
    (encoded / DEPTH_NORMALIZER) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solid(width: u32, height: u32, bgra: [u8; 4]) -> Vec<u8> {
        bgra.repeat((width * height) as usize)
    }

    #[test]
    fn test_constant_code_decodes_everywhere() {
        let expected = ((10 * 65536 + 20 * 256 + 30) as f64 / 16777.215) as f32;
        for scale in [1, 2, 3] {
            let depth = decode_depth(&solid(12, 6, [10, 20, 30, 255]), 12, 6, scale).unwrap();
            assert_eq!(depth.dim(), (6 / scale as usize, 12 / scale as usize));
            for &value in depth.iter() {
                assert_relative_eq!(value, expected, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn test_extremes() {
        let near = decode_depth(&solid(2, 2, [0, 0, 0, 255]), 2, 2, 1).unwrap();
        assert!(near.iter().all(|&d| d == 0.0));

        let far = decode_depth(&solid(2, 2, [255, 255, 255, 255]), 2, 2, 1).unwrap();
        assert!(far.iter().all(|&d| (d - 1000.0).abs() < 1e-3));
    }

    #[test]
    fn test_nearest_sampling_does_not_blend() {
        // 4x1 strip: codes 0, 1000, 2000, 3000 packed in B (high byte)
        let mut raw = Vec::new();
        for b in [0u8, 1, 2, 3] {
            raw.extend_from_slice(&[b, 0, 0, 255]);
        }
        let err = decode_depth(&raw, 4, 1, 2).unwrap_err();
        // height 1 cannot be halved
        assert!(err.to_string().contains("scale 2"));

        let raw: Vec<u8> = raw.repeat(2);
        let depth = decode_depth(&raw, 4, 2, 2).unwrap();
        assert_eq!(depth.dim(), (1, 2));
        assert_relative_eq!(depth[[0, 0]], 0.0);
        assert_relative_eq!(
            depth[[0, 1]],
            (2.0 * 65536.0 / DEPTH_NORMALIZER) as f32,
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_rows_are_flipped() {
        // Top row code 1 (R), bottom row code 2 (R)
        let mut raw = solid(2, 2, [0, 0, 2, 255]);
        raw[..8].copy_from_slice(&[0, 0, 1, 255, 0, 0, 1, 255]);

        let depth = decode_depth(&raw, 2, 2, 1).unwrap();
        assert_relative_eq!(depth[[0, 0]], (2.0 / DEPTH_NORMALIZER) as f32);
        assert_relative_eq!(depth[[1, 0]], (1.0 / DEPTH_NORMALIZER) as f32);
    }
}
