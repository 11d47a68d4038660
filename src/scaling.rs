//! Gamma-correct, pixel-anchored image downscaling.
//!
//! Resamples in linear light (box-filtered, premultiplied alpha) instead of
//! averaging sRGB bytes directly, and can optionally keep one source pixel
//! aligned to an integer destination pixel so a cursor hotspot survives the
//! resize.

use crate::error::{Error, Result};
use crate::model::{CursorImage, Hotspot};
use crate::model::image::{premultiply, unpremultiply};

const GAMMA: f32 = 2.2;

fn srgb_to_linear(c: u8) -> f32 {
    (f32::from(c) / 255.0).powf(GAMMA)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn linear_to_srgb(c: f32) -> u8 {
    (c.max(0.0).min(1.0).powf(1.0 / GAMMA) * 255.0).round() as u8
}

/// Resamples `image` to `(dst_w, dst_h)` with no anchor preservation.
///
/// ## Errors
///
/// If `dst_w` or `dst_h` is zero.
pub fn downscale(image: &CursorImage, dst_w: u32, dst_h: u32) -> Result<CursorImage> {
    let (resampled, _) = downscale_anchored(image, None, dst_w, dst_h)?;
    Ok(resampled)
}

/// Resamples `image` to `(dst_w, dst_h)`, optionally keeping a source pixel
/// aligned to an integer destination pixel. When
/// `anchor` is `None`, this is a plain gamma-correct box downscale.
///
/// At scale factor `1.0` with no anchor, returns a bitwise-identical copy.
///
/// ## Errors
///
/// If `dst_w` or `dst_h` is zero.
pub fn downscale_anchored(
    image: &CursorImage,
    anchor: Option<Hotspot>,
    dst_w: u32,
    dst_h: u32,
) -> Result<(CursorImage, Option<Hotspot>)> {
    let (src_w, src_h) = image.dimensions();
    if dst_w == 0 || dst_h == 0 {
        return Err(Error::invalid_data(
            "scaling::downscale_anchored",
            "destination dimensions must be non-zero",
        ));
    }

    if dst_w == src_w && dst_h == src_h && anchor.is_none() {
        return Ok((image.clone(), None));
    }

    let scale_x = f64::from(dst_w) / f64::from(src_w);
    let scale_y = f64::from(dst_h) / f64::from(src_h);

    let (shift_x, shift_y, dst_anchor) = match anchor {
        Some(a) => {
            let ax = f64::from(a.x);
            let ay = f64::from(a.y);
            let hx = (ax * scale_x).floor();
            let hy = (ay * scale_y).floor();
            let shift_x = ax - hx / scale_x;
            let shift_y = ay - hy / scale_y;
            (shift_x, shift_y, Some(Hotspot::new(hx as u32, hy as u32)))
        }
        None => (0.0, 0.0, None),
    };

    let mut linear: Vec<[f32; 4]> = Vec::with_capacity((src_w * src_h) as usize);
    let mut straight = image.rgba().to_owned();
    unpremultiply(&mut straight);
    for px in straight.chunks_exact(4) {
        linear.push([
            srgb_to_linear(px[0]),
            srgb_to_linear(px[1]),
            srgb_to_linear(px[2]),
            f32::from(px[3]) / 255.0,
        ]);
    }

    let src_box = |dst_index: u32, scale: f64, shift: f64, src_len: u32| -> (u32, u32) {
        let start = (f64::from(dst_index) / scale + shift).floor().max(0.0) as u32;
        let end = ((f64::from(dst_index + 1) / scale + shift).ceil().max(1.0) as u32).min(src_len);
        if end <= start { (start, (start + 1).min(src_len)) } else { (start, end) }
    };

    let mut out = vec![0u8; (dst_w * dst_h * 4) as usize];

    for y in 0..dst_h {
        let (y0, y1) = src_box(y, scale_y, shift_y, src_h);
        for x in 0..dst_w {
            let (x0, x1) = src_box(x, scale_x, shift_x, src_w);

            let mut sum = [0f32; 4];
            let mut count = 0u32;
            for sy in y0..y1 {
                for sx in x0..x1 {
                    let px = linear[(sy * src_w + sx) as usize];
                    sum[0] += px[0] * px[3];
                    sum[1] += px[1] * px[3];
                    sum[2] += px[2] * px[3];
                    sum[3] += px[3];
                    count += 1;
                }
            }

            let count = count.max(1) as f32;
            let avg_a = sum[3] / count;
            let (r, g, b) = if avg_a > 0.0 {
                (sum[0] / count / avg_a, sum[1] / count / avg_a, sum[2] / count / avg_a)
            } else {
                (0.0, 0.0, 0.0)
            };

            let dst_idx = ((y * dst_w + x) * 4) as usize;
            out[dst_idx] = linear_to_srgb(r);
            out[dst_idx + 1] = linear_to_srgb(g);
            out[dst_idx + 2] = linear_to_srgb(b);
            out[dst_idx + 3] = (avg_a.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }

    premultiply(&mut out);
    Ok((CursorImage::new(dst_w, dst_h, out)?, dst_anchor))
}

#[cfg(test)]
mod test {
    use super::*;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> CursorImage {
        CursorImage::from_straight_rgba(w, h, rgba.repeat((w * h) as usize)).unwrap()
    }

    #[test]
    fn identity_scale_is_bitwise_identical() {
        let image = solid(8, 8, [200, 100, 50, 255]);
        let (out, anchor) = downscale_anchored(&image, None, 8, 8).unwrap();
        assert_eq!(out.rgba(), image.rgba());
        assert!(anchor.is_none());
    }

    #[test]
    fn premultiplied_alpha_channel_never_exceeds_alpha_after_downscale() {
        let image = solid(8, 8, [255, 0, 0, 128]);
        let (out, _) = downscale_anchored(&image, None, 4, 4).unwrap();
        for px in out.rgba().chunks_exact(4) {
            assert!(px[0] <= px[3]);
            assert!(px[1] <= px[3]);
            assert!(px[2] <= px[3]);
        }
    }

    #[test]
    fn anchor_preserves_floor_scaled_position() {
        let image = solid(16, 16, [10, 20, 30, 255]);
        let anchor = Hotspot::new(4, 4);
        let (_, new_anchor) = downscale_anchored(&image, Some(anchor), 8, 8).unwrap();
        assert_eq!(new_anchor, Some(Hotspot::new(2, 2)));
    }

    #[test]
    fn rejects_zero_destination_size() {
        let image = solid(4, 4, [0, 0, 0, 0]);
        assert!(downscale(&image, 0, 4).is_err());
    }
}
