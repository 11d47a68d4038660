//! [`CursorImage`], a premultiplied-RGBA bitmap of explicit dimensions.
//!
//! This is the in-memory image type every codec and the variant renderer
//! pass frames around as. It stores premultiplied alpha (matching the
//! XCursor wire format) instead of straight alpha, and carries no
//! hotspot/delay/nominal-size of its own — those are per-frame metadata now
//! (see [`crate::model::cursor::Frame`]), since the same bitmap concept is
//! reused for plain per-size renders as well as animation frames.

use crate::error::{Error, Result};

/// A premultiplied-RGBA bitmap with explicit, validated dimensions.
#[derive(Clone)]
pub struct CursorImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl CursorImage {
    /// Constructs a bitmap from premultiplied RGBA8 pixel data.
    ///
    /// ## Errors
    ///
    /// If `width` or `height` is zero, or `rgba.len() != width * height * 4`.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_data(
                "CursorImage::new",
                "width and height must both be non-zero",
            ));
        }

        let expected = usize::try_from(width)
            .unwrap_or(usize::MAX)
            .saturating_mul(usize::try_from(height).unwrap_or(usize::MAX))
            .saturating_mul(4);

        if rgba.len() != expected {
            return Err(Error::invalid_data(
                "CursorImage::new",
                format!(
                    "expected {expected} bytes of RGBA8 data for {width}x{height}, got {}",
                    rgba.len()
                ),
            ));
        }

        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Builds a [`CursorImage`] from straight-alpha RGBA8 (e.g. a freshly
    /// decoded PNG), premultiplying in the process.
    ///
    /// ## Errors
    ///
    /// Same as [`Self::new`].
    pub fn from_straight_rgba(width: u32, height: u32, mut rgba: Vec<u8>) -> Result<Self> {
        premultiply(&mut rgba);
        Self::new(width, height, rgba)
    }

    /// Dimensions as `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Borrows the premultiplied RGBA8 pixel data.
    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Returns a copy of the pixel data with straight (non-premultiplied)
    /// alpha, for codecs whose payload format (PNG) expects it.
    #[must_use]
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut out = self.rgba.clone();
        unpremultiply(&mut out);
        out
    }

}

impl std::fmt::Debug for CursorImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Premultiplies alpha into RGB in place. See [`premultiply_channel`].
pub fn premultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3];
        px[0] = premultiply_channel(px[0], a);
        px[1] = premultiply_channel(px[1], a);
        px[2] = premultiply_channel(px[2], a);
    }
}

/// Un-premultiplies alpha out of RGB in place (inverse of [`premultiply`]).
pub fn unpremultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3];
        px[0] = unpremultiply_channel(px[0], a);
        px[1] = unpremultiply_channel(px[1], a);
        px[2] = unpremultiply_channel(px[2], a);
    }
}

/// `round(c * a / 255)`.
#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn premultiply_channel(c: u8, a: u8) -> u8 {
    let prod = (c as u16) * (a as u16);
    ((prod + 127) / 255) as u8
}

/// Inverse of [`premultiply_channel`]; `a == 0` maps to `0` since there is no
/// recoverable color behind a fully transparent pixel.
#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn unpremultiply_channel(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    let scaled = (c as u32) * 255 + (a as u32) / 2;
    (scaled / a as u32) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn premultiply_then_unpremultiply_is_lossless_at_full_alpha() {
        let mut rgba = vec![200, 100, 50, 255];
        premultiply(&mut rgba);
        assert_eq!(rgba, vec![200, 100, 50, 255]);
        unpremultiply(&mut rgba);
        assert_eq!(rgba, vec![200, 100, 50, 255]);
    }

    #[test]
    fn premultiplied_channel_never_exceeds_alpha() {
        for c in [0u8, 17, 128, 255] {
            for a in [0u8, 1, 64, 255] {
                assert!(premultiply_channel(c, a) <= a);
            }
        }
    }

    #[test]
    fn rejects_mismatched_pixel_length() {
        assert!(CursorImage::new(2, 2, vec![0; 10]).is_err());
    }
}
