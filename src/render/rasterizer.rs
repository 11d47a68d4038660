//! The external SVG rasterizer boundary.
//!
//! SVG rasterization itself is out of scope for this crate — any headless
//! browser or in-process SVG library can sit behind this trait. Everything
//! downstream (dedupe, downscale, builder dispatch) only depends on this one
//! operation.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::variant::DropShadow;
use crate::model::{CursorImage, Hotspot};

/// Renders one SVG variant to an RGBA bitmap at a specific pixel size.
pub trait SvgRasterizer {
    /// Rasterizes `svg_bytes` at `width_px × height_px`, substituting
    /// `color_map` palette slots and applying `stroke_width`/`drop_shadow`
    /// when present.
    ///
    /// ## Errors
    ///
    /// If the underlying renderer fails to parse or rasterize the SVG.
    fn render(
        &self,
        svg_bytes: &[u8],
        width_px: u32,
        height_px: u32,
        color_map: &BTreeMap<String, String>,
        stroke_width: Option<f64>,
        drop_shadow: Option<&DropShadow>,
    ) -> Result<(CursorImage, Hotspot)>;
}
