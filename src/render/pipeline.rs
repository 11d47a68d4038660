//! Per-variant cursor renderer: resolves nominal sizes, asks the
//! rasterizer for each `(size, frame)` pair, downscales oversized canvases,
//! and streams the result into a [`BuilderFactory`]-produced builder.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::model::cursor::{CursorIdentity, Frame};
use crate::model::variant::VariantCacheKey;
use crate::model::Variant;
use crate::render::builder::BuilderFactory;
use crate::render::rasterizer::SvgRasterizer;
use crate::scaling::downscale_anchored;

/// One cursor identity to render under one variant, plus the SVG source
/// bytes to hand the rasterizer. Reading `svg_bytes` from `variant.source_dir`
/// is the caller's job — out of scope for the core.
pub struct RenderRequest<'a> {
    pub identity: CursorIdentity,
    pub variant: &'a Variant,
    pub svg_bytes: Vec<u8>,
}

/// Renders every request into `target_dir` through `factory`, reusing one
/// rasterization pass across requests whose `(cursor name, cache key)` agree.
///
/// ## Errors
///
/// If rasterization, downscaling, frame assembly, or the builder's `build()`
/// fails for any request.
pub fn render_theme(
    requests: &[RenderRequest<'_>],
    rasterizer: &dyn SvgRasterizer,
    factory: &mut dyn BuilderFactory,
    target_dir: &Path,
) -> Result<()> {
    let mut cache: HashMap<(&str, VariantCacheKey<'_>), Vec<Frame>> = HashMap::new();

    for request in requests {
        let key = (request.identity.name.as_str(), request.variant.cache_key());

        let frames = match cache.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let frames = rasterize_variant(&request.identity, request.variant, &request.svg_bytes, rasterizer)?;
                cache.insert(key, frames.clone());
                frames
            }
        };

        let mut builder = factory.create_builder(&request.identity, target_dir)?;
        for frame in frames {
            builder.add_frame(frame.frame_no, frame.image, frame.hotspot, frame.nominal_size, frame.delay_millis)?;
        }
        builder.build()?;
    }

    factory.finalize()
}

fn rasterize_variant(
    identity: &CursorIdentity,
    variant: &Variant,
    svg_bytes: &[u8],
    rasterizer: &dyn SvgRasterizer,
) -> Result<Vec<Frame>> {
    let frame_count = identity.animation.map_or(1, |a| a.frame_count).max(1);
    let delay_millis = identity.animation.map_or(0, |a| a.frame_delay_ms);

    let mut frames = Vec::with_capacity(variant.size_scheme.nominal_sizes.len() * frame_count as usize);

    for &nominal_size in &variant.size_scheme.nominal_sizes {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let canvas_px = ((f64::from(nominal_size) * variant.size_scheme.target_canvas_factor).round() as u32).max(1);

        for i in 0..frame_count {
            let frame_no = identity.is_animated().then_some(i + 1);

            let (image, hotspot) = rasterizer.render(
                svg_bytes,
                canvas_px,
                canvas_px,
                &variant.color_map,
                variant.stroke_width.map(|s| s.value()),
                variant.drop_shadow.as_ref(),
            )?;

            let (image, hotspot) = if canvas_px > nominal_size {
                let (scaled, anchor) = downscale_anchored(&image, Some(hotspot), nominal_size, nominal_size)?;
                (scaled, anchor.unwrap_or(hotspot))
            } else {
                (image, hotspot)
            };

            frames.push(Frame::new(frame_no, image, hotspot, nominal_size, delay_millis)?);
        }
    }

    Ok(frames)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::variant::SizeScheme;
    use crate::model::{CursorImage, Hotspot};
    use crate::render::builder::{BitmapFactory, BuilderFactory};
    use std::cell::Cell;
    use std::collections::BTreeMap;

    struct CountingRasterizer {
        calls: Cell<u32>,
    }

    impl SvgRasterizer for CountingRasterizer {
        fn render(
            &self,
            _svg_bytes: &[u8],
            width_px: u32,
            height_px: u32,
            _color_map: &BTreeMap<String, String>,
            _stroke_width: Option<f64>,
            _drop_shadow: Option<&crate::model::variant::DropShadow>,
        ) -> Result<(CursorImage, Hotspot)> {
            self.calls.set(self.calls.get() + 1);
            let image = CursorImage::new(width_px, height_px, vec![100, 150, 200, 255].repeat((width_px * height_px) as usize))?;
            Ok((image, Hotspot::new(width_px / 2, height_px / 2)))
        }
    }

    fn variant(colors: &[(&str, &str)], theme_name: &str) -> Variant {
        let mut color_map = BTreeMap::new();
        for (k, v) in colors {
            color_map.insert((*k).to_string(), (*v).to_string());
        }
        Variant {
            theme_name: theme_name.to_string(),
            source_dir: "/themes/demo".into(),
            color_map,
            size_scheme: SizeScheme {
                nominal_sizes: vec![32],
                target_canvas_factor: 1.0,
            },
            stroke_width: None,
            drop_shadow: None,
        }
    }

    #[test]
    fn rasterizer_runs_once_per_nominal_size_and_frame() {
        let rasterizer = CountingRasterizer { calls: Cell::new(0) };
        let identity = CursorIdentity::static_cursor("default".into());
        let variant = variant(&[("base", "#fff")], "demo");

        let frames = rasterize_variant(&identity, &variant, b"<svg/>", &rasterizer).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(rasterizer.calls.get(), 1);
    }

    #[test]
    fn equal_color_maps_share_one_rasterization_pass() {
        let rasterizer = CountingRasterizer { calls: Cell::new(0) };
        let v1 = variant(&[("base", "#fff"), ("outline", "#000")], "theme-a");
        let v2 = variant(&[("outline", "#000"), ("base", "#fff")], "theme-b");

        let identity = CursorIdentity::static_cursor("default".into());
        let requests = vec![
            RenderRequest { identity: identity.clone(), variant: &v1, svg_bytes: b"<svg/>".to_vec() },
            RenderRequest { identity: identity.clone(), variant: &v2, svg_bytes: b"<svg/>".to_vec() },
        ];

        let dir = tempfile::tempdir().unwrap();
        let mut factory = BitmapFactory;

        render_theme(&requests, &rasterizer, &mut factory, dir.path()).unwrap();
        assert_eq!(rasterizer.calls.get(), 1);
    }
}
