//! [`Variant`]: an immutable (theme, source, colors, sizes, stroke, shadow)
//! tuple, and the equality it needs for the render pipeline's dedupe cache.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Nominal sizes a theme targets, plus the canvas multiplier the external
/// rasterizer is asked to render at before this crate downscales.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeScheme {
    pub nominal_sizes: Vec<u32>,
    pub target_canvas_factor: f64,
}

impl Eq for SizeScheme {}

impl Hash for SizeScheme {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nominal_sizes.hash(state);
        self.target_canvas_factor.to_bits().hash(state);
    }
}

/// An optional drop shadow, forwarded opaquely to the external rasterizer.
#[derive(Debug, Clone, PartialEq)]
pub struct DropShadow {
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    pub color: String,
}

impl Eq for DropShadow {}

impl Hash for DropShadow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset_x.to_bits().hash(state);
        self.offset_y.to_bits().hash(state);
        self.blur.to_bits().hash(state);
        self.color.hash(state);
    }
}

/// A specific color/size/stroke/shadow configuration of a theme.
///
/// Two variants are equivalent iff all six fields compare equal.
/// `color_map` is stored as a [`BTreeMap`] specifically so that two maps
/// built via different insertion orders compare and hash identically — the
/// dedupe cache in §4.F relies on this ("insertion order does not matter").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variant {
    pub theme_name: String,
    pub source_dir: PathBuf,
    pub color_map: BTreeMap<String, String>,
    pub size_scheme: SizeScheme,
    pub stroke_width: Option<StrokeWidthBits>,
    pub drop_shadow: Option<DropShadow>,
}

/// `f64` stroke width stored as its bit pattern so [`Variant`] can derive
/// `Eq`/`Hash`. Two variants constructed with the same literal stroke width
/// compare equal, which is the only equality the dedupe cache needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrokeWidthBits(u64);

impl StrokeWidthBits {
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        Self(value.to_bits())
    }

    #[must_use]
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// Base stroke width the source SVGs are drawn at before scaling.
pub const BASE_STROKE_WIDTH: f64 = 16.0;

impl Variant {
    /// Canonicalizes `self` for use as a dedupe-cache key: only the fields
    /// that determine rasterization identity
    /// (`colors, sizeScheme, strokeWidth, dropShadow`) participate —
    /// `theme_name` and `source_dir` select *which* SVG to rasterize, not
    /// *how*, so two variants that agree on these four fields share one
    /// rasterization pass regardless of theme or source.
    #[must_use]
    pub fn cache_key(&self) -> VariantCacheKey<'_> {
        VariantCacheKey {
            color_map: &self.color_map,
            size_scheme: &self.size_scheme,
            stroke_width: self.stroke_width,
            drop_shadow: self.drop_shadow.as_ref(),
        }
    }
}

/// Borrowed key type used by the variant-rendering cache.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct VariantCacheKey<'a> {
    color_map: &'a BTreeMap<String, String>,
    size_scheme: &'a SizeScheme,
    stroke_width: Option<StrokeWidthBits>,
    drop_shadow: Option<&'a DropShadow>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn scheme() -> SizeScheme {
        SizeScheme {
            nominal_sizes: vec![24, 32, 48],
            target_canvas_factor: 2.0,
        }
    }

    #[test]
    fn equal_color_maps_with_different_insertion_order_share_a_cache_key() {
        let mut a = BTreeMap::new();
        a.insert("base".to_string(), "#ffffff".to_string());
        a.insert("outline".to_string(), "#000000".to_string());

        let mut b = BTreeMap::new();
        b.insert("outline".to_string(), "#000000".to_string());
        b.insert("base".to_string(), "#ffffff".to_string());

        let v1 = Variant {
            theme_name: "theme-a".into(),
            source_dir: "/themes/a".into(),
            color_map: a,
            size_scheme: scheme(),
            stroke_width: None,
            drop_shadow: None,
        };

        let v2 = Variant {
            theme_name: "theme-b".into(),
            source_dir: "/themes/a".into(),
            color_map: b,
            size_scheme: scheme(),
            stroke_width: None,
            drop_shadow: None,
        };

        assert_eq!(v1.cache_key(), v2.cache_key());
        assert_ne!(v1, v2); // theme_name differs, so full equality still fails
    }
}
