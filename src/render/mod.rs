//! Variant rendering pipeline: rasterize, downscale, dispatch to a
//! pluggable output builder.

pub mod builder;
pub mod pipeline;
pub mod rasterizer;

pub use builder::{
    BitmapFactory, BuilderFactory, CursorBuilder, MousecapeThemeConfig, MousecapeThemeFactory, OutputFormat,
    WindowsCursorFactory, XCursorFactory, create_factory,
};
pub use pipeline::{render_theme, RenderRequest};
pub use rasterizer::SvgRasterizer;
