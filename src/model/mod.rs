//! The value types shared across every codec and the render pipeline.
//!
//! Everything here is value-typed and produced once per generation run: a
//! renderer streams frames to a builder and does not retain decoded bitmaps
//! afterwards.

pub mod cursor;
pub mod image;
pub mod variant;

pub use cursor::{Animation, CursorIdentity, Frame, FrameSet, Hotspot};
pub use image::CursorImage;
pub use variant::Variant;
