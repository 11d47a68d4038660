//! macOS Mousecape `.cape` theme codec.

pub mod plist;
pub mod theme;

pub use theme::{Cursor, DumpedCursor, Theme, dump, write};
