//! X11 XCursor codec.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::CommentRole;
pub use reader::{XcursorVisitor, argb_to_premultiplied_rgba, read};
pub use writer::write;
