//! Binary I/O primitives shared by every codec.
//!
//! [`reader::ByteReader`] and [`writer::ByteWriter`] are thin, endian-aware
//! wrappers that give every format decoder/encoder the same bounded-read
//! discipline `binrw` chunk structs get for free, without requiring `binrw`
//! for the formats (ANI/CUR) that are easier to walk by hand because of
//! their "chunks in arbitrary order" framing.

pub mod reader;
pub mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;
