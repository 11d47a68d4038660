//! XCursor reader.
//!
//! Written fresh as a push-style visitor over [`crate::io::ByteReader`]: a
//! trait with one method per event plus a default error fallback.

use super::format::{self, ChunkType, CommentRole};
use crate::error::{Error, Result};
use crate::io::ByteReader;

/// Receives XCursor file events in on-disk order.
///
/// Implementors that don't care about a particular event can accept the
/// default no-op body; [`Self::error`] is the one callback every consumer
/// should look at.
pub trait XcursorVisitor {
    fn header(&mut self, _file_version: u32, _toc_length: u32) {}

    /// `pixels` is a bounded reader scoped to exactly `width * height * 4`
    /// bytes; the reader is finalized with [`ByteReader::finish`] after this
    /// call returns, so under/over-consumption here surfaces as an error
    /// from [`read`] regardless of what this callback itself returns.
    fn image(
        &mut self,
        nominal_size: u32,
        chunk_version: u32,
        width: u32,
        height: u32,
        xhot: u32,
        yhot: u32,
        delay: u32,
        pixels: &mut ByteReader<'_>,
    ) -> Result<()>;

    fn comment(&mut self, _role: CommentRole, _chunk_version: u32, _text: &str) -> Result<()> {
        Ok(())
    }
}

struct TocEntry {
    r#type: ChunkType,
    subtype: u32,
    position: u32,
}

/// Parses `data` as an XCursor file, dispatching events to `visitor`.
///
/// Walks `ExpectHeader → ExpectToc → ExpectChunk(i) → Done`; a TOC/chunk
/// count mismatch or a chunk whose own header disagrees with its TOC entry
/// is fatal.
///
/// ## Errors
///
/// On a bad magic, a wrong declared header size, an out-of-range dimension
/// or hotspot, a TOC/chunk header mismatch, or a pixel callback that didn't
/// consume exactly its declared byte range.
pub fn read(data: &[u8], visitor: &mut impl XcursorVisitor) -> Result<()> {
    let mut r = ByteReader::new(data);

    let magic = r.read_exact(4)?;
    if magic != format::MAGIC {
        return Err(Error::invalid_data("xcursor::read", "bad magic, not XCursor"));
    }

    let header_size = r.read_u32le()?;
    if header_size != format::sizes::FILE_HEADER {
        return Err(Error::invalid_data(
            "xcursor::read",
            format!("expected header_size=16, got {header_size}"),
        ));
    }

    let file_version = r.read_u32le()?;
    let toc_length = r.read_u32le()?;
    visitor.header(file_version, toc_length);

    let mut toc = Vec::with_capacity(toc_length as usize);
    for _ in 0..toc_length {
        let raw_type = r.read_u32le()?;
        let r#type = ChunkType::from_u32(raw_type).ok_or_else(|| {
            Error::invalid_data("xcursor::read", format!("unknown chunk type {raw_type:#x}"))
        })?;
        let subtype = r.read_u32le()?;
        let position = r.read_u32le()?;
        toc.push(TocEntry {
            r#type,
            subtype,
            position,
        });
    }

    for entry in &toc {
        let offset = entry.position as usize;
        if offset > data.len() {
            return Err(Error::invalid_data(
                "xcursor::read",
                format!("TOC position {offset} beyond end of file"),
            ));
        }
        let mut chunk_reader = ByteReader::new(&data[offset..]);
        match entry.r#type {
            ChunkType::Image => read_image_chunk(&mut chunk_reader, entry, visitor)?,
            ChunkType::Comment => read_comment_chunk(&mut chunk_reader, entry, visitor)?,
        }
    }

    Ok(())
}

fn read_image_chunk(
    r: &mut ByteReader<'_>,
    entry: &TocEntry,
    visitor: &mut impl XcursorVisitor,
) -> Result<()> {
    let header_size = r.read_u32le()?;
    if header_size != format::sizes::IMAGE_HEADER {
        return Err(Error::invalid_data(
            "xcursor::read",
            format!("expected image header_size=36, got {header_size}"),
        ));
    }

    let raw_type = r.read_u32le()?;
    if ChunkType::from_u32(raw_type) != Some(ChunkType::Image) {
        return Err(Error::invalid_data(
            "xcursor::read",
            "chunk type disagrees with its TOC entry",
        ));
    }

    let nominal_size = r.read_u32le()?;
    if nominal_size != entry.subtype {
        return Err(Error::invalid_data(
            "xcursor::read",
            "image subtype disagrees with its TOC entry",
        ));
    }

    let chunk_version = r.read_u32le()?;
    let width = r.read_u32le()?;
    let height = r.read_u32le()?;
    let xhot = r.read_u32le()?;
    let yhot = r.read_u32le()?;
    let delay = r.read_u32le()?;

    if width > format::MAX_DIMENSION || height > format::MAX_DIMENSION {
        return Err(Error::invalid_data(
            "xcursor::read",
            format!("{width}x{height} exceeds the maximum XCursor dimension"),
        ));
    }
    if xhot > width || yhot > height {
        return Err(Error::invalid_data(
            "xcursor::read",
            format!("hotspot ({xhot},{yhot}) lies outside {width}x{height}"),
        ));
    }

    let pixel_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::invalid_data("xcursor::read", "pixel length overflow"))?;

    let mut pixels = r.bounded(pixel_len)?;
    visitor.image(
        nominal_size,
        chunk_version,
        width,
        height,
        xhot,
        yhot,
        delay,
        &mut pixels,
    )?;
    pixels.finish("xcursor image pixel data")
}

fn read_comment_chunk(
    r: &mut ByteReader<'_>,
    entry: &TocEntry,
    visitor: &mut impl XcursorVisitor,
) -> Result<()> {
    let header_size = r.read_u32le()?;
    if header_size != format::sizes::COMMENT_HEADER {
        return Err(Error::invalid_data(
            "xcursor::read",
            format!("expected comment header_size=20, got {header_size}"),
        ));
    }

    let raw_type = r.read_u32le()?;
    if ChunkType::from_u32(raw_type) != Some(ChunkType::Comment) {
        return Err(Error::invalid_data(
            "xcursor::read",
            "chunk type disagrees with its TOC entry",
        ));
    }

    let role = CommentRole::from_u32(entry.subtype).ok_or_else(|| {
        Error::invalid_data(
            "xcursor::read",
            format!("unknown comment role {}", entry.subtype),
        )
    })?;

    let chunk_version = r.read_u32le()?;
    let length = r.read_u32le()?;
    let bytes = r.read_exact(length as usize)?;
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::invalid_data("xcursor::read", e.to_string()))?;

    visitor.comment(role, chunk_version, text)
}

/// Converts little-endian-BGRA (== big-endian ARGB) premultiplied pixel
/// bytes, as read straight off the wire, into straight-order premultiplied
/// RGBA for [`crate::model::CursorImage::new`].
#[must_use]
pub fn argb_to_premultiplied_rgba(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for px in out.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{CursorImage, Frame, Hotspot};

    struct Collector {
        images: Vec<(u32, u32, u32)>,
    }

    impl XcursorVisitor for Collector {
        fn image(
            &mut self,
            nominal_size: u32,
            _chunk_version: u32,
            width: u32,
            height: u32,
            _xhot: u32,
            _yhot: u32,
            _delay: u32,
            pixels: &mut ByteReader<'_>,
        ) -> Result<()> {
            pixels.skip((width * height * 4) as usize)?;
            self.images.push((nominal_size, width, height));
            Ok(())
        }
    }

    fn frame(nominal_size: u32) -> Frame {
        let image = CursorImage::new(2, 2, vec![1, 2, 3, 255].repeat(4)).unwrap();
        Frame::new(Some(1), image, Hotspot::new(1, 1), nominal_size, 10).unwrap()
    }

    #[test]
    fn round_trips_through_the_writer() {
        let frames = vec![frame(24), frame(48)];
        let bytes = super::super::writer::write(&frames, None).unwrap();

        let mut collector = Collector { images: Vec::new() };
        read(&bytes, &mut collector).unwrap();

        assert_eq!(collector.images, vec![(24, 2, 2), (48, 2, 2)]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut collector = Collector { images: Vec::new() };
        assert!(read(b"NOPE", &mut collector).is_err());
    }
}
