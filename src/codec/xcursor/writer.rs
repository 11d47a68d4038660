//! XCursor writer: `Xcursor`/`ImageChunk`/
//! `TableOfContents` structs laid out with the same `binrw`-declarative
//! style used elsewhere in this crate, generalized to take a caller-ordered
//! list of frames (any nominal size, any count) instead of one fixed cursor.

use binrw::binwrite;

use super::format::{CommentRole, sizes, versions};
use crate::error::{Error, Result};
use crate::model::Frame;

#[binwrite]
#[bw(repr = u32)]
#[derive(Debug, Clone, Copy)]
#[repr(u32)]
enum WireChunkType {
    Comment = 0xfffe_0001,
    Image = 0xfffd_0002,
}

#[binwrite]
#[bw(repr = u32)]
#[derive(Debug, Clone, Copy)]
#[repr(u32)]
enum WireCommentRole {
    Copyright = 1,
    License = 2,
    Other = 3,
}

impl From<CommentRole> for WireCommentRole {
    fn from(role: CommentRole) -> Self {
        match role {
            CommentRole::Copyright => Self::Copyright,
            CommentRole::License => Self::License,
            CommentRole::Other => Self::Other,
        }
    }
}

#[binwrite]
#[bw(little, magic = b"Xcur")]
#[derive(Debug)]
struct FileHeader {
    #[bw(calc = sizes::FILE_HEADER)]
    header_size: u32,
    #[bw(calc = versions::FILE)]
    version: u32,
    #[bw(try_calc = toc.len().try_into())]
    num_toc: u32,
    toc: Vec<TableOfContents>,
}

#[binwrite]
#[bw(little)]
#[derive(Debug, Clone)]
struct TableOfContents {
    r#type: WireChunkType,
    subtype: u32,
    position: u32,
}

#[binwrite]
#[bw(little)]
#[derive(Debug)]
struct CommentChunk {
    #[bw(calc = sizes::COMMENT_HEADER)]
    header_size: u32,
    #[bw(calc = WireChunkType::Comment)]
    r#type: WireChunkType,
    role: WireCommentRole,
    #[bw(calc = versions::COMMENT)]
    version: u32,
    #[bw(try_calc = string.len().try_into())]
    length: u32,
    string: Vec<u8>,
}

#[binwrite]
#[bw(little)]
#[derive(Debug)]
struct ImageChunk {
    #[bw(calc = sizes::IMAGE_HEADER)]
    header_size: u32,
    #[bw(calc = WireChunkType::Image)]
    chunk_type: WireChunkType,
    nominal_size: u32,
    #[bw(calc = versions::IMAGE)]
    version: u32,
    width: u32,
    height: u32,
    hotspot_x: u32,
    hotspot_y: u32,
    delay: u32,
    /// Pre-multiplied, written as little-endian `u32` words whose bytes end
    /// up in `B, G, R, A` order — equivalent to big-endian `A, R, G, B`.
    argb: Vec<u32>,
}

impl ImageChunk {
    fn from_frame(frame: &Frame) -> Result<Self> {
        let (width, height) = frame.image.dimensions();
        if width > super::format::MAX_DIMENSION || height > super::format::MAX_DIMENSION {
            return Err(Error::invalid_data(
                "xcursor::write",
                format!("{width}x{height} exceeds the maximum XCursor dimension"),
            ));
        }

        let mut rgba = frame.image.rgba().to_owned();
        to_pre_argb(&mut rgba);
        let argb = bytemuck::pod_collect_to_vec(&rgba);

        Ok(Self {
            nominal_size: frame.nominal_size,
            width,
            height,
            hotspot_x: frame.hotspot.x,
            hotspot_y: frame.hotspot.y,
            delay: frame.delay_millis,
            argb,
        })
    }
}

/// Converts straight RGBA into little-endian-BGRA (== big-endian ARGB)
/// with premultiplied color channels, in place.
fn to_pre_argb(rgba: &mut [u8]) {
    for pixel in rgba.chunks_exact_mut(4) {
        pixel.swap(0, 2);
        for channel in pixel.iter_mut().take(3) {
            *channel = pre_alpha_formula(*channel, pixel[3]);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn pre_alpha_formula(c: u8, a: u8) -> u8 {
    let prod = (c as u16) * (a as u16);
    ((prod + 127) / 255) as u8
}

/// Serializes `frames` (already ordered `(nominal_size, frame_no)` ascending
/// by [`crate::model::cursor::FrameSet::finish`], which keeps same-size
/// frames contiguous) plus an optional comment into a complete XCursor file.
///
/// ## Errors
///
/// If any frame exceeds [`super::format::MAX_DIMENSION`], or a length
/// overflows `u32` (a file with more data than fits a 32-bit format).
pub fn write(frames: &[Frame], comment: Option<(&str, crate::codec::xcursor::format::CommentRole)>) -> Result<Vec<u8>> {
    let num_toc = frames.len() + usize::from(comment.is_some());
    let num_toc_u32 = u32::try_from(num_toc)
        .map_err(|_| Error::invalid_data("xcursor::write", "too many chunks for a u32 TOC"))?;
    let chunks_offset = sizes::FILE_HEADER + num_toc_u32 * sizes::TOC_ENTRY;

    let mut toc = Vec::with_capacity(num_toc);
    let mut image_chunks = Vec::with_capacity(frames.len());
    let mut position = chunks_offset;

    let comment_chunk = if let Some((text, role)) = comment {
        let len = u32::try_from(text.len())
            .map_err(|_| Error::invalid_data("xcursor::write", "comment too large"))?;
        toc.push(TableOfContents {
            r#type: WireChunkType::Comment,
            subtype: role.as_u32(),
            position,
        });
        position += sizes::COMMENT_HEADER + len;
        Some(CommentChunk {
            role: role.into(),
            string: text.as_bytes().to_vec(),
        })
    } else {
        None
    };

    for frame in frames {
        let chunk = ImageChunk::from_frame(frame)?;
        let payload_len = u32::try_from(chunk.argb.len() * 4)
            .map_err(|_| Error::invalid_data("xcursor::write", "image payload too large"))?;

        toc.push(TableOfContents {
            r#type: WireChunkType::Image,
            subtype: chunk.nominal_size,
            position,
        });
        position += sizes::IMAGE_HEADER + payload_len;
        image_chunks.push(chunk);
    }

    let header = FileHeader { toc };

    let mut out = Vec::new();
    {
        use binrw::BinWrite;
        let mut cursor = std::io::Cursor::new(&mut out);
        header
            .write(&mut cursor)
            .map_err(|e| Error::invalid_data("xcursor::write", e.to_string()))?;
        if let Some(chunk) = &comment_chunk {
            chunk
                .write(&mut cursor)
                .map_err(|e| Error::invalid_data("xcursor::write", e.to_string()))?;
        }
        for chunk in &image_chunks {
            chunk
                .write(&mut cursor)
                .map_err(|e| Error::invalid_data("xcursor::write", e.to_string()))?;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{CursorImage, Hotspot};

    fn frame(nominal_size: u32, frame_no: Option<u32>) -> Frame {
        let image = CursorImage::new(2, 2, vec![10, 20, 30, 255].repeat(4)).unwrap();
        Frame::new(frame_no, image, Hotspot::new(1, 1), nominal_size, 0).unwrap()
    }

    #[test]
    fn writes_magic_and_toc_count() {
        let bytes = write(&[frame(32, None)], None).unwrap();
        assert_eq!(&bytes[0..4], b"Xcur");
        let num_toc = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(num_toc, 1);
    }

    #[test]
    fn groups_multiple_frames_without_error() {
        let frames = vec![frame(24, Some(1)), frame(24, Some(2)), frame(48, Some(1))];
        let bytes = write(&frames, None).unwrap();
        let num_toc = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(num_toc, 3);
    }
}
