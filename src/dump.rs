//! Dump dispatcher: format sniffing plus decode-to-files.
//!
//! An explicit probe/decode registry, keyed by magic bytes, that covers
//! XCursor, Windows CUR/ANI, and Mousecape — including formats like
//! Mousecape that have no meaningful file extension convention to dispatch
//! on.

use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::mousecape;
use crate::codec::windows::{ani, cur};
use crate::codec::xcursor;
use crate::error::{Error, Result};
use crate::model::CursorImage;

/// One dumped frame, ready to be written out as a standalone PNG by the
/// caller (out of scope here — this module only decodes).
pub struct DumpedFrame {
    pub cursor_name: String,
    pub representation: usize,
    pub frame_no: Option<u32>,
    pub nominal_size: Option<u32>,
    pub hotspot_x: f64,
    pub hotspot_y: f64,
    pub delay_millis: Option<u32>,
    pub image: CursorImage,
}

/// Which format [`sniff`] recognized a file as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    XCursor,
    WindowsCur,
    WindowsAni,
    Mousecape,
}

/// Probes `bytes` against every registered decoder's magic, in the order a
/// real-world file is most likely to match.
///
/// Each check reads only the bytes it needs to decide, matching §4.G's "read
/// as little as possible" contract; there is no shared cursor to rewind
/// since every probe works off the same borrowed slice.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<DetectedFormat> {
    if bytes.len() >= 4 && &bytes[0..4] == xcursor::format::MAGIC.as_slice() {
        return Some(DetectedFormat::XCursor);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"ACON" {
        return Some(DetectedFormat::WindowsAni);
    }
    if bytes.len() >= 6 && bytes[0..4] == [0, 0, 2, 0] {
        return Some(DetectedFormat::WindowsCur);
    }
    if looks_like_plist(bytes) {
        return Some(DetectedFormat::Mousecape);
    }
    None
}

fn looks_like_plist(bytes: &[u8]) -> bool {
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    text.contains("<!DOCTYPE plist") || text.contains("<plist")
}

/// Reads `path`, sniffs its format, and decodes every frame it contains.
///
/// ## Errors
///
/// [`Error::UnsupportedFormat`] if no registered decoder recognizes the
/// file; [`Error::InvalidData`]/[`Error::UnexpectedEnd`] if the recognized
/// format is itself malformed. Per §7, a decode failure here is fatal for
/// this one file only — callers iterating many files should catch and
/// continue to the next one.
pub fn dump_file(path: &Path) -> Result<Vec<DumpedFrame>> {
    let bytes = fs::read(path)?;
    let cursor_name = path
        .file_stem()
        .map_or_else(|| "cursor".to_string(), |s| s.to_string_lossy().into_owned());

    match sniff(&bytes) {
        Some(DetectedFormat::XCursor) => dump_xcursor(&bytes, &cursor_name),
        Some(DetectedFormat::WindowsCur) => dump_cur(&bytes, &cursor_name),
        Some(DetectedFormat::WindowsAni) => dump_ani(&bytes, &cursor_name),
        Some(DetectedFormat::Mousecape) => dump_mousecape(&bytes),
        None => Err(Error::UnsupportedFormat {
            path: PathBuf::from(path),
        }),
    }
}

fn dump_xcursor(bytes: &[u8], cursor_name: &str) -> Result<Vec<DumpedFrame>> {
    struct Collector {
        cursor_name: String,
        out: Result<Vec<DumpedFrame>>,
    }

    impl xcursor::XcursorVisitor for Collector {
        fn image(
            &mut self,
            nominal_size: u32,
            _chunk_version: u32,
            width: u32,
            height: u32,
            xhot: u32,
            yhot: u32,
            delay: u32,
            pixels: &mut crate::io::ByteReader<'_>,
        ) -> Result<()> {
            let raw = pixels.remaining_to_vec();
            let rgba = xcursor::reader::argb_to_premultiplied_rgba(&raw);
            let image = CursorImage::new(width, height, rgba)?;

            if let Ok(frames) = &mut self.out {
                frames.push(DumpedFrame {
                    cursor_name: self.cursor_name.clone(),
                    representation: 0,
                    frame_no: None,
                    nominal_size: Some(nominal_size),
                    hotspot_x: f64::from(xhot),
                    hotspot_y: f64::from(yhot),
                    delay_millis: Some(delay),
                    image,
                });
            }
            Ok(())
        }
    }

    let mut collector = Collector {
        cursor_name: cursor_name.to_string(),
        out: Ok(Vec::new()),
    };
    xcursor::read(bytes, &mut collector)?;
    collector.out
}

fn dump_cur(bytes: &[u8], cursor_name: &str) -> Result<Vec<DumpedFrame>> {
    let images = cur::read(bytes)?;
    Ok(images
        .into_iter()
        .map(|decoded| DumpedFrame {
            cursor_name: cursor_name.to_string(),
            representation: 0,
            frame_no: None,
            nominal_size: Some(decoded.image.width().max(decoded.image.height())),
            hotspot_x: f64::from(decoded.hotspot.x),
            hotspot_y: f64::from(decoded.hotspot.y),
            delay_millis: None,
            image: decoded.image,
        })
        .collect())
}

fn dump_ani(bytes: &[u8], cursor_name: &str) -> Result<Vec<DumpedFrame>> {
    let decoded = ani::read(bytes)?;
    let mut out = Vec::new();

    for (step_no, step) in decoded.steps.iter().enumerate() {
        let images = cur::read(&step.cur_bytes)?;
        let delay_millis = step.delay_jiffies * 1000 / 60;
        for decoded_image in images {
            out.push(DumpedFrame {
                cursor_name: cursor_name.to_string(),
                representation: 0,
                frame_no: Some(u32::try_from(step_no + 1).unwrap_or(u32::MAX)),
                nominal_size: Some(decoded_image.image.width().max(decoded_image.image.height())),
                hotspot_x: f64::from(decoded_image.hotspot.x),
                hotspot_y: f64::from(decoded_image.hotspot.y),
                delay_millis: Some(delay_millis),
                image: decoded_image.image,
            });
        }
    }

    Ok(out)
}

fn dump_mousecape(bytes: &[u8]) -> Result<Vec<DumpedFrame>> {
    let cursors = mousecape::dump(bytes)?;
    let mut out = Vec::new();

    for cursor in cursors {
        let delay_millis = (cursor.frame_duration * 1000.0).round() as u32;
        for (rep_idx, frames) in cursor.representations.into_iter().enumerate() {
            let frame_count = frames.len();
            for (i, image) in frames.into_iter().enumerate() {
                out.push(DumpedFrame {
                    cursor_name: cursor.name.clone(),
                    representation: rep_idx,
                    frame_no: (frame_count > 1).then_some(u32::try_from(i + 1).unwrap_or(u32::MAX)),
                    nominal_size: None,
                    hotspot_x: cursor.hot_spot_x,
                    hotspot_y: cursor.hot_spot_y,
                    delay_millis: (frame_count > 1).then_some(delay_millis),
                    image,
                });
            }
        }
    }

    Ok(out)
}

/// Writes every frame `dump_file` decoded to `out_dir` as one PNG per
/// frame, named `{cursor_name}-{representation}-{frame_no or "static"}.png`.
///
/// ## Errors
///
/// If `out_dir` can't be created, PNG encoding fails, or a write fails.
pub fn write_frames(frames: &[DumpedFrame], out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    for frame in frames {
        let suffix = frame.frame_no.map_or_else(|| "static".to_string(), |n| n.to_string());
        let filename = if frame.representation == 0 {
            format!("{}-{suffix}.png", frame.cursor_name)
        } else {
            format!("{}-{}x-{suffix}.png", frame.cursor_name, frame.representation + 1)
        };

        let (width, height) = frame.image.dimensions();
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buf, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| Error::invalid_data("dump::write_frames", e.to_string()))?;
            writer
                .write_image_data(&frame.image.to_straight_rgba())
                .map_err(|e| Error::invalid_data("dump::write_frames", e.to_string()))?;
        }
        fs::write(out_dir.join(filename), buf)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{Frame, Hotspot};

    fn frame(nominal_size: u32) -> Frame {
        let image = CursorImage::new(2, 2, vec![10, 20, 30, 255].repeat(4)).unwrap();
        Frame::new(None, image, Hotspot::new(1, 1), nominal_size, 0).unwrap()
    }

    #[test]
    fn sniffs_xcursor_by_magic() {
        let bytes = xcursor::write(&[frame(32)], None).unwrap();
        assert_eq!(sniff(&bytes), Some(DetectedFormat::XCursor));
    }

    #[test]
    fn sniffs_cur_by_ico_type() {
        let bytes = cur::write(&[frame(32)], cur::CurEncoding::Png).unwrap();
        assert_eq!(sniff(&bytes), Some(DetectedFormat::WindowsCur));
    }

    #[test]
    fn sniffs_ani_by_riff_acon() {
        let cur_bytes = cur::write(&[frame(32)], cur::CurEncoding::Png).unwrap();
        let bytes = ani::write(&[(100, cur_bytes)]).unwrap();
        assert_eq!(sniff(&bytes), Some(DetectedFormat::WindowsAni));
    }

    #[test]
    fn unrecognized_bytes_yield_no_format() {
        assert_eq!(sniff(b"not a cursor file at all"), None);
    }

    #[test]
    fn dump_file_reports_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        fs::write(&path, b"definitely not a cursor").unwrap();

        let err = dump_file(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn xcursor_round_trip_dump_matches_written_frames() {
        let frames = vec![frame(24), frame(48)];
        let bytes = xcursor::write(&frames, None).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default");
        fs::write(&path, bytes).unwrap();

        let dumped = dump_file(&path).unwrap();
        assert_eq!(dumped.len(), 2);
        assert_eq!(dumped[0].nominal_size, Some(24));
        assert_eq!(dumped[1].nominal_size, Some(48));
    }
}
