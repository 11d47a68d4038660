//! Mousecape `.cape` theme shape, layered over the generic [`super::plist`]
//! tree.

use std::collections::BTreeMap;

use super::plist::Value;
use crate::error::{Error, Result};
use crate::model::CursorImage;

/// One cursor entry inside a Mousecape theme.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub points_wide: f64,
    pub points_high: f64,
    pub hot_spot_x: f64,
    pub hot_spot_y: f64,
    pub frame_count: u32,
    pub frame_duration: f64,
    /// PNG-encoded representations, ascending pixel density (`1×, 2×, …`).
    pub representations: Vec<Vec<u8>>,
}

/// A full `.cape` theme.
#[derive(Debug, Clone)]
pub struct Theme {
    pub author: String,
    pub identifier: String,
    pub name: String,
    pub version: f64,
    /// Keyed by cursor name; a [`BTreeMap`] so iteration is already in the
    /// lexical order the writer needs.
    pub cursors: BTreeMap<String, Cursor>,
}

impl Theme {
    /// Whether any representation's pixel size exceeds its points size —
    /// the writer sets `HiDPI=true` in that case.
    fn is_hidpi(&self, cursor: &Cursor, dims: &[(u32, u32)]) -> bool {
        dims.iter()
            .any(|&(w, h)| f64::from(w) > cursor.points_wide || f64::from(h) > cursor.points_high)
    }
}

/// Serializes `theme` into a complete `.cape` XML document.
///
/// ## Errors
///
/// If a representation's PNG dimensions can't be read back (corrupt PNG
/// bytes supplied by the caller).
pub fn write(theme: &Theme) -> Result<Vec<u8>> {
    let mut cursor_entries = Vec::with_capacity(theme.cursors.len());
    let mut any_hidpi = false;

    for (name, cursor) in &theme.cursors {
        let mut dims = Vec::with_capacity(cursor.representations.len());
        for png in &cursor.representations {
            dims.push(png_dimensions(png)?);
        }
        if theme.is_hidpi(cursor, &dims) {
            any_hidpi = true;
        }

        let representations = Value::Array(
            cursor
                .representations
                .iter()
                .map(|png| Value::Data(png.clone()))
                .collect(),
        );

        cursor_entries.push((
            name.clone(),
            Value::Dict(vec![
                ("FrameCount".to_string(), Value::Integer(i64::from(cursor.frame_count))),
                ("FrameDuration".to_string(), Value::Real(cursor.frame_duration)),
                ("HotSpotX".to_string(), Value::Real(cursor.hot_spot_x)),
                ("HotSpotY".to_string(), Value::Real(cursor.hot_spot_y)),
                ("PointsHigh".to_string(), Value::Real(cursor.points_high)),
                ("PointsWide".to_string(), Value::Real(cursor.points_wide)),
                ("Representations".to_string(), representations),
            ]),
        ));
    }

    let root = Value::Dict(vec![
        ("Author".to_string(), Value::String(theme.author.clone())),
        ("Cursors".to_string(), Value::Dict(cursor_entries)),
        ("HiDPI".to_string(), Value::Bool(any_hidpi)),
        ("Identifier".to_string(), Value::String(theme.identifier.clone())),
        ("Name".to_string(), Value::String(theme.name.clone())),
        ("Version".to_string(), Value::Real(theme.version)),
    ]);

    super::plist::write_document(&root)
}

fn png_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let decoder = png::Decoder::new(bytes);
    let reader = decoder
        .read_info()
        .map_err(|e| Error::invalid_data("mousecape::theme::write", e.to_string()))?;
    let info = reader.info();
    Ok((info.width, info.height))
}

/// One extracted cursor from [`dump`]: per-representation, per-frame
/// bitmaps.
#[derive(Debug)]
pub struct DumpedCursor {
    pub name: String,
    pub hot_spot_x: f64,
    pub hot_spot_y: f64,
    pub frame_duration: f64,
    /// Outer index is representation (density) order; inner is animation
    /// frame order after vertical tiling.
    pub representations: Vec<Vec<CursorImage>>,
}

/// Parses a `.cape` document and extracts every cursor's metadata and
/// frames, splitting each `Representations` PNG into `FrameCount` equal
/// vertical slices when `FrameCount > 1`.
///
/// ## Errors
///
/// If the XML isn't a valid plist, is missing the `Cursors` dict, or a
/// representation's PNG height isn't evenly divisible by its cursor's
/// `FrameCount`.
pub fn dump(xml: &[u8]) -> Result<Vec<DumpedCursor>> {
    let root = super::plist::parse(xml)?;
    let entries = root
        .as_dict()
        .ok_or_else(|| Error::invalid_data("mousecape::theme::dump", "plist root is not a dict"))?;

    let cursors_value = Value::dict_get(entries, "Cursors")
        .ok_or_else(|| Error::invalid_data("mousecape::theme::dump", "missing 'Cursors' dict"))?;
    let cursor_entries = cursors_value
        .as_dict()
        .ok_or_else(|| Error::invalid_data("mousecape::theme::dump", "'Cursors' is not a dict"))?;

    let mut out = Vec::with_capacity(cursor_entries.len());
    for (name, cursor_value) in cursor_entries {
        out.push(dump_cursor(name, cursor_value)?);
    }
    Ok(out)
}

fn dump_cursor(name: &str, value: &Value) -> Result<DumpedCursor> {
    let entries = value
        .as_dict()
        .ok_or_else(|| Error::invalid_data("mousecape::theme::dump", format!("cursor '{name}' is not a dict")))?;

    let field_real = |key: &str| -> Result<f64> {
        Value::dict_get(entries, key)
            .and_then(Value::as_real)
            .ok_or_else(|| Error::invalid_data("mousecape::theme::dump", format!("cursor '{name}' missing '{key}'")))
    };

    let hot_spot_x = field_real("HotSpotX")?;
    let hot_spot_y = field_real("HotSpotY")?;
    let frame_duration = field_real("FrameDuration")?;
    let frame_count = Value::dict_get(entries, "FrameCount")
        .and_then(Value::as_integer)
        .ok_or_else(|| Error::invalid_data("mousecape::theme::dump", format!("cursor '{name}' missing 'FrameCount'")))?;
    let frame_count = u32::try_from(frame_count)
        .map_err(|_| Error::invalid_data("mousecape::theme::dump", "FrameCount out of range"))?
        .max(1);

    let representations = Value::dict_get(entries, "Representations")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::invalid_data("mousecape::theme::dump", format!("cursor '{name}' missing 'Representations'")))?;

    let mut frames_per_representation = Vec::with_capacity(representations.len());
    for rep in representations {
        let png_bytes = rep
            .as_data()
            .ok_or_else(|| Error::invalid_data("mousecape::theme::dump", "Representation entry is not <data>"))?;
        frames_per_representation.push(split_frames(png_bytes, frame_count)?);
    }

    Ok(DumpedCursor {
        name: name.to_string(),
        hot_spot_x,
        hot_spot_y,
        frame_duration,
        representations: frames_per_representation,
    })
}

fn split_frames(png_bytes: &[u8], frame_count: u32) -> Result<Vec<CursorImage>> {
    let decoder = png::Decoder::new(png_bytes);
    let mut reader = decoder
        .read_info()
        .map_err(|e| Error::invalid_data("mousecape::theme::dump", e.to_string()))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| Error::invalid_data("mousecape::theme::dump", e.to_string()))?;
    buf.truncate(info.buffer_size());

    let rgba = match info.color_type {
        png::ColorType::Rgba => buf,
        other => {
            return Err(Error::invalid_data(
                "mousecape::theme::dump",
                format!("unsupported PNG color type {other:?} in Representation"),
            ));
        }
    };

    if info.height % frame_count != 0 {
        return Err(Error::invalid_data(
            "mousecape::theme::dump",
            format!("representation height {} isn't divisible by FrameCount {frame_count}", info.height),
        ));
    }

    let frame_height = info.height / frame_count;
    let row_bytes = (info.width * 4) as usize;
    let mut frames = Vec::with_capacity(frame_count as usize);

    for frame_idx in 0..frame_count {
        let start_row = frame_idx * frame_height;
        let start = (start_row as usize) * row_bytes;
        let end = start + (frame_height as usize) * row_bytes;
        let slice = rgba[start..end].to_vec();
        frames.push(CursorImage::from_straight_rgba(info.width, frame_height, slice)?);
    }

    Ok(frames)
}

#[cfg(test)]
mod test {
    use super::*;

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&vec![200u8; (width * height * 4) as usize]).unwrap();
        drop(writer);
        buf
    }

    #[test]
    fn splits_vertically_tiled_frames() {
        let png = solid_png(4, 16); // FrameCount=4 -> 4 frames of 4x4
        let frames = split_frames(&png, 4).unwrap();
        assert_eq!(frames.len(), 4);
        for frame in &frames {
            assert_eq!(frame.dimensions(), (4, 4));
        }
    }

    #[test]
    fn write_then_dump_round_trips_metadata() {
        let mut cursors = BTreeMap::new();
        cursors.insert(
            "default".to_string(),
            Cursor {
                points_wide: 32.0,
                points_high: 32.0,
                hot_spot_x: 8.0,
                hot_spot_y: 8.0,
                frame_count: 1,
                frame_duration: 0.0,
                representations: vec![solid_png(32, 32)],
            },
        );

        let theme = Theme {
            author: "tester".to_string(),
            identifier: "com.example.theme".to_string(),
            name: "Example".to_string(),
            version: 1.0,
            cursors,
        };

        let xml = write(&theme).unwrap();
        let dumped = dump(&xml).unwrap();
        assert_eq!(dumped.len(), 1);
        assert_eq!(dumped[0].name, "default");
        assert_eq!(dumped[0].hot_spot_x, 8.0);
    }
}
