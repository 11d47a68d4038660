//! `bibata svgsize` / `bibata wincur` / `bibata render`.
//!
//! `wincur` is the one subcommand fully implementable without an external
//! SVG rasterizer: it reads pre-rendered PNG frames and drives the same
//! [`mousegen::render::builder`] machinery the full `render` pipeline uses.
//! `render` itself needs a concrete [`mousegen::render::SvgRasterizer`]
//! implementation, which is out of this crate's core — see
//! `UnavailableRasterizer` below.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use regex::Regex;

use mousegen::cli::{BibataArgs, BibataCommand};
use mousegen::error;
use mousegen::model::cursor::{CursorIdentity, Hotspot};
use mousegen::model::CursorImage;
use mousegen::render::builder::{BuilderFactory, WindowsCursorFactory};
use mousegen::render::SvgRasterizer;

fn main() -> Result<()> {
    env_logger::init();
    let args = BibataArgs::parse();

    match args.command {
        BibataCommand::Svgsize { target_size, viewbox_size, svg_dir } => svgsize(target_size, viewbox_size, &svg_dir),
        BibataCommand::Wincur { all_cursors, bitmaps_dir } => wincur(&bitmaps_dir, all_cursors),
        BibataCommand::Render { base_path, standard_sizes, windows_cursors } => {
            render(base_path.as_deref(), standard_sizes, windows_cursors)
        }
    }
}

/// Rewrites every SVG's root `width`/`height`/`viewBox` attributes in place.
fn svgsize(target_size: u32, viewbox_size: u32, svg_dir: &Path) -> Result<()> {
    let root_tag = Regex::new(r"(?s)<svg\b[^>]*>").context("building the <svg> root-tag pattern")?;
    let width_attr = Regex::new(r#"width="[^"]*""#).unwrap();
    let height_attr = Regex::new(r#"height="[^"]*""#).unwrap();
    let viewbox_attr = Regex::new(r#"viewBox="[^"]*""#).unwrap();

    let files = mousegen::fs_utils::find_extensions_icase(svg_dir, &["svg"])
        .with_context(|| format!("reading svg_dir={}", svg_dir.display()))?;

    let mut count = 0;
    for path in files {
        let original = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;

        let Some(tag_match) = root_tag.find(&original) else {
            log::warn!("no <svg> root element found in {}, skipping", path.display());
            continue;
        };
        let mut tag = tag_match.as_str().to_string();

        let width = format!(r#"width="{target_size}""#);
        let height = format!(r#"height="{target_size}""#);
        let viewbox = format!(r#"viewBox="0 0 {viewbox_size} {viewbox_size}""#);

        tag = replace_or_insert(&tag, &width_attr, &width);
        tag = replace_or_insert(&tag, &height_attr, &height);
        tag = replace_or_insert(&tag, &viewbox_attr, &viewbox);

        let rewritten = format!("{}{}{}", &original[..tag_match.start()], tag, &original[tag_match.end()..]);
        std::fs::write(&path, rewritten).with_context(|| format!("writing {}", path.display()))?;
        count += 1;
    }

    log::info!("resized {count} SVG file(s) in {}", svg_dir.display());
    Ok(())
}

fn replace_or_insert(tag: &str, attr: &Regex, replacement: &str) -> String {
    if attr.is_match(tag) {
        attr.replace(tag, replacement).into_owned()
    } else {
        // No existing attribute to replace: insert just before the tag's closing `>`
        // (or `/>`), e.g. `<svg foo="bar">` -> `<svg foo="bar" width="32">`.
        let insert_at = tag.strip_suffix("/>").map_or_else(|| tag.len() - 1, |_| tag.len() - 2);
        format!("{} {replacement}{}", &tag[..insert_at], &tag[insert_at..])
    }
}

/// Filenames this command understands: `{cursor}-{size}.png` (static) or
/// `{cursor}-{size}-{frame}.png` (animated), matching
/// [`mousegen::render::builder::BitmapBuilder`]'s own output convention.
/// An optional `{cursor}.hotspot` sidecar (`"x y"`) overrides the
/// center-of-bitmap default hotspot.
fn wincur(bitmaps_dir: &Path, all_cursors: bool) -> Result<()> {
    let name_pattern = Regex::new(r"^(?P<name>.+?)-(?P<size>\d+)(?:-(?P<frame>\d+))?$").unwrap();

    let files: Vec<PathBuf> = mousegen::fs_utils::find_extensions_icase(bitmaps_dir, &["png"])
        .with_context(|| format!("reading bitmaps_dir={}", bitmaps_dir.display()))?
        .collect();

    let mut by_cursor: BTreeMap<String, Vec<(u32, Option<u32>, PathBuf)>> = BTreeMap::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        let Some(caps) = name_pattern.captures(stem) else {
            log::warn!("{} doesn't match the '{{name}}-{{size}}[-{{frame}}].png' convention, skipping", path.display());
            continue;
        };
        let name = caps["name"].to_string();
        let size: u32 = caps["size"].parse().context("parsing nominal size from filename")?;
        let frame_no = caps.name("frame").map(|m| m.as_str().parse()).transpose()?;
        by_cursor.entry(name).or_default().push((size, frame_no, path));
    }

    if by_cursor.is_empty() {
        bail!("no PNG frames matching '{{name}}-{{size}}[-{{frame}}].png' found in {}", bitmaps_dir.display());
    }

    let mut factory = WindowsCursorFactory;
    let mut failures = 0;

    for (name, entries) in &by_cursor {
        let result = build_one_windows_cursor(&mut factory, name, entries, bitmaps_dir);
        if let Err(err) = result {
            log::error!("failed to build {name}: {err}");
            failures += 1;
            if !all_cursors {
                bail!("stopping after first failure (pass --all-cursors to continue past failures)");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} cursor(s) failed to build", by_cursor.len());
    }
    Ok(())
}

fn build_one_windows_cursor(
    factory: &mut WindowsCursorFactory,
    name: &str,
    entries: &[(u32, Option<u32>, PathBuf)],
    target_dir: &Path,
) -> Result<()> {
    let animated = entries.iter().any(|(_, frame_no, _)| frame_no.is_some());
    let identity = if animated {
        let frame_count = entries.iter().filter_map(|(_, f, _)| *f).max().unwrap_or(1);
        CursorIdentity {
            name: name.to_string(),
            animation: Some(mousegen::model::cursor::Animation {
                frame_count,
                frame_delay_ms: 100,
                jump_frame: None,
            }),
        }
    } else {
        CursorIdentity::static_cursor(name.to_string())
    };

    let hotspot_override = read_hotspot_sidecar(&target_dir.join(format!("{name}.hotspot")))?;

    let mut builder = factory.create_builder(&identity, target_dir)?;
    for (size, frame_no, path) in entries {
        let image = decode_png_to_cursor_image(path)?;
        let hotspot = hotspot_override.unwrap_or_else(|| {
            let (w, h) = image.dimensions();
            Hotspot::new(w / 2, h / 2)
        });
        builder.add_frame(*frame_no, image, hotspot, *size, 100)?;
    }
    builder.build()?;
    Ok(())
}

fn read_hotspot_sidecar(path: &Path) -> Result<Option<Hotspot>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    let mut parts = text.split_whitespace();
    let x: u32 = parts.next().ok_or_else(|| anyhow!("empty hotspot sidecar {}", path.display()))?.parse()?;
    let y: u32 = parts.next().ok_or_else(|| anyhow!("missing y in hotspot sidecar {}", path.display()))?.parse()?;
    Ok(Some(Hotspot::new(x, y)))
}

fn decode_png_to_cursor_image(path: &Path) -> Result<CursorImage> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let decoder = png::Decoder::new(bytes.as_slice());
    let mut reader = decoder.read_info().with_context(|| format!("decoding PNG header of {}", path.display()))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).with_context(|| format!("decoding PNG frame of {}", path.display()))?;
    buf.truncate(info.buffer_size());

    let rgba = match info.color_type {
        png::ColorType::Rgba => buf,
        other => bail!("{}: unsupported PNG color type {other:?}, expected RGBA", path.display()),
    };

    Ok(CursorImage::from_straight_rgba(info.width, info.height, rgba)?)
}

/// The `SvgRasterizer` boundary has no bundled implementation: rasterization
/// is out of this crate's core. A real deployment supplies its own
/// (headless browser, `resvg`, etc.) and wires it in where this stub sits.
struct UnavailableRasterizer;

impl SvgRasterizer for UnavailableRasterizer {
    fn render(
        &self,
        _svg_bytes: &[u8],
        _width_px: u32,
        _height_px: u32,
        _color_map: &BTreeMap<String, String>,
        _stroke_width: Option<f64>,
        _drop_shadow: Option<&mousegen::model::variant::DropShadow>,
    ) -> error::Result<(CursorImage, Hotspot)> {
        Err(error::Error::InvalidArgument(
            "no SvgRasterizer is linked into this binary; render is structural glue over \
             mousegen::render::SvgRasterizer, the actual rasterizer is an external dependency"
                .to_string(),
        ))
    }
}

fn render(base_path: Option<&Path>, _standard_sizes: bool, _windows_cursors: bool) -> Result<()> {
    let base = base_path.unwrap_or_else(|| Path::new("."));
    let _rasterizer = UnavailableRasterizer;
    bail!(
        "bibata render over {} requires an SvgRasterizer implementation to be linked in; \
         none ships with this crate (see UnavailableRasterizer in src/bin/bibata.rs)",
        base.display()
    )
}
