//! The pluggable output side of the render pipeline.
//!
//! Same "accumulate then flush one file" shape as a theme-saving routine
//! that builds up frames before writing, generalized into a trait so one
//! pipeline drives all four output kinds.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::codec::mousecape;
use crate::codec::windows::{ani, cur};
use crate::codec::xcursor::{self, CommentRole};
use crate::error::{Error, Result};
use crate::model::cursor::{CursorIdentity, Frame, FrameSet, Hotspot};
use crate::model::CursorImage;

/// The four output kinds a [`BuilderFactory`] can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Bitmaps,
    WindowsCursors,
    LinuxCursors,
    MousecapeTheme,
}

/// Theme-wide metadata [`OutputFormat::MousecapeTheme`] needs that the other
/// three formats don't (they write one file per cursor; Mousecape writes one
/// file per theme).
#[derive(Debug, Clone)]
pub struct MousecapeThemeConfig {
    pub author: String,
    pub identifier: String,
    pub theme_name: String,
    pub version: f64,
}

/// Constructs the [`BuilderFactory`] for one [`OutputFormat`], writing into
/// `target_dir`.
///
/// ## Errors
///
/// If `format` is [`OutputFormat::MousecapeTheme`] and `mousecape` is
/// `None`.
pub fn create_factory(
    format: OutputFormat,
    target_dir: PathBuf,
    mousecape: Option<MousecapeThemeConfig>,
) -> Result<Box<dyn BuilderFactory>> {
    match format {
        OutputFormat::Bitmaps => Ok(Box::new(BitmapFactory)),
        OutputFormat::WindowsCursors => Ok(Box::new(WindowsCursorFactory)),
        OutputFormat::LinuxCursors => Ok(Box::new(XCursorFactory)),
        OutputFormat::MousecapeTheme => {
            let cfg = mousecape.ok_or_else(|| {
                Error::InvalidArgument("OutputFormat::MousecapeTheme requires theme metadata".to_string())
            })?;
            Ok(Box::new(MousecapeThemeFactory::new(
                target_dir,
                cfg.author,
                cfg.identifier,
                cfg.theme_name,
                cfg.version,
            )))
        }
    }
}

/// Per-cursor accumulation target a [`crate::render::pipeline`] streams
/// frames into.
pub trait CursorBuilder {
    /// Idempotent per `(nominal_size, frame_no)`; a second call with the
    /// same key replaces the first.
    ///
    /// ## Errors
    ///
    /// If called after [`Self::build`], or with `frame_no = None` on an
    /// animated identity.
    fn add_frame(
        &mut self,
        frame_no: Option<u32>,
        image: CursorImage,
        hotspot: Hotspot,
        nominal_size: u32,
        delay_millis: u32,
    ) -> Result<()>;

    /// Flushes accumulated frames and commits them to disk. Must be called
    /// exactly once.
    ///
    /// ## Errors
    ///
    /// If called twice, or the accumulated frames violate a [`FrameSet`]
    /// invariant, or the underlying write fails.
    fn build(&mut self) -> Result<()>;
}

/// Constructs [`CursorBuilder`]s for one output format, with an optional
/// theme-wide `finalize` for formats that emit a single file per theme
/// (Mousecape).
pub trait BuilderFactory {
    /// ## Errors
    ///
    /// If the identity/target combination can't be prepared (e.g. an
    /// unwritable directory).
    fn create_builder(
        &mut self,
        identity: &CursorIdentity,
        target_dir: &Path,
    ) -> Result<Box<dyn CursorBuilder>>;

    /// ## Errors
    ///
    /// If the theme-level flush fails. The default no-op is correct for
    /// every format that writes one file per cursor.
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes `bytes` to `path` via a sibling `.tmp` file and rename, so a
/// crash or panic mid-write never leaves a half-written file at `path`.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Shared bookkeeping every concrete builder delegates to: the
/// already-built guard and the animated-frame-no
/// invariant, on top of [`FrameSet`].
struct Accumulator {
    identity: CursorIdentity,
    frames: FrameSet,
    built: bool,
}

impl Accumulator {
    fn new(identity: CursorIdentity) -> Self {
        Self {
            identity,
            frames: FrameSet::new(),
            built: false,
        }
    }

    fn add_frame(
        &mut self,
        frame_no: Option<u32>,
        image: CursorImage,
        hotspot: Hotspot,
        nominal_size: u32,
        delay_millis: u32,
    ) -> Result<()> {
        if self.built {
            return Err(Error::BuilderFinalized);
        }
        if self.identity.is_animated() && frame_no.is_none() {
            return Err(Error::invalid_data(
                "CursorBuilder::add_frame",
                format!("'{}' is animated; frame_no is mandatory", self.identity.name),
            ));
        }
        self.frames
            .insert(Frame::new(frame_no, image, hotspot, nominal_size, delay_millis)?);
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<Frame>> {
        if self.built {
            return Err(Error::BuilderFinalized);
        }
        self.built = true;
        std::mem::take(&mut self.frames).finish(&self.identity)
    }
}

/// Writes one PNG per `(nominal_size, frame_no)`.
pub struct BitmapBuilder {
    acc: Accumulator,
    target_dir: PathBuf,
}

impl CursorBuilder for BitmapBuilder {
    fn add_frame(&mut self, frame_no: Option<u32>, image: CursorImage, hotspot: Hotspot, nominal_size: u32, delay_millis: u32) -> Result<()> {
        self.acc.add_frame(frame_no, image, hotspot, nominal_size, delay_millis)
    }

    fn build(&mut self) -> Result<()> {
        let name = self.acc.identity.name.clone();
        let frames = self.acc.finish()?;
        for frame in &frames {
            let filename = match frame.frame_no {
                Some(n) => format!("{name}-{}-{n}.png", frame.nominal_size),
                None => format!("{name}-{}.png", frame.nominal_size),
            };
            let bytes = encode_png(&frame.image)?;
            atomic_write(&self.target_dir.join(filename), &bytes)?;
        }
        Ok(())
    }
}

/// Builds `CUR` (static) or `ANI` (animated) Windows cursor files (spec
/// §4.F `Factory`, `WINDOWS_CURSORS`).
pub struct WindowsCursorBuilder {
    acc: Accumulator,
    animated: bool,
    target_path: PathBuf,
}

impl CursorBuilder for WindowsCursorBuilder {
    fn add_frame(&mut self, frame_no: Option<u32>, image: CursorImage, hotspot: Hotspot, nominal_size: u32, delay_millis: u32) -> Result<()> {
        self.acc.add_frame(frame_no, image, hotspot, nominal_size, delay_millis)
    }

    fn build(&mut self) -> Result<()> {
        let frames = self.acc.finish()?;

        let bytes = if self.animated {
            let mut by_frame: BTreeMap<u32, Vec<Frame>> = BTreeMap::new();
            for frame in frames {
                by_frame.entry(frame.frame_no.unwrap_or(0)).or_default().push(frame);
            }

            let mut steps = Vec::with_capacity(by_frame.len());
            for (_, mut group) in by_frame {
                group.sort_by_key(|f| f.nominal_size);
                let delay_millis = group[0].delay_millis;
                let cur_bytes = cur::write(&group, cur::CurEncoding::Png)?;
                steps.push((delay_millis, cur_bytes));
            }
            ani::write(&steps)?
        } else {
            cur::write(&frames, cur::CurEncoding::Png)?
        };

        atomic_write(&self.target_path, &bytes)
    }
}

/// Builds an XCursor file, all frames of one nominal size contiguous (spec
/// §4.F `Factory`, `LINUX_CURSORS`).
pub struct XCursorBuilder {
    acc: Accumulator,
    target_path: PathBuf,
    comment: Option<(String, CommentRole)>,
}

impl CursorBuilder for XCursorBuilder {
    fn add_frame(&mut self, frame_no: Option<u32>, image: CursorImage, hotspot: Hotspot, nominal_size: u32, delay_millis: u32) -> Result<()> {
        self.acc.add_frame(frame_no, image, hotspot, nominal_size, delay_millis)
    }

    fn build(&mut self) -> Result<()> {
        let frames = self.acc.finish()?;
        let comment = self.comment.as_ref().map(|(text, role)| (text.as_str(), *role));
        let bytes = xcursor::write(&frames, comment)?;
        atomic_write(&self.target_path, &bytes)
    }
}

/// One theme-shared cursor accumulator; `build()` registers into the
/// factory's shared table instead of writing a file — the whole theme is
/// written once from [`MousecapeThemeFactory::finalize`].
pub struct MousecapeThemeBuilder {
    acc: Accumulator,
    cursor_name: String,
    shared: Rc<RefCell<BTreeMap<String, mousecape::Cursor>>>,
}

impl CursorBuilder for MousecapeThemeBuilder {
    fn add_frame(&mut self, frame_no: Option<u32>, image: CursorImage, hotspot: Hotspot, nominal_size: u32, delay_millis: u32) -> Result<()> {
        self.acc.add_frame(frame_no, image, hotspot, nominal_size, delay_millis)
    }

    fn build(&mut self) -> Result<()> {
        let frames = self.acc.finish()?;

        let mut by_size: BTreeMap<u32, Vec<Frame>> = BTreeMap::new();
        for frame in frames {
            by_size.entry(frame.nominal_size).or_default().push(frame);
        }

        let mut representations = Vec::with_capacity(by_size.len());
        let (mut points_wide, mut points_high) = (0.0, 0.0);
        let (mut hot_spot_x, mut hot_spot_y) = (0.0, 0.0);
        let mut frame_count = 1u32;
        let mut frame_duration = 0.0;

        for (i, (size, mut group)) in by_size.into_iter().enumerate() {
            group.sort_by_key(|f| f.frame_no.unwrap_or(0));
            if i == 0 {
                points_wide = f64::from(size);
                points_high = f64::from(size);
                hot_spot_x = f64::from(group[0].hotspot.x);
                hot_spot_y = f64::from(group[0].hotspot.y);
                frame_count = u32::try_from(group.len()).unwrap_or(1);
                frame_duration = f64::from(group[0].delay_millis) / 1000.0;
            }
            representations.push(tile_frames_to_png(&group)?);
        }

        self.shared.borrow_mut().insert(
            self.cursor_name.clone(),
            mousecape::Cursor {
                points_wide,
                points_high,
                hot_spot_x,
                hot_spot_y,
                frame_count,
                frame_duration,
                representations,
            },
        );

        Ok(())
    }
}

fn tile_frames_to_png(frames: &[Frame]) -> Result<Vec<u8>> {
    let (width, height) = frames[0].image.dimensions();
    let mut rgba = Vec::with_capacity(frames.len() * (width * height * 4) as usize);
    for frame in frames {
        if frame.image.dimensions() != (width, height) {
            return Err(Error::invalid_data(
                "render::builder::tile_frames_to_png",
                "every frame of one nominal size must share pixel dimensions",
            ));
        }
        rgba.extend_from_slice(&frame.image.to_straight_rgba());
    }

    let total_height = height * u32::try_from(frames.len()).unwrap_or(1);
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, width, total_height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| Error::invalid_data("render::builder::tile_frames_to_png", e.to_string()))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| Error::invalid_data("render::builder::tile_frames_to_png", e.to_string()))?;
    }
    Ok(buf)
}

fn encode_png(image: &CursorImage) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| Error::invalid_data("render::builder::encode_png", e.to_string()))?;
        writer
            .write_image_data(&image.to_straight_rgba())
            .map_err(|e| Error::invalid_data("render::builder::encode_png", e.to_string()))?;
    }
    Ok(buf)
}

pub struct BitmapFactory;

impl BuilderFactory for BitmapFactory {
    fn create_builder(&mut self, identity: &CursorIdentity, target_dir: &Path) -> Result<Box<dyn CursorBuilder>> {
        Ok(Box::new(BitmapBuilder {
            acc: Accumulator::new(identity.clone()),
            target_dir: target_dir.to_path_buf(),
        }))
    }
}

pub struct WindowsCursorFactory;

impl BuilderFactory for WindowsCursorFactory {
    fn create_builder(&mut self, identity: &CursorIdentity, target_dir: &Path) -> Result<Box<dyn CursorBuilder>> {
        let ext = if identity.is_animated() { "ani" } else { "cur" };
        Ok(Box::new(WindowsCursorBuilder {
            acc: Accumulator::new(identity.clone()),
            animated: identity.is_animated(),
            target_path: target_dir.join(format!("{}.{ext}", identity.name)),
        }))
    }
}

pub struct XCursorFactory;

impl BuilderFactory for XCursorFactory {
    fn create_builder(&mut self, identity: &CursorIdentity, target_dir: &Path) -> Result<Box<dyn CursorBuilder>> {
        Ok(Box::new(XCursorBuilder {
            acc: Accumulator::new(identity.clone()),
            target_path: target_dir.join(&identity.name),
            comment: None,
        }))
    }
}

/// Accumulates every cursor of a theme into a shared table; `finalize`
/// writes the single `.cape` file.
pub struct MousecapeThemeFactory {
    target_dir: PathBuf,
    author: String,
    identifier: String,
    theme_name: String,
    version: f64,
    cursors: Rc<RefCell<BTreeMap<String, mousecape::Cursor>>>,
}

impl MousecapeThemeFactory {
    #[must_use]
    pub fn new(target_dir: PathBuf, author: String, identifier: String, theme_name: String, version: f64) -> Self {
        Self {
            target_dir,
            author,
            identifier,
            theme_name,
            version,
            cursors: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }
}

impl BuilderFactory for MousecapeThemeFactory {
    fn create_builder(&mut self, identity: &CursorIdentity, _target_dir: &Path) -> Result<Box<dyn CursorBuilder>> {
        Ok(Box::new(MousecapeThemeBuilder {
            acc: Accumulator::new(identity.clone()),
            cursor_name: identity.name.clone(),
            shared: Rc::clone(&self.cursors),
        }))
    }

    fn finalize(&mut self) -> Result<()> {
        let theme = mousecape::Theme {
            author: self.author.clone(),
            identifier: self.identifier.clone(),
            name: self.theme_name.clone(),
            version: self.version,
            cursors: self.cursors.borrow().clone(),
        };
        let xml = mousecape::write(&theme)?;
        atomic_write(&self.target_dir.join(format!("{}.cape", self.theme_name)), &xml)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::cursor::Animation;

    fn solid(w: u32, h: u32) -> CursorImage {
        CursorImage::from_straight_rgba(w, h, vec![10, 20, 30, 200].repeat((w * h) as usize)).unwrap()
    }

    #[test]
    fn create_factory_dispatches_on_output_format() {
        let dir = tempfile::tempdir().unwrap().path().to_path_buf();
        assert!(create_factory(OutputFormat::Bitmaps, dir.clone(), None).is_ok());
        assert!(create_factory(OutputFormat::WindowsCursors, dir.clone(), None).is_ok());
        assert!(create_factory(OutputFormat::LinuxCursors, dir.clone(), None).is_ok());
    }

    #[test]
    fn mousecape_format_requires_theme_config() {
        let dir = tempfile::tempdir().unwrap().path().to_path_buf();
        let err = create_factory(OutputFormat::MousecapeTheme, dir.clone(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let cfg = MousecapeThemeConfig {
            author: "tester".into(),
            identifier: "com.example.theme".into(),
            theme_name: "Example".into(),
            version: 1.0,
        };
        assert!(create_factory(OutputFormat::MousecapeTheme, dir, Some(cfg)).is_ok());
    }

    #[test]
    fn add_frame_after_build_is_finalized_error() {
        let identity = CursorIdentity::static_cursor("default".into());
        let dir = tempfile::tempdir().unwrap();
        let mut builder = BitmapBuilder {
            acc: Accumulator::new(identity),
            target_dir: dir.path().to_path_buf(),
        };
        builder.add_frame(None, solid(4, 4), Hotspot::new(0, 0), 32, 0).unwrap();
        builder.build().unwrap();

        let err = builder.add_frame(None, solid(4, 4), Hotspot::new(0, 0), 32, 0).unwrap_err();
        assert!(matches!(err, Error::BuilderFinalized));
    }

    #[test]
    fn animated_rejects_missing_frame_no() {
        let identity = CursorIdentity {
            name: "progress".into(),
            animation: Some(Animation {
                frame_count: 2,
                frame_delay_ms: 100,
                jump_frame: None,
            }),
        };
        let mut acc = Accumulator::new(identity);
        let err = acc.add_frame(None, solid(4, 4), Hotspot::new(0, 0), 32, 100).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }

    #[test]
    fn mousecape_finalize_writes_a_cape_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();

        let mut factory = MousecapeThemeFactory::new(
            dir.clone(),
            "tester".into(),
            "com.example.theme".into(),
            "Example".into(),
            1.0,
        );

        let identity = CursorIdentity::static_cursor("default".into());
        let mut builder = factory.create_builder(&identity, &dir).unwrap();
        builder.add_frame(None, solid(4, 4), Hotspot::new(2, 2), 32, 0).unwrap();
        builder.build().unwrap();

        factory.finalize().unwrap();
        assert!(dir.join("Example.cape").exists());
    }
}
