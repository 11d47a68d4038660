//! Cursor/frame identity types.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::model::image::CursorImage;

/// A pixel position inside a [`CursorImage`]'s bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotspot {
    pub x: u32,
    pub y: u32,
}

impl Hotspot {
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Checks that the hotspot lies inside the bitmap's bounds.
    #[must_use]
    pub const fn is_within(&self, width: u32, height: u32) -> bool {
        self.x <= width && self.y <= height
    }
}

/// Animation metadata for a cursor identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub frame_count: u32,
    pub frame_delay_ms: u32,
    pub jump_frame: Option<u32>,
}

/// A stable cursor name plus optional animation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorIdentity {
    pub name: String,
    pub animation: Option<Animation>,
}

impl CursorIdentity {
    #[must_use]
    pub const fn static_cursor(name: String) -> Self {
        Self {
            name,
            animation: None,
        }
    }

    #[must_use]
    pub const fn is_animated(&self) -> bool {
        self.animation.is_some()
    }
}

/// One rendered image of a cursor at one nominal size, at one point in its
/// animation (or the only frame, for static cursors).
#[derive(Debug, Clone)]
pub struct Frame {
    /// 1-based; `None` means "the single static frame". Mandatory for
    /// animated cursors — constructing one with `None` on an animated
    /// identity is a programmer error.
    pub frame_no: Option<u32>,
    pub image: CursorImage,
    pub hotspot: Hotspot,
    /// The logical size (e.g. 32) this bitmap renders at, independent of its
    /// actual pixel dimensions.
    pub nominal_size: u32,
    pub delay_millis: u32,
}

impl Frame {
    /// Constructs a frame, validating the hotspot-in-bounds invariant.
    ///
    /// ## Errors
    ///
    /// If the hotspot lies outside the image bounds.
    pub fn new(
        frame_no: Option<u32>,
        image: CursorImage,
        hotspot: Hotspot,
        nominal_size: u32,
        delay_millis: u32,
    ) -> Result<Self> {
        let (w, h) = image.dimensions();
        if !hotspot.is_within(w, h) {
            return Err(Error::invalid_data(
                "Frame::new",
                format!("hotspot {hotspot:?} lies outside {w}x{h} bounds"),
            ));
        }

        Ok(Self {
            frame_no,
            image,
            hotspot,
            nominal_size,
            delay_millis,
        })
    }
}

/// A validated, ordered collection of [`Frame`]s for one output cursor.
///
/// Enforces:
/// - the set of `(nominal_size, frame_no)` pairs is unique;
/// - for an animated cursor, every nominal size has the same frame count,
///   and every frame has a strictly positive delay.
///
/// Frames are kept ordered `(nominal_size ascending, frame_no ascending)`,
/// which is the on-disk order every writer in this crate produces
/// regardless of insertion order.
#[derive(Debug, Default)]
pub struct FrameSet {
    frames: Vec<Frame>,
}

impl FrameSet {
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Inserts `frame`, replacing any existing frame with the same
    /// `(nominal_size, frame_no)` key (last write wins, matching
    /// [`crate::render::builder::CursorBuilder::add_frame`]'s contract).
    pub fn insert(&mut self, frame: Frame) {
        if let Some(existing) = self
            .frames
            .iter_mut()
            .find(|f| f.nominal_size == frame.nominal_size && f.frame_no == frame.frame_no)
        {
            *existing = frame;
        } else {
            self.frames.push(frame);
        }
    }

    /// Validates the animated-cursor invariants and returns frames in
    /// `(nominal_size, frame_no)` order.
    ///
    /// ## Errors
    ///
    /// If frame counts differ across nominal sizes, or any delay is zero,
    /// for an animated identity.
    pub fn finish(mut self, identity: &CursorIdentity) -> Result<Vec<Frame>> {
        self.frames
            .sort_by_key(|f| (f.nominal_size, f.frame_no.unwrap_or(0)));

        if identity.is_animated() {
            let sizes: BTreeSet<u32> = self.frames.iter().map(|f| f.nominal_size).collect();
            let mut counts = sizes.iter().map(|&size| {
                self.frames
                    .iter()
                    .filter(|f| f.nominal_size == size)
                    .count()
            });

            let first = counts.next().unwrap_or(0);
            if counts.any(|c| c != first) {
                return Err(Error::invalid_data(
                    "FrameSet::finish",
                    "every nominal size must have the same number of frames for an animated cursor",
                ));
            }

            if self.frames.iter().any(|f| f.frame_no.is_none()) {
                return Err(Error::invalid_data(
                    "FrameSet::finish",
                    "frame_no is mandatory for animated cursors",
                ));
            }

            if self.frames.iter().any(|f| f.delay_millis == 0) {
                return Err(Error::invalid_data(
                    "FrameSet::finish",
                    "animated cursor frames must have a strictly positive delay",
                ));
            }
        }

        Ok(self.frames)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn img() -> CursorImage {
        CursorImage::new(4, 4, vec![0; 4 * 4 * 4]).unwrap()
    }

    #[test]
    fn rejects_out_of_bounds_hotspot() {
        let result = Frame::new(None, img(), Hotspot::new(5, 0), 32, 0);
        assert!(result.is_err());
    }

    #[test]
    fn last_write_wins_on_duplicate_key() {
        let mut set = FrameSet::new();
        set.insert(Frame::new(Some(1), img(), Hotspot::new(0, 0), 32, 100).unwrap());
        set.insert(Frame::new(Some(1), img(), Hotspot::new(1, 1), 32, 100).unwrap());

        let identity = CursorIdentity {
            name: "progress".into(),
            animation: Some(Animation {
                frame_count: 1,
                frame_delay_ms: 100,
                jump_frame: None,
            }),
        };

        let frames = set.finish(&identity).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].hotspot, Hotspot::new(1, 1));
    }

    #[test]
    fn animated_requires_equal_frame_counts_per_size() {
        let mut set = FrameSet::new();
        set.insert(Frame::new(Some(1), img(), Hotspot::new(0, 0), 24, 100).unwrap());
        set.insert(Frame::new(Some(1), img(), Hotspot::new(0, 0), 48, 100).unwrap());
        set.insert(Frame::new(Some(2), img(), Hotspot::new(0, 0), 24, 100).unwrap());

        let identity = CursorIdentity {
            name: "default".into(),
            animation: Some(Animation {
                frame_count: 2,
                frame_delay_ms: 100,
                jump_frame: None,
            }),
        };

        assert!(set.finish(&identity).is_err());
    }
}
