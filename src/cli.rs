//! Thin CLI argument surface for the `bibata` and `mousegen` binaries.
//! Argument parsing only — the actual work is delegated to
//! [`crate::render`], [`crate::dump`], and [`crate::template`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `bibata` — adjusts SVG sources and builds cursors directly from them.
#[derive(Parser)]
#[command(name = "bibata", version)]
pub struct BibataArgs {
    #[command(subcommand)]
    pub command: BibataCommand,
}

#[derive(Subcommand)]
pub enum BibataCommand {
    /// Rewrites every SVG under `svg_dir`'s root `width`/`height`/`viewBox`.
    Svgsize {
        target_size: u32,
        viewbox_size: u32,
        svg_dir: PathBuf,
    },
    /// Builds Windows cursors from a directory of pre-rendered PNG frames.
    Wincur {
        /// Build every `.cur`/`.ani` found instead of stopping at the first error.
        #[arg(long)]
        all_cursors: bool,
        bitmaps_dir: PathBuf,
    },
    /// Rasterizes SVG sources and builds cursors directly.
    Render {
        base_path: Option<PathBuf>,
        #[arg(long)]
        standard_sizes: bool,
        #[arg(long)]
        windows_cursors: bool,
    },
}

/// `mousegen dump` — reverses any supported cursor format into PNGs plus
/// metadata.
#[derive(Parser)]
#[command(name = "mousegen", version)]
pub struct MousegenArgs {
    #[command(subcommand)]
    pub command: MousegenCommand,
}

#[derive(Subcommand)]
pub enum MousegenCommand {
    Dump {
        /// Where extracted PNGs/metadata are written; defaults to the current directory.
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
        /// One or more cursor files (`.cur`, `.ani`, an XCursor file, or a `.cape` theme).
        #[arg(required = true)]
        cursor_files: Vec<PathBuf>,
    },
}
