//! `mousegen dump` — reverses any supported cursor format into PNGs plus a
//! small metadata listing.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mousegen::cli::{MousegenArgs, MousegenCommand};
use mousegen::dump;

fn main() -> ExitCode {
    env_logger::init();
    let args = MousegenArgs::parse();

    let MousegenCommand::Dump { output_dir, cursor_files } = args.command;
    let out_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));

    let mut any_failed = false;
    for file in &cursor_files {
        if let Err(err) = dump_one(file, &out_dir) {
            log::error!("failed to dump {}: {err}", file.display());
            any_failed = true;
        }
    }

    if any_failed { ExitCode::from(2) } else { ExitCode::SUCCESS }
}

fn dump_one(file: &std::path::Path, out_dir: &std::path::Path) -> anyhow::Result<()> {
    let frames = dump::dump_file(file)?;
    dump::write_frames(&frames, out_dir)?;

    let metadata_path = out_dir.join(format!(
        "{}.txt",
        file.file_stem().map_or_else(|| "cursor".into(), |s| s.to_string_lossy().into_owned())
    ));
    let mut listing = String::new();
    for frame in &frames {
        listing.push_str(&format!(
            "{} rep={} frame={:?} nominal_size={:?} hotspot=({},{}) delay_ms={:?}\n",
            frame.cursor_name, frame.representation, frame.frame_no, frame.nominal_size, frame.hotspot_x, frame.hotspot_y, frame.delay_millis
        ));
    }
    std::fs::write(metadata_path, listing)?;

    log::info!("dumped {} frame(s) from {}", frames.len(), file.display());
    Ok(())
}
