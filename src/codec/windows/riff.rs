//! Generic RIFF chunk walker.
//!
//! Factors chunk-matching out into a reusable function so the ANI reader
//! built on top of it is just a dispatch table over `(fourcc, payload)`
//! pairs, descending into `LIST` containers explicitly.

use crate::error::{Error, Result};
use crate::io::ByteReader;

pub type FourCc = [u8; 4];

fn read_fourcc(r: &mut ByteReader<'_>) -> Result<FourCc> {
    let bytes = r.read_exact(4)?;
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Reads the `"RIFF" <size> <form_type>` preamble, returning the declared
/// size (exclusive of the 8-byte `"RIFF"`+size prefix) and the form type
/// (e.g. `b"ACON"`).
///
/// ## Errors
///
/// If the file doesn't start with `"RIFF"`, or the declared size overruns
/// the buffer.
pub fn read_form_header<'a>(r: &mut ByteReader<'a>) -> Result<(u32, FourCc)> {
    let magic = read_fourcc(r)?;
    if &magic != b"RIFF" {
        return Err(Error::invalid_data("riff::read_form_header", "missing 'RIFF' magic"));
    }
    let size = r.read_u32le()?;
    if (size as usize) > r.remaining() + 4 {
        return Err(Error::invalid_data(
            "riff::read_form_header",
            format!("declared RIFF size {size} extends beyond the buffer"),
        ));
    }
    let form_type = read_fourcc(r)?;
    Ok((size, form_type))
}

/// Walks sibling chunks in `r` until it's exhausted, calling `on_chunk` with
/// each chunk's four-character code and a reader bounded to its declared
/// size. Declared odd sizes are followed by a pad byte, which this skips
/// automatically; `on_chunk` need not consume its payload reader fully —
/// [`ByteReader::bounded`] already advances past the whole chunk regardless.
///
/// ## Errors
///
/// If a chunk header can't be read, its declared size overruns the parent
/// reader, or `on_chunk` itself fails.
pub fn walk(
    r: &mut ByteReader<'_>,
    mut on_chunk: impl FnMut(FourCc, ByteReader<'_>) -> Result<()>,
) -> Result<()> {
    while r.remaining() >= 8 {
        let fourcc = read_fourcc(r)?;
        let size = r.read_u32le()? as usize;
        let chunk = r.bounded(size)?;
        on_chunk(fourcc, chunk)?;
        if size % 2 == 1 {
            r.skip(1)?;
        }
    }
    Ok(())
}
