//! Windows `ANI` (RIFF `ACON`) animated-cursor container reader/writer.
//!
//! Same `AniHeader` flag semantics and `INFO`/`fram` dispatch as a direct
//! chunk-matching implementation would have, rebuilt on top of the generic
//! [`super::riff::walk`] walker instead of inlining the chunk match inside
//! the parse loop.

use crate::error::{Error, Result};
use crate::io::{ByteReader, ByteWriter};

use super::riff;

const ANIH_SIZE: u32 = 36;

/// `AF_ICON` / `AF_SEQUENCE` from the ANI header's `flags` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct AniFlags {
    icon: bool,
    sequence: bool,
}

impl AniFlags {
    const fn from_bits(bits: u32) -> Self {
        Self {
            icon: bits & 0x1 != 0,
            sequence: bits & 0x2 != 0,
        }
    }

    const fn to_bits(self) -> u32 {
        (self.icon as u32) | ((self.sequence as u32) << 1)
    }
}

#[derive(Debug, Default)]
struct RawAniHeader {
    num_frames: u32,
    num_steps: u32,
    jiffy_rate: u32,
    flags: AniFlags,
}

/// One step of a fully resolved playback sequence: how many jiffies to hold
/// `cur_bytes` on screen.
#[derive(Debug, Clone)]
pub struct Step {
    pub delay_jiffies: u32,
    pub cur_bytes: Vec<u8>,
}

/// A decoded `.ani` file, with `seq `/`rate` already resolved into an
/// explicit per-step list.
#[derive(Debug, Default)]
pub struct DecodedAni {
    pub steps: Vec<Step>,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Parses a complete `.ani` file.
///
/// ## Errors
///
/// If the RIFF/`ACON` framing is malformed, `anih` is missing or
/// inconsistent with the frame/sequence/rate chunk lengths, or a `seq `
/// entry indexes past `cFrames`.
pub fn read(data: &[u8]) -> Result<DecodedAni> {
    let mut r = ByteReader::new(data);
    let (_size, form_type) = riff::read_form_header(&mut r)?;
    if &form_type != b"ACON" {
        return Err(Error::invalid_data("ani::read", "RIFF form type must be 'ACON'"));
    }

    let mut header: Option<RawAniHeader> = None;
    let mut rate: Option<Vec<u32>> = None;
    let mut sequence: Option<Vec<u32>> = None;
    let mut frames: Vec<Vec<u8>> = Vec::new();
    let mut title = None;
    let mut author = None;

    riff::walk(&mut r, |fourcc, mut chunk| {
        match &fourcc {
            b"anih" => {
                if header.is_some() {
                    return Err(Error::invalid_data("ani::read", "duplicate 'anih' chunk"));
                }
                header = Some(read_anih(&mut chunk)?);
            }
            b"rate" => {
                if rate.is_some() {
                    return Err(Error::invalid_data("ani::read", "duplicate 'rate' chunk"));
                }
                rate = Some(read_u32_array(&mut chunk)?);
            }
            b"seq " => {
                if sequence.is_some() {
                    return Err(Error::invalid_data("ani::read", "duplicate 'seq ' chunk"));
                }
                sequence = Some(read_u32_array(&mut chunk)?);
            }
            b"LIST" => read_list(&mut chunk, &mut frames, &mut title, &mut author)?,
            _ => {}
        }
        Ok(())
    })?;

    let header = header.ok_or_else(|| Error::invalid_data("ani::read", "missing 'anih' chunk"))?;

    if header.num_frames as usize != frames.len() {
        return Err(Error::invalid_data(
            "ani::read",
            format!(
                "anih declares {} frames but 'fram' contains {}",
                header.num_frames,
                frames.len()
            ),
        ));
    }

    if let Some(seq) = &sequence {
        if seq.len() != header.num_steps as usize {
            return Err(Error::invalid_data(
                "ani::read",
                "'seq ' length disagrees with cSteps",
            ));
        }
        if seq.iter().any(|&idx| idx >= header.num_frames) {
            return Err(Error::invalid_data("ani::read", "'seq ' index out of range"));
        }
    }

    if let Some(r) = &rate {
        if r.len() != header.num_steps as usize {
            return Err(Error::invalid_data(
                "ani::read",
                "'rate' length disagrees with cSteps",
            ));
        }
    }

    // With no 'seq ' chunk, playback is 0..cSteps-1 mod cFrames.
    let resolved_sequence: Vec<u32> = match sequence {
        Some(seq) => seq,
        None => (0..header.num_steps)
            .map(|i| i % header.num_frames.max(1))
            .collect(),
    };

    let mut steps = Vec::with_capacity(resolved_sequence.len());
    for (i, &frame_idx) in resolved_sequence.iter().enumerate() {
        let delay_jiffies = rate.as_ref().map_or(header.jiffy_rate, |r| r[i]);
        steps.push(Step {
            delay_jiffies,
            cur_bytes: frames[frame_idx as usize].clone(),
        });
    }

    Ok(DecodedAni { steps, title, author })
}

fn read_anih(r: &mut ByteReader<'_>) -> Result<RawAniHeader> {
    let size = r.read_u32le()?;
    if size != ANIH_SIZE {
        return Err(Error::invalid_data(
            "ani::read",
            format!("expected anih size {ANIH_SIZE}, got {size}"),
        ));
    }
    let num_frames = r.read_u32le()?;
    let num_steps = r.read_u32le()?;
    r.skip(16)?; // cx, cy, cBitCount, cPlanes — unused
    let jiffy_rate = r.read_u32le()?;
    let flags = AniFlags::from_bits(r.read_u32le()?);

    Ok(RawAniHeader {
        num_frames,
        num_steps,
        jiffy_rate,
        flags,
    })
}

fn read_u32_array(r: &mut ByteReader<'_>) -> Result<Vec<u32>> {
    let mut out = Vec::with_capacity(r.remaining() / 4);
    while r.remaining() >= 4 {
        out.push(r.read_u32le()?);
    }
    Ok(out)
}

fn read_list(
    r: &mut ByteReader<'_>,
    frames: &mut Vec<Vec<u8>>,
    title: &mut Option<String>,
    author: &mut Option<String>,
) -> Result<()> {
    let list_id = r.read_exact(4)?.to_vec();

    match list_id.as_slice() {
        b"INFO" => {
            riff::walk(r, |fourcc, mut chunk| {
                match &fourcc {
                    b"INAM" => *title = Some(read_null_string(&mut chunk)?),
                    b"IART" => *author = Some(read_null_string(&mut chunk)?),
                    _ => {}
                }
                Ok(())
            })
        }
        b"fram" => {
            if !frames.is_empty() {
                return Err(Error::invalid_data("ani::read", "duplicate 'fram' chunk"));
            }
            riff::walk(r, |fourcc, chunk| {
                if &fourcc != b"icon" {
                    return Err(Error::invalid_data(
                        "ani::read",
                        format!("expected 'icon' subchunk in 'fram', got {fourcc:?}"),
                    ));
                }
                frames.push(chunk.remaining_to_vec());
                Ok(())
            })
        }
        other => Err(Error::invalid_data(
            "ani::read",
            format!("unexpected LIST subtype {other:?}"),
        )),
    }
}

fn read_null_string(r: &mut ByteReader<'_>) -> Result<String> {
    let bytes = r.remaining_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end])
        .map(str::to_owned)
        .map_err(|e| Error::invalid_data("ani::read", e.to_string()))
}

/// Builds a complete `.ani` file from `(delay_millis, cur_bytes)` frames,
/// emitting a `rate` chunk only when the frames' delays actually differ.
///
/// ## Errors
///
/// If `frames` is empty, or a frame count overflows `u32`.
pub fn write(frames: &[(u32, Vec<u8>)]) -> Result<Vec<u8>> {
    if frames.is_empty() {
        return Err(Error::invalid_data("ani::write", "an ANI file needs at least one frame"));
    }

    let jiffies: Vec<u32> = frames
        .iter()
        .map(|(delay_millis, _)| ((delay_millis * 60 + 500) / 1000).max(1))
        .collect();
    let uniform = jiffies.windows(2).all(|w| w[0] == w[1]);

    let frame_count = u32::try_from(frames.len())
        .map_err(|_| Error::invalid_data("ani::write", "too many frames for a u32 count"))?;

    let mut body = ByteWriter::new();
    write_fourcc(&mut body, b"ACON");

    write_fourcc(&mut body, b"anih");
    body.write_u32le(ANIH_SIZE);
    body.write_u32le(ANIH_SIZE);
    body.write_u32le(frame_count);
    body.write_u32le(frame_count);
    body.write_bytes(&[0; 16]); // cx, cy, cBitCount, cPlanes
    body.write_u32le(jiffies[0]);
    // This writer never emits a 'seq ' chunk (frame order always matches
    // input order via the implicit 0..cSteps-1 mod cFrames sequence), so
    // AF_SEQUENCE stays clear regardless of whether delays are uniform.
    let flags = AniFlags {
        icon: true,
        sequence: false,
    };
    body.write_u32le(flags.to_bits());

    if !uniform {
        write_fourcc(&mut body, b"rate");
        body.write_u32le(frame_count * 4);
        for j in &jiffies {
            body.write_u32le(*j);
        }
    }

    write_fourcc(&mut body, b"LIST");
    let list_size_at = body.position();
    body.write_u32le(0); // patched below
    write_fourcc(&mut body, b"fram");
    for (_, cur_bytes) in frames {
        write_fourcc(&mut body, b"icon");
        body.write_u32le(u32::try_from(cur_bytes.len()).map_err(|_| {
            Error::invalid_data("ani::write", "CUR payload too large")
        })?);
        body.write_bytes(cur_bytes);
        if cur_bytes.len() % 2 == 1 {
            body.write_u8(0);
        }
    }
    let list_body_len = body.position() - (list_size_at + 4);
    body.patch_u32le(list_size_at, u32::try_from(list_body_len).unwrap());

    let mut out = ByteWriter::new();
    write_fourcc(&mut out, b"RIFF");
    out.write_u32le(u32::try_from(body.position()).map_err(|_| {
        Error::invalid_data("ani::write", "file too large for a u32 RIFF size")
    })?);
    out.write_bytes(body.as_bytes());

    Ok(out.into_bytes())
}

fn write_fourcc(w: &mut ByteWriter, fourcc: &[u8; 4]) {
    w.write_bytes(fourcc);
}

#[cfg(test)]
mod test {
    use super::*;

    fn fake_cur(tag: u8) -> Vec<u8> {
        vec![tag; 10]
    }

    #[test]
    fn uniform_delays_need_no_rate_chunk() {
        let frames = vec![(100, fake_cur(1)), (100, fake_cur(2))];
        let bytes = write(&frames).unwrap();
        assert!(!bytes.windows(4).any(|w| w == b"rate"));

        let decoded = read(&bytes).unwrap();
        assert_eq!(decoded.steps.len(), 2);
        assert_eq!(decoded.steps[0].delay_jiffies, 6);
        assert_eq!(decoded.steps[0].cur_bytes, fake_cur(1));
    }

    #[test]
    fn differing_delays_round_trip_via_rate_chunk() {
        let frames = vec![(100, fake_cur(1)), (100, fake_cur(2)), (50, fake_cur(3)), (250, fake_cur(4))];
        let bytes = write(&frames).unwrap();
        assert!(bytes.windows(4).any(|w| w == b"rate"));

        let decoded = read(&bytes).unwrap();
        let jiffies: Vec<u32> = decoded.steps.iter().map(|s| s.delay_jiffies).collect();
        assert_eq!(jiffies, vec![6, 6, 3, 15]);
    }
}
