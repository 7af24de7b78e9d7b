//! Xing/Info VBR header extraction
//!
//! Encoders place this header in the first frame of the stream, right after
//! the Layer III side information. "Xing" marks a VBR stream, "Info" a CBR
//! one; the layout is identical:
//!
//! ```text
//! id(4) flags(4) [frames(4)] [bytes(4)] [toc(100)] [quality(4)]
//! ```
//!
//! Each bracketed field is present only when its flag bit (0, 1, 2, 3) is set.
//! LAME-style encoders follow it with a 9-byte version string.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::mpeg::frame::MpegFrameHeader;
use crate::utils::io::ByteCursor;

const FRAMES_FLAG: u32 = 0x01;
const BYTES_FLAG: u32 = 0x02;
const TOC_FLAG: u32 = 0x04;
const QUALITY_FLAG: u32 = 0x08;

pub const TOC_SIZE: usize = 100;
const ENCODER_TAG_SIZE: usize = 9;
const ENCODER_PREFIXES: [&[u8]; 3] = [b"LAME", b"Lavc", b"Lavf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VbrKind {
    Xing,
    Info,
}

impl VbrKind {
    fn from_id(id: &[u8]) -> Option<Self> {
        match id {
            b"Xing" => Some(VbrKind::Xing),
            b"Info" => Some(VbrKind::Info),
            _ => None,
        }
    }
}

/// Information extracted from a Xing/Info header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VbrHeader {
    pub id: VbrKind,
    pub flags: u32,
    /// Total frames reported by header
    pub num_of_frames: Option<u32>,
    /// Total bytes reported by header
    pub file_size: Option<u32>,
    /// Seek table: entry i is the byte position, in 1/256ths of `file_size`,
    /// reached at i% of playback time
    pub toc: Option<Vec<u8>>,
    /// Encoder quality indicator (0 = best)
    pub quality: Option<u32>,
    /// Encoder version string (e.g. "LAME3.100"), if one follows the header
    pub encoder: Option<String>,
}

impl VbrHeader {
    /// Read a Xing/Info header at the cursor.
    ///
    /// Returns `Ok(None)` without consuming anything if the id does not match.
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Option<Self>> {
        let id = match cursor.peek(4).ok().and_then(VbrKind::from_id) {
            Some(id) => id,
            None => return Ok(None),
        };
        cursor.skip(4)?;

        let flags = cursor.read_be_u32()?;

        let num_of_frames = if flags & FRAMES_FLAG != 0 {
            Some(cursor.read_be_u32()?)
        } else {
            None
        };

        let file_size = if flags & BYTES_FLAG != 0 {
            Some(cursor.read_be_u32()?)
        } else {
            None
        };

        let toc = if flags & TOC_FLAG != 0 {
            Some(cursor.read_bytes(TOC_SIZE)?.to_vec())
        } else {
            None
        };

        let quality = if flags & QUALITY_FLAG != 0 {
            Some(cursor.read_be_u32()?)
        } else {
            None
        };

        let encoder = peek_encoder(cursor);

        debug!(?id, flags, ?num_of_frames, ?file_size, ?encoder, "found VBR header");

        Ok(Some(VbrHeader {
            id,
            flags,
            num_of_frames,
            file_size,
            toc,
            quality,
            encoder,
        }))
    }

    /// Xing marks variable bitrate; Info is written for CBR files
    pub fn is_vbr(&self) -> bool {
        self.id == VbrKind::Xing
    }

    /// Byte offset for a seek to `percent` (0 to 100) of the playing time,
    /// interpolated from the TOC. Needs both the TOC and the byte count.
    pub fn seek_offset(&self, percent: f64) -> Option<u64> {
        let toc = self.toc.as_ref()?;
        let file_size = self.file_size? as f64;

        let percent = percent.clamp(0.0, 100.0);
        let index = (percent as usize).min(TOC_SIZE - 1);
        let lower = toc[index] as f64;
        let upper = if index + 1 < TOC_SIZE { toc[index + 1] as f64 } else { 256.0 };
        let fraction = lower + (upper - lower) * (percent - index as f64);

        Some((fraction / 256.0 * file_size) as u64)
    }
}

/// The encoder tag directly after the Xing structure, if there is one.
fn peek_encoder(cursor: &ByteCursor<'_>) -> Option<String> {
    let available = cursor.remaining().min(ENCODER_TAG_SIZE);
    let bytes = cursor.peek(available).ok()?;
    if !ENCODER_PREFIXES.iter().any(|prefix| bytes.starts_with(prefix)) {
        return None;
    }

    let text = String::from_utf8_lossy(bytes);
    Some(text.trim_end_matches('\0').to_string())
}

/// Decode a VBR header at `offset`, returning it with the offset just past
/// the Xing structure (the encoder string is not counted).
pub fn decode_vbr_header(buffer: &[u8], offset: usize) -> Result<Option<(VbrHeader, usize)>> {
    let mut cursor = ByteCursor::at(buffer, offset);
    let header = VbrHeader::read(&mut cursor)?;
    Ok(header.map(|h| (h, cursor.position())))
}

/// Where the Xing/Info id sits for a frame starting at `frame_offset`
pub fn vbr_header_offset(frame_offset: usize, frame: &MpegFrameHeader) -> usize {
    frame_offset + MpegFrameHeader::SIZE + frame.side_info_size()
}
