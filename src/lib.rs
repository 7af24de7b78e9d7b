//! mp3meta - MPEG audio metadata decoder
//!
//! Decodes, in a single synchronous pass over an in-memory buffer:
//! - the ID3v2 tag at the start of the stream and its text-information frames
//! - every MPEG audio frame header after the tag
//! - the Xing/Info VBR header inside the first audio frame
//!
//! ```no_run
//! let data = std::fs::read("song.mp3")?;
//! let context = mp3meta::decode(&data);
//! if let Some(tag) = &context.tag {
//!     println!("title: {:?}", tag.text("TIT2"));
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

pub mod error;
pub mod id3;
pub mod mpeg;
pub mod options;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use error::{DecodeError, Result};
pub use id3::{Id3FrameHeader, Id3TextFrame, Id3v2Header, Id3v2Tag};
pub use mpeg::{FrameScanner, MpegFrameHeader, VbrHeader};
pub use options::{DecodeOptions, SyncWidth};
pub use utils::TextEncoding;

use mpeg::vbr::{decode_vbr_header, vbr_header_offset};

/// An MPEG frame header and where it starts in the buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioFrame {
    pub offset: usize,
    pub header: MpegFrameHeader,
}

/// Everything one decode pass found in a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioContext {
    pub tag: Option<Id3v2Tag>,
    /// Offset the frame scan started from (the end of the tag, or 0)
    pub audio_start: usize,
    pub frames: Vec<AudioFrame>,
    pub vbr: Option<VbrHeader>,
    /// Problems that were recovered from during the pass
    pub diagnostics: Vec<String>,
}

/// Decode a whole stream with default options
pub fn decode(buffer: &[u8]) -> AudioContext {
    decode_with(buffer, &DecodeOptions::default())
}

/// Decode a whole stream.
///
/// Never fails: a tag that cannot be trusted is dropped (and noted in
/// `diagnostics`), and the frame scan resynchronises past garbage.
pub fn decode_with(buffer: &[u8], options: &DecodeOptions) -> AudioContext {
    let mut diagnostics = Vec::new();

    let tag = match id3::decode_tag_with(buffer, options) {
        Ok(tag) => {
            if let Some(tag) = &tag {
                diagnostics.extend(tag.diagnostics.iter().cloned());
            }
            tag
        }
        Err(e) => {
            warn!(error = %e, "ignoring untrusted ID3v2 tag");
            diagnostics.push(format!("ID3v2 tag ignored: {e}"));
            None
        }
    };

    let audio_start = tag.as_ref().map_or(0, |t| t.len()).min(buffer.len());

    let frames: Vec<AudioFrame> = FrameScanner::with_options(buffer, audio_start, options)
        .take(options.max_frames.unwrap_or(usize::MAX))
        .map(|(offset, header)| AudioFrame { offset, header })
        .collect();

    match frames.first() {
        Some(first) if first.offset > audio_start => {
            debug!(skipped = first.offset - audio_start, "garbage before first frame");
            diagnostics.push(format!(
                "{} bytes before the first frame sync",
                first.offset - audio_start
            ));
        }
        None => diagnostics.push("no MPEG audio frames found".to_string()),
        _ => {}
    }

    let vbr = frames.first().and_then(|first| {
        // Confine the lookup to the first frame's payload
        let frame_end = first
            .header
            .frame_size
            .map_or(buffer.len(), |size| first.offset + size as usize)
            .min(buffer.len());
        let offset = vbr_header_offset(first.offset, &first.header);

        match decode_vbr_header(&buffer[..frame_end], offset) {
            Ok(found) => found.map(|(header, _)| header),
            Err(e) => {
                warn!(offset, error = %e, "unreadable VBR header");
                diagnostics.push(format!("VBR header at {offset} ignored: {e}"));
                None
            }
        }
    });

    debug!(
        tag = tag.is_some(),
        frames = frames.len(),
        vbr = vbr.is_some(),
        "decode pass complete"
    );

    AudioContext {
        tag,
        audio_start,
        frames,
        vbr,
        diagnostics,
    }
}

/// Read and decode a file with default options
pub fn read_file<P: AsRef<Path>>(path: P) -> std::io::Result<AudioContext> {
    read_file_with(path, &DecodeOptions::default())
}

pub fn read_file_with<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> std::io::Result<AudioContext> {
    let data = std::fs::read(path)?;
    Ok(decode_with(&data, options))
}

impl AudioContext {
    pub fn first_frame(&self) -> Option<&AudioFrame> {
        self.frames.first()
    }

    /// Frames carrying audio; the first frame is excluded when it holds the
    /// VBR header
    pub fn audio_frames(&self) -> &[AudioFrame] {
        let skip = usize::from(self.vbr.is_some()).min(self.frames.len());
        &self.frames[skip..]
    }

    /// Playing time in seconds. Uses the VBR frame count when present,
    /// otherwise the frames that were scanned.
    pub fn duration_secs(&self) -> Option<f64> {
        let first = self.first_frame()?;
        if let Some(count) = self.vbr.as_ref().and_then(|v| v.num_of_frames) {
            return Some(count as f64 * first.header.duration_secs());
        }
        Some(self.audio_frames().iter().map(|f| f.header.duration_secs()).sum())
    }

    /// Average bitrate in kbps
    pub fn average_bitrate(&self) -> Option<u32> {
        if let Some(bytes) = self.vbr.as_ref().and_then(|v| v.file_size) {
            let secs = self.duration_secs().filter(|&s| s > 0.0)?;
            return Some((bytes as f64 * 8.0 / secs / 1000.0).round() as u32);
        }

        let rates: Vec<u32> = self
            .audio_frames()
            .iter()
            .map(|f| f.header.bitrate)
            .filter(|&b| b > 0)
            .collect();
        if rates.is_empty() {
            return None;
        }
        let total: u64 = rates.iter().map(|&b| u64::from(b)).sum();
        Some((total / rates.len() as u64) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cbr_frames(count: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for _ in 0..count {
            data.extend([0xFF, 0xFB, 0x90, 0x00]);
            data.extend(vec![0u8; 413]);
        }
        data
    }

    #[test]
    fn test_decode_untagged_stream() {
        let data = cbr_frames(3);
        let context = decode(&data);

        assert!(context.tag.is_none());
        assert_eq!(context.audio_start, 0);
        assert_eq!(context.frames.len(), 3);
        assert!(context.vbr.is_none());
        assert!(context.diagnostics.is_empty());
        assert_eq!(context.average_bitrate(), Some(128));
    }

    #[test]
    fn test_decode_empty_buffer() {
        let context = decode(&[]);
        assert!(context.tag.is_none());
        assert!(context.frames.is_empty());
        assert_eq!(context.duration_secs(), None);
        assert_eq!(context.diagnostics, ["no MPEG audio frames found"]);
    }

    #[test]
    fn test_max_frames() {
        let data = cbr_frames(5);
        let options = DecodeOptions::new().with_max_frames(Some(2));
        assert_eq!(decode_with(&data, &options).frames.len(), 2);
    }

    #[test]
    fn test_untrusted_tag_falls_back_to_offset_zero() {
        // Tag claims 0x7F bytes but the buffer ends right after the header
        let mut data = b"ID3\x03\x00\x00\x00\x00\x00\x7F".to_vec();
        data.extend(cbr_frames(1));
        data.truncate(60);

        let context = decode(&data);
        assert!(context.tag.is_none());
        assert_eq!(context.audio_start, 0);
        assert!(context.diagnostics[0].starts_with("ID3v2 tag ignored"));
    }

    #[test]
    fn test_garbage_before_first_frame_is_noted() {
        let mut data = vec![0x12; 7];
        data.extend(cbr_frames(2));

        let context = decode(&data);
        assert_eq!(context.first_frame().map(|f| f.offset), Some(7));
        assert_eq!(context.diagnostics, ["7 bytes before the first frame sync"]);
    }

    #[test]
    fn test_footer_moves_audio_start() {
        // ID3v2.4 with footer flag: header, 17-byte body, "3DI" footer
        let mut data = b"ID3\x04\x00\x10\x00\x00\x00\x11".to_vec();
        data.extend(b"TIT2\x00\x00\x00\x07\x00\x00\x03Title\x00");
        data.extend(b"3DI\x04\x00\x10\x00\x00\x00\x11");
        data.extend(cbr_frames(2));

        let context = decode(&data);
        let tag = context.tag.as_ref().expect("Should find tag");
        assert!(tag.header.flags.footer_present);
        assert_eq!(tag.text("TIT2"), Some("Title"));
        assert_eq!(context.audio_start, 37);
        assert_eq!(context.first_frame().map(|f| f.offset), Some(37));
        assert!(context.diagnostics.is_empty(), "{:?}", context.diagnostics);
    }

    #[test]
    fn test_average_bitrate_of_mixed_frames() {
        let mut data = cbr_frames(1);
        // 160 kbps: 522 bytes
        data.extend([0xFF, 0xFB, 0xA0, 0x00]);
        data.extend(vec![0u8; 518]);

        let context = decode(&data);
        assert_eq!(context.frames.len(), 2);
        assert_eq!(context.average_bitrate(), Some(144));
    }
}
