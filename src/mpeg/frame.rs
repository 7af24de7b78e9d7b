//! MPEG audio frame header parsing
//!
//! Frame header structure (4 bytes):
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//!
//! A = sync (11 bits)
//! B = MPEG version (2 bits): 00=2.5, 01=reserved, 10=2, 11=1
//! C = Layer (2 bits): 00=reserved, 01=III, 10=II, 11=I
//! D = Protection bit: 0=CRC follows the header, 1=no CRC
//! E = Bitrate index (4 bits)
//! F = Sample rate index (2 bits)
//! G = Padding bit
//! H = Private bit
//! I = Channel mode (2 bits)
//! J = Mode extension (2 bits)
//! K = Copyright
//! L = Original
//! M = Emphasis (2 bits)

use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::error::{DecodeError, Result};
use crate::options::{DecodeOptions, SyncWidth};
use crate::utils::io::{BitWindow, ByteCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MpegVersion {
    #[serde(rename = "1")]
    Mpeg1,
    #[serde(rename = "2")]
    Mpeg2,
    #[serde(rename = "2.5")]
    Mpeg25,
}

impl MpegVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            MpegVersion::Mpeg1 => "1",
            MpegVersion::Mpeg2 => "2",
            MpegVersion::Mpeg25 => "2.5",
        }
    }
}

impl fmt::Display for MpegVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

impl Layer {
    pub fn number(self) -> u8 {
        match self {
            Layer::Layer1 => 1,
            Layer::Layer2 => 2,
            Layer::Layer3 => 3,
        }
    }
}

impl From<Layer> for u8 {
    fn from(layer: Layer) -> u8 {
        layer.number()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MpegFrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    /// True when a 16-bit CRC follows the header (protection bit is 0)
    pub protected: bool,
    /// kbps; 0 for free-format streams
    pub bitrate: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub private: bool,
    pub channel_mode: ChannelMode,
    pub mode_extension: u8,
    pub copyright: bool,
    pub original: bool,
    pub emphasis: u8,
    pub samples_per_frame: u32,
    /// Total frame length in bytes including the header; unknown for
    /// free-format frames
    pub frame_size: Option<u32>,
}

// Bitrate lookup tables (kbps), [version group][layer - 1][index]
// Index 0 = free, 15 = bad
const BITRATES: [[[u32; 16]; 3]; 2] = [
    // MPEG-1
    [
        [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
    ],
    // MPEG-2 and 2.5
    [
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
    ],
];

const BAD_BITRATE_INDEX: u32 = 15;

// Sample rate lookup tables (Hz), [version][index]
const SAMPLE_RATES: [[u32; 3]; 3] = [
    [44100, 48000, 32000], // MPEG-1
    [22050, 24000, 16000], // MPEG-2
    [11025, 12000, 8000],  // MPEG-2.5
];

impl MpegFrameHeader {
    pub const SIZE: usize = 4;

    /// Parse a 4-byte MP3 frame header.
    ///
    /// Fields are read left to right from one big-endian word; the first
    /// reserved value aborts the parse.
    pub fn parse(header: [u8; 4], sync_width: SyncWidth) -> Result<Self> {
        let mut bits = BitWindow::new(header);

        let sync = bits.take(sync_width.bits());
        if sync != sync_width.pattern() {
            return Err(DecodeError::malformed(format!("no frame sync in {:02X?}", header)));
        }

        // In 12-bit mode the low version bit is the last sync bit, so only
        // MPEG-1 and MPEG-2 remain reachable.
        let version_bits = match sync_width {
            SyncWidth::Eleven => bits.take(2),
            SyncWidth::Twelve => 0b10 | bits.take(1),
        };
        let version = match version_bits {
            0 => MpegVersion::Mpeg25,
            2 => MpegVersion::Mpeg2,
            3 => MpegVersion::Mpeg1,
            other => return Err(DecodeError::unsupported("MPEG version", other)), // Reserved
        };

        let layer = match bits.take(2) {
            1 => Layer::Layer3,
            2 => Layer::Layer2,
            3 => Layer::Layer1,
            other => return Err(DecodeError::unsupported("layer", other)), // Reserved
        };

        let protected = !bits.take_flag();

        let bitrate_idx = bits.take(4);
        if bitrate_idx == BAD_BITRATE_INDEX {
            return Err(DecodeError::unsupported("bitrate index", bitrate_idx));
        }
        let version_group = match version {
            MpegVersion::Mpeg1 => 0,
            MpegVersion::Mpeg2 | MpegVersion::Mpeg25 => 1,
        };
        let bitrate = BITRATES[version_group][layer.number() as usize - 1][bitrate_idx as usize];

        let sample_rate_idx = bits.take(2);
        let sample_rate = match SAMPLE_RATES[version as usize].get(sample_rate_idx as usize) {
            Some(&rate) => rate,
            None => return Err(DecodeError::unsupported("sample rate index", sample_rate_idx)),
        };

        let padding = bits.take_flag();
        let private = bits.take_flag();

        let channel_mode = match bits.take(2) {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };
        let mode_extension = bits.take(2) as u8;
        let copyright = bits.take_flag();
        let original = bits.take_flag();
        let emphasis = bits.take(2) as u8;

        let samples_per_frame = samples_per_frame(version, layer);
        let frame_size = frame_size(version, layer, bitrate, sample_rate, padding);

        Ok(MpegFrameHeader {
            version,
            layer,
            protected,
            bitrate,
            sample_rate,
            padding,
            private,
            channel_mode,
            mode_extension,
            copyright,
            original,
            emphasis,
            samples_per_frame,
            frame_size,
        })
    }

    /// Length of the Layer III side information that follows the header.
    /// Other layers carry none.
    pub fn side_info_size(&self) -> usize {
        if self.layer != Layer::Layer3 {
            return 0;
        }
        match (self.version, self.channel_mode) {
            (MpegVersion::Mpeg1, ChannelMode::Mono) => 17,
            (MpegVersion::Mpeg1, _) => 32,
            (_, ChannelMode::Mono) => 9,
            (_, _) => 17,
        }
    }

    /// Frame playback time in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_per_frame as f64 / self.sample_rate as f64
    }
}

fn samples_per_frame(version: MpegVersion, layer: Layer) -> u32 {
    match (version, layer) {
        (_, Layer::Layer1) => 384,
        (_, Layer::Layer2) => 1152,
        (MpegVersion::Mpeg1, Layer::Layer3) => 1152,
        (_, Layer::Layer3) => 576,
    }
}

fn frame_size(version: MpegVersion, layer: Layer, bitrate: u32, sample_rate: u32, padding: bool) -> Option<u32> {
    if bitrate == 0 {
        return None;
    }
    let bits_per_second = bitrate * 1000;
    let pad = padding as u32;

    let size = match layer {
        Layer::Layer1 => (12 * bits_per_second / sample_rate + pad) * 4,
        Layer::Layer2 => 144 * bits_per_second / sample_rate + pad,
        Layer::Layer3 => {
            let coefficient = if version == MpegVersion::Mpeg1 { 144 } else { 72 };
            coefficient * bits_per_second / sample_rate + pad
        }
    };
    Some(size)
}

/// Decode the frame header at `offset`.
///
/// Any error means "no frame here"; callers resynchronise by moving forward
/// one byte.
pub fn decode_frame_header(buffer: &[u8], offset: usize) -> Result<MpegFrameHeader> {
    decode_frame_header_with(buffer, offset, SyncWidth::default())
}

pub fn decode_frame_header_with(buffer: &[u8], offset: usize, sync_width: SyncWidth) -> Result<MpegFrameHeader> {
    let mut cursor = ByteCursor::at(buffer, offset);
    MpegFrameHeader::parse(cursor.read_array()?, sync_width)
}

/// Lazy walk over the frame headers in a buffer.
///
/// After a valid header the scanner jumps to where the next frame should
/// start; after an invalid one it moves forward a single byte. The walk ends
/// when fewer than four bytes remain, so it is always finite. The position can
/// be read back and a new scanner started from it at any time.
#[derive(Debug, Clone)]
pub struct FrameScanner<'a> {
    buffer: &'a [u8],
    pos: usize,
    sync_width: SyncWidth,
}

impl<'a> FrameScanner<'a> {
    pub fn new(buffer: &'a [u8], start: usize) -> Self {
        Self::with_options(buffer, start, &DecodeOptions::default())
    }

    pub fn with_options(buffer: &'a [u8], start: usize, options: &DecodeOptions) -> Self {
        FrameScanner {
            buffer,
            pos: start,
            sync_width: options.sync_width,
        }
    }

    /// Offset the next candidate will be tried at
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for FrameScanner<'_> {
    type Item = (usize, MpegFrameHeader);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos;
        while self.pos + MpegFrameHeader::SIZE <= self.buffer.len() {
            let offset = self.pos;
            match decode_frame_header_with(self.buffer, offset, self.sync_width) {
                Ok(header) => {
                    if offset > start {
                        trace!(from = start, to = offset, "resynchronised on frame header");
                    }
                    let step = header
                        .frame_size
                        .map(|size| size as usize)
                        .filter(|&size| size >= MpegFrameHeader::SIZE)
                        .unwrap_or(1);
                    self.pos = offset + step;
                    return Some((offset, header));
                }
                Err(_) => self.pos += 1,
            }
        }
        None
    }
}

/// Find the first valid frame header at or after `start`
pub fn find_sync(buffer: &[u8], start: usize) -> Option<(usize, MpegFrameHeader)> {
    FrameScanner::new(buffer, start).next()
}
