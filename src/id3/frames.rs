// ID3 frame definitions and parsers

use serde::Serialize;
use tracing::trace;

use crate::error::{DecodeError, Result};
use crate::options::DecodeOptions;
use crate::utils::encoding::{read_string, TextEncoding};
use crate::utils::io::{remove_unsynchronisation, synchsafe, ByteCursor};

/// Common ID3v2.3/2.4 frame identifiers
pub mod frame_ids {
    pub const TITLE: &str = "TIT2"; // Title/songname/content description
    pub const ARTIST: &str = "TPE1"; // Lead performer(s)/Soloist(s)
    pub const ALBUM_ARTIST: &str = "TPE2"; // Band/orchestra/accompaniment
    pub const ALBUM: &str = "TALB"; // Album/Movie/Show title
    pub const COMPOSER: &str = "TCOM";
    pub const YEAR: &str = "TYER"; // Year (v2.3)
    pub const RECORDING_TIME: &str = "TDRC"; // Recording time (v2.4)
    pub const TRACK: &str = "TRCK"; // Track number/Position in set
    pub const GENRE: &str = "TCON"; // Content type
    pub const ENCODER_SETTINGS: &str = "TSSE";
    pub const USER_TEXT: &str = "TXXX"; // User defined text information
}

/// Status flags, first flag byte (bits 6, 5, 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FrameStatusFlags {
    pub tag_alter_preserved: bool,
    pub file_alter_preserved: bool,
    pub read_only: bool,
}

impl FrameStatusFlags {
    pub fn from_byte(byte: u8) -> Self {
        FrameStatusFlags {
            tag_alter_preserved: byte & 0x40 != 0,
            file_alter_preserved: byte & 0x20 != 0,
            read_only: byte & 0x10 != 0,
        }
    }
}

/// Format flags, second flag byte (bits 6, 3, 2, 1, 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FrameFormatFlags {
    pub grouped: bool,
    pub compressed: bool,
    pub encrypted: bool,
    pub unsynchronized: bool,
    pub data_length_indicated: bool,
}

impl FrameFormatFlags {
    pub fn from_byte(byte: u8) -> Self {
        FrameFormatFlags {
            grouped: byte & 0x40 != 0,
            compressed: byte & 0x08 != 0,
            encrypted: byte & 0x04 != 0,
            unsynchronized: byte & 0x02 != 0,
            data_length_indicated: byte & 0x01 != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        (self.grouped as u8) << 6
            | (self.compressed as u8) << 3
            | (self.encrypted as u8) << 2
            | (self.unsynchronized as u8) << 1
            | self.data_length_indicated as u8
    }
}

/// ID3v2 frame header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Id3FrameHeader {
    pub id: String,
    /// Body length in bytes, excluding this header
    pub size: u32,
    pub status_flags: FrameStatusFlags,
    pub format_flags: FrameFormatFlags,
}

/// Frame ids are four characters from `A-Z0-9`.
pub fn is_valid_frame_id(id: &[u8]) -> bool {
    id.len() == 4 && id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

pub fn check_frame_id(id: &[u8]) -> Result<()> {
    if !is_valid_frame_id(id) {
        return Err(DecodeError::malformed(format!("invalid frame id {:02X?}", id)));
    }
    Ok(())
}

impl Id3FrameHeader {
    pub const SIZE: usize = 10;

    /// Read a frame header. The size is plain big-endian unless
    /// `synchsafe_size` is set.
    pub fn read(cursor: &mut ByteCursor<'_>, synchsafe_size: bool) -> Result<Self> {
        let buffer: [u8; Self::SIZE] = cursor.read_array()?;

        check_frame_id(&buffer[0..4])?;

        let size_bytes = [buffer[4], buffer[5], buffer[6], buffer[7]];
        let size = if synchsafe_size {
            synchsafe(size_bytes)
        } else {
            u32::from_be_bytes(size_bytes)
        };

        Ok(Id3FrameHeader {
            id: String::from_utf8_lossy(&buffer[0..4]).into_owned(),
            size,
            status_flags: FrameStatusFlags::from_byte(buffer[8]),
            format_flags: FrameFormatFlags::from_byte(buffer[9]),
        })
    }

    /// Text-information frames are the ones whose id starts with `T`
    pub fn is_text(&self) -> bool {
        self.id.starts_with('T')
    }

    pub fn is_user_text(&self) -> bool {
        self.id == frame_ids::USER_TEXT
    }
}

/// Text-information frame (`T***`, including `TXXX`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Id3TextFrame {
    pub header: Id3FrameHeader,
    pub encoding: TextEncoding,
    /// Only set for `TXXX`; empty for every other id
    pub description: String,
    pub value: String,
}

impl Id3TextFrame {
    /// Decode the body of a text frame. `body` must span exactly
    /// `header.size` bytes.
    ///
    /// Compressed and encrypted bodies are `Unsupported`. The group id and
    /// data length indicator are skipped, and unsynchronisation (from the
    /// frame flag or `tag_unsynchronised`) is undone before the strings are
    /// read.
    pub fn from_body(header: Id3FrameHeader, body: &mut ByteCursor<'_>, tag_unsynchronised: bool) -> Result<Self> {
        if header.size == 0 || body.is_empty() {
            return Ok(Id3TextFrame {
                header,
                encoding: TextEncoding::default(),
                description: String::new(),
                value: String::new(),
            });
        }

        let flags = header.format_flags;
        if flags.compressed || flags.encrypted {
            return Err(DecodeError::unsupported("frame format flags", flags.to_byte() as u32));
        }
        if flags.grouped {
            body.skip(1)?;
        }
        if flags.data_length_indicated {
            let data_length = body.read_synchsafe_u32()?;
            trace!(frame = %header.id, data_length, "skipping data length indicator");
        }

        let rest = body.read_rest();
        let resynced;
        let content = if flags.unsynchronized || tag_unsynchronised {
            resynced = remove_unsynchronisation(rest);
            resynced.as_slice()
        } else {
            rest
        };
        let mut body = ByteCursor::new(content);

        let encoding = TextEncoding::from_byte(body.read_u8()?)?;
        let description = if header.is_user_text() {
            read_string(&mut body, encoding)?
        } else {
            String::new()
        };
        let value = read_string(&mut body, encoding)?;

        if !body.is_empty() {
            // Multiple values (v2.4 null separated lists) and trailing padding
            // are not part of the first value.
            trace!(
                frame = %header.id,
                trailing = body.remaining(),
                "text frame has bytes after its value"
            );
        }

        Ok(Id3TextFrame {
            header,
            encoding,
            description,
            value,
        })
    }

    /// Read a complete text frame (header and body) at the cursor.
    pub fn read(cursor: &mut ByteCursor<'_>, options: &DecodeOptions) -> Result<Self> {
        let header = Id3FrameHeader::read(cursor, options.synchsafe_frame_sizes)?;
        let mut body = cursor.sub_cursor(header.size as usize)?;
        Self::from_body(header, &mut body, false)
    }
}

/// Decode the text-information frame starting at `offset`, returning it along
/// with the offset of the byte that follows it.
pub fn decode_text_info_frame(buffer: &[u8], offset: usize) -> Result<(Id3TextFrame, usize)> {
    decode_text_info_frame_with(buffer, offset, &DecodeOptions::default())
}

pub fn decode_text_info_frame_with(
    buffer: &[u8],
    offset: usize,
    options: &DecodeOptions,
) -> Result<(Id3TextFrame, usize)> {
    let mut cursor = ByteCursor::at(buffer, offset);
    let frame = Id3TextFrame::read(&mut cursor, options)?;
    Ok((frame, cursor.position()))
}
