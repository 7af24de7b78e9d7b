// ID3v2 tag implementation

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::{DecodeError, Result};
use crate::id3::frames::{check_frame_id, Id3FrameHeader, Id3TextFrame};
use crate::options::DecodeOptions;
use crate::utils::io::ByteCursor;

/// Tag-level flags from header byte 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TagFlags {
    pub unsynchronisation: bool,
    pub extended_header: bool,
    pub experimental: bool,
    pub footer_present: bool,
}

impl TagFlags {
    pub fn from_byte(byte: u8) -> Self {
        TagFlags {
            unsynchronisation: byte & 0x80 != 0,
            extended_header: byte & 0x40 != 0,
            experimental: byte & 0x20 != 0,
            footer_present: byte & 0x10 != 0,
        }
    }
}

/// ID3v2 header structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Id3v2Header {
    /// (major, revision), e.g. (4, 0) for ID3v2.4.0
    #[serde(serialize_with = "serialize_version")]
    pub version: (u8, u8),
    pub flags: TagFlags,
    /// Size of everything after the header, excluding the footer
    pub size: u32,
}

fn serialize_version<S: Serializer>(version: &(u8, u8), serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("2.{}.{}", version.0, version.1))
}

/// ID3v2 tag structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Id3v2Tag {
    pub header: Id3v2Header,
    pub text_frames: Vec<Id3TextFrame>,
    /// Headers of non-text frames, which are skipped by size
    pub other_frames: Vec<Id3FrameHeader>,
    /// Zero bytes between the last frame and the end of the tag
    pub padding: usize,
    /// Frames that were skipped or ended the scan early
    #[serde(skip)]
    pub diagnostics: Vec<String>,
}

impl Id3v2Header {
    pub const SIZE: usize = 10;
    const ID: [u8; 3] = [b'I', b'D', b'3'];

    /// Read ID3v2 header from cursor.
    ///
    /// Returns `Ok(None)` when the "ID3" magic is absent, which is a normal
    /// outcome for untagged streams.
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Option<Self>> {
        match cursor.peek(Self::ID.len()) {
            Ok(magic) if magic == Self::ID => {}
            _ => return Ok(None),
        }

        let buffer: [u8; Self::SIZE] = cursor.read_array()?;
        let size = crate::utils::io::synchsafe([buffer[6], buffer[7], buffer[8], buffer[9]]);

        Ok(Some(Id3v2Header {
            version: (buffer[3], buffer[4]),
            flags: TagFlags::from_byte(buffer[5]),
            size,
        }))
    }

    /// Version formatted as "2.major.revision"
    pub fn version_string(&self) -> String {
        format!("2.{}.{}", self.version.0, self.version.1)
    }

    /// Bytes the whole tag occupies: header, body and optional footer
    pub fn tag_len(&self) -> usize {
        let footer = if self.flags.footer_present { Self::SIZE } else { 0 };
        Self::SIZE + self.size as usize + footer
    }
}

/// Decode the 10-byte tag header at the start of `buffer`.
pub fn decode_tag_header(buffer: &[u8]) -> Result<Option<Id3v2Header>> {
    Id3v2Header::read(&mut ByteCursor::new(buffer))
}

/// Decode the tag at the start of `buffer` with default options.
pub fn decode_tag(buffer: &[u8]) -> Result<Option<Id3v2Tag>> {
    decode_tag_with(buffer, &DecodeOptions::default())
}

pub fn decode_tag_with(buffer: &[u8], options: &DecodeOptions) -> Result<Option<Id3v2Tag>> {
    let mut cursor = ByteCursor::new(buffer);
    let header = match Id3v2Header::read(&mut cursor)? {
        Some(h) => h,
        None => return Ok(None),
    };

    let size = header.size as usize;
    if size > cursor.remaining() {
        return Err(DecodeError::Truncated {
            needed: size,
            available: cursor.remaining(),
        });
    }

    // Everything below reads from a cursor that ends at the tag boundary.
    let mut body = cursor.sub_cursor(size)?;

    if header.flags.extended_header {
        skip_extended_header(&mut body, header.version.0)?;
    }

    let unsynchronised = header.flags.unsynchronisation;
    let mut tag = Id3v2Tag {
        header,
        text_frames: Vec::new(),
        other_frames: Vec::new(),
        padding: 0,
        diagnostics: Vec::new(),
    };

    let mut stopped = false;
    while body.remaining() >= Id3FrameHeader::SIZE {
        let frame_start = body.position();
        let id = body.peek(4)?;

        // Check for padding (zero id byte)
        if id[0] == 0 {
            break;
        }

        let frame_header = match check_frame_id(id)
            .and_then(|_| Id3FrameHeader::read(&mut body, options.synchsafe_frame_sizes))
        {
            Ok(h) => h,
            Err(e) => {
                warn!(offset = frame_start, error = %e, "stopping tag scan at unreadable frame header");
                tag.diagnostics.push(format!("tag scan stopped at offset {frame_start}: {e}"));
                stopped = true;
                break;
            }
        };

        let mut frame_body = match body.sub_cursor(frame_header.size as usize) {
            Ok(b) => b,
            Err(e) => {
                // A size that overruns the tag would misalign every later frame
                warn!(frame = %frame_header.id, error = %e, "frame size exceeds tag, stopping");
                tag.diagnostics.push(format!("frame {} overruns the tag: {e}", frame_header.id));
                stopped = true;
                break;
            }
        };

        if frame_header.is_text() {
            let id = frame_header.id.clone();
            match Id3TextFrame::from_body(frame_header, &mut frame_body, unsynchronised) {
                Ok(frame) => tag.text_frames.push(frame),
                Err(e) => {
                    debug!(frame = %id, error = %e, "skipping undecodable text frame");
                    tag.diagnostics.push(format!("frame {id} skipped: {e}"));
                }
            }
        } else {
            debug!(frame = %frame_header.id, size = frame_header.size, "skipping non-text frame");
            tag.other_frames.push(frame_header);
        }
    }

    // Bytes left after a scan that stopped on an error are not padding
    tag.padding = if stopped { 0 } else { body.remaining() };
    Ok(Some(tag))
}

/// v2.3: 4-byte big-endian size that excludes itself.
/// v2.4: synchsafe size that includes itself.
fn skip_extended_header(body: &mut ByteCursor<'_>, major: u8) -> Result<()> {
    if major >= 4 {
        let size = body.read_synchsafe_u32()? as usize;
        if size < 4 {
            return Err(DecodeError::malformed(format!("extended header size {size}")));
        }
        body.skip(size - 4)
    } else {
        let size = body.read_be_u32()? as usize;
        body.skip(size)
    }
}

impl Id3v2Tag {
    /// Value of the first text frame with the given id
    pub fn text(&self, id: &str) -> Option<&str> {
        self.text_frames
            .iter()
            .find(|f| f.header.id == id)
            .map(|f| f.value.as_str())
    }

    /// Value of the `TXXX` frame with the given description
    pub fn user_text(&self, description: &str) -> Option<&str> {
        self.text_frames
            .iter()
            .find(|f| f.header.is_user_text() && f.description == description)
            .map(|f| f.value.as_str())
    }

    /// Bytes the tag occupies in the stream
    pub fn len(&self) -> usize {
        self.header.tag_len()
    }

    pub fn is_empty(&self) -> bool {
        self.text_frames.is_empty() && self.other_frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::frames::tests::{frame, utf16_bom_be};
    use crate::utils::encoding::TextEncoding;

    fn tag(version: (u8, u8), flags: u8, body: &[u8]) -> Vec<u8> {
        let size = body.len() as u32;
        let mut data = vec![b'I', b'D', b'3', version.0, version.1, flags];
        data.extend([
            ((size >> 21) & 0x7F) as u8,
            ((size >> 14) & 0x7F) as u8,
            ((size >> 7) & 0x7F) as u8,
            (size & 0x7F) as u8,
        ]);
        data.extend(body);
        data
    }

    /// Three text frames and ten bytes of padding, 85 bytes in total
    fn lavf_tag_body() -> Vec<u8> {
        let mut body = frame("TDRC", b"\x032022-11-16\x00");
        body.extend(frame("TXXX", b"\x03time_reference\x000\x00"));
        body.extend(frame("TSSE", b"\x03Lavf59.27.100\x00"));
        body.extend([0u8; 10]);
        body
    }

    #[test]
    fn test_header_absent() {
        assert_eq!(decode_tag_header(b"\xFF\xFB\x90\x00").unwrap(), None);
        assert_eq!(decode_tag_header(b"ID").unwrap(), None);
        assert_eq!(decode_tag_header(b"").unwrap(), None);
        assert_eq!(decode_tag(b"TAG").unwrap(), None);
    }

    #[test]
    fn test_header_truncated() {
        let err = decode_tag_header(b"ID3\x04\x00").unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 10, available: 5 });
    }

    #[test]
    fn test_header_version_and_size() {
        let data = tag((4, 0), 0x00, &lavf_tag_body());
        let header = decode_tag_header(&data).unwrap().expect("Should find tag");
        assert_eq!(header.version, (4, 0));
        assert_eq!(header.version_string(), "2.4.0");
        assert_eq!(header.size, 85);
        assert_eq!(header.tag_len(), 95);
    }

    #[test]
    fn test_header_flags() {
        let header = decode_tag_header(b"ID3\x03\x00\xF0\x00\x00\x00\x00")
            .unwrap()
            .expect("Should find tag");
        assert!(header.flags.unsynchronisation);
        assert!(header.flags.extended_header);
        assert!(header.flags.experimental);
        assert!(header.flags.footer_present);
        assert_eq!(header.tag_len(), 20);
    }

    #[test]
    fn test_decode_tag_utf8_frames() {
        let data = tag((4, 0), 0x00, &lavf_tag_body());
        let parsed = decode_tag(&data).unwrap().expect("Should find tag");

        let ids: Vec<&str> = parsed.text_frames.iter().map(|f| f.header.id.as_str()).collect();
        assert_eq!(ids, ["TDRC", "TXXX", "TSSE"]);
        let sizes: Vec<u32> = parsed.text_frames.iter().map(|f| f.header.size).collect();
        assert_eq!(sizes, [12, 18, 15]);

        assert_eq!(parsed.text("TDRC"), Some("2022-11-16"));
        assert_eq!(parsed.text("TSSE"), Some("Lavf59.27.100"));
        assert_eq!(parsed.user_text("time_reference"), Some("0"));
        assert_eq!(parsed.text("TIT2"), None);
        assert_eq!(parsed.padding, 10);
        assert_eq!(parsed.len(), 95);
        assert!(parsed.text_frames.iter().all(|f| f.encoding == TextEncoding::Utf8));
    }

    #[test]
    fn test_decode_tag_mixed_encodings_and_binary_frames() {
        let mut body = Vec::new();
        let mut talb = vec![0x01];
        talb.extend(utf16_bom_be("DOVA用"));
        body.extend(frame("TALB", &talb));
        body.extend(frame("APIC", &[0xAB; 64]));
        body.extend(frame("TRCK", b"\x001\x00"));
        body.extend(frame("TYER", b"\x002022\x00"));

        let data = tag((3, 0), 0x00, &body);
        let parsed = decode_tag(&data).unwrap().expect("Should find tag");

        assert_eq!(parsed.header.version_string(), "2.3.0");
        assert_eq!(parsed.text("TALB"), Some("DOVA用"));
        assert_eq!(parsed.text("TRCK"), Some("1"));
        assert_eq!(parsed.text("TYER"), Some("2022"));
        assert_eq!(parsed.other_frames.len(), 1);
        assert_eq!(parsed.other_frames[0].id, "APIC");
        assert_eq!(parsed.other_frames[0].size, 64);
        assert_eq!(parsed.padding, 0);
    }

    #[test]
    fn test_tag_size_beyond_buffer() {
        let mut data = tag((4, 0), 0x00, &lavf_tag_body());
        data.truncate(50);
        let err = decode_tag(&data).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 85, available: 40 });
    }

    #[test]
    fn test_bad_encoding_frame_is_skipped() {
        let mut body = frame("TIT2", b"\x09garbage\x00");
        body.extend(frame("TPE1", b"\x00Artist\x00"));
        let data = tag((3, 0), 0x00, &body);

        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.text_frames.len(), 1);
        assert_eq!(parsed.text("TPE1"), Some("Artist"));
        assert_eq!(parsed.diagnostics, ["frame TIT2 skipped: unsupported text encoding value 9"]);
    }

    #[test]
    fn test_frame_overrunning_tag_stops_scan() {
        let mut body = frame("TPE1", b"\x00Artist\x00");
        let mut broken = frame("TIT2", b"\x00Title\x00");
        broken[7] = 0xFF; // claims 255 bytes
        body.extend(broken);
        body.extend(frame("TALB", b"\x00Album\x00"));
        let data = tag((3, 0), 0x00, &body);

        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.text_frames.len(), 1);
        assert_eq!(parsed.text("TPE1"), Some("Artist"));
        assert_eq!(parsed.text("TALB"), None);
        assert_eq!(parsed.padding, 0);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].starts_with("frame TIT2 overruns the tag"));
    }

    #[test]
    fn test_invalid_frame_id_stops_scan() {
        let mut body = frame("TPE1", b"\x00Artist\x00");
        body.extend(frame("bad!", b"\x00x\x00"));
        body.extend(frame("TALB", b"\x00Album\x00"));
        let data = tag((3, 0), 0x00, &body);

        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.text_frames.len(), 1);
        assert_eq!(parsed.text("TPE1"), Some("Artist"));
        assert_eq!(parsed.text("TALB"), None);
        assert_eq!(parsed.padding, 0);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].starts_with("tag scan stopped at offset 18: malformed data: invalid frame id"));
    }

    #[test]
    fn test_trailing_padding_is_counted() {
        let mut body = frame("TPE1", b"\x00Artist\x00");
        body.extend([0u8; 30]);
        let data = tag((3, 0), 0x00, &body);

        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.padding, 30);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_compressed_frame_is_skipped() {
        let mut compressed = frame("TIT2", b"\x00\x00\x00\x10\x78\x9C");
        compressed[9] = 0x08;
        let mut body = compressed;
        body.extend(frame("TPE1", b"\x00Artist\x00"));
        let data = tag((4, 0), 0x00, &body);

        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.text("TIT2"), None);
        assert_eq!(parsed.text("TPE1"), Some("Artist"));
        assert_eq!(
            parsed.diagnostics,
            ["frame TIT2 skipped: unsupported frame format flags value 8"]
        );
    }

    #[test]
    fn test_tag_unsynchronisation_applies_to_text() {
        let data = tag((4, 0), 0x80, &frame("TPE1", b"\x00\xFF\x00\xE9\x00"));
        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.text("TPE1"), Some("\u{ff}\u{e9}"));
    }

    #[test]
    fn test_never_reads_past_tag_boundary() {
        // The frame after the tag must not be picked up
        let mut data = tag((3, 0), 0x00, &frame("TPE1", b"\x00Artist\x00"));
        data.extend(frame("TIT2", b"\x00Outside\x00"));

        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.text_frames.len(), 1);
        assert_eq!(parsed.text("TIT2"), None);
    }

    #[test]
    fn test_extended_header_v23() {
        let mut body = vec![0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        body.extend(frame("TIT2", b"\x00Title\x00"));
        let data = tag((3, 0), 0x40, &body);

        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.text("TIT2"), Some("Title"));
    }

    #[test]
    fn test_extended_header_v24() {
        let mut body = vec![0x00, 0x00, 0x00, 0x06, 0x01, 0x00];
        body.extend(frame("TIT2", b"\x03Title\x00"));
        let data = tag((4, 0), 0x40, &body);

        let parsed = decode_tag(&data).unwrap().expect("Should find tag");
        assert_eq!(parsed.text("TIT2"), Some("Title"));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let data = tag((4, 0), 0x00, &lavf_tag_body());
        assert_eq!(decode_tag(&data).unwrap(), decode_tag(&data).unwrap());
    }
}
