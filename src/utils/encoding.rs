// Text encodings used by ID3v2 text frames

use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8};
use serde::Serialize;

use crate::error::{DecodeError, Result};
use crate::utils::io::ByteCursor;

/// Text encoding types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "ISO-8859-1")]
    Iso8859_1 = 0,
    #[serde(rename = "UTF-16")]
    Utf16 = 1,
    #[serde(rename = "UTF-16BE")]
    Utf16BE = 2,
    #[serde(rename = "UTF-8")]
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(TextEncoding::Iso8859_1),
            1 => Ok(TextEncoding::Utf16),
            2 => Ok(TextEncoding::Utf16BE),
            3 => Ok(TextEncoding::Utf8),
            other => Err(DecodeError::unsupported("text encoding", other as u32)),
        }
    }

    /// Bytes that end a string: one NUL, or two for UTF-16
    pub fn terminator(self) -> &'static [u8] {
        match self {
            TextEncoding::Iso8859_1 | TextEncoding::Utf8 => &[0],
            TextEncoding::Utf16 | TextEncoding::Utf16BE => &[0, 0],
        }
    }
}

/// Read one terminated string from `cursor` in the given encoding.
///
/// UTF-16 strings carry their own byte order mark; an empty remainder is read
/// as an empty string without one.
pub fn read_string(cursor: &mut ByteCursor<'_>, encoding: TextEncoding) -> Result<String> {
    match encoding {
        TextEncoding::Iso8859_1 => Ok(decode_latin1(cursor.read_until(encoding.terminator()))),
        TextEncoding::Utf8 => Ok(decode_utf8(cursor.read_until(encoding.terminator()))),
        TextEncoding::Utf16 => {
            if cursor.is_empty() {
                return Ok(String::new());
            }
            let bom = cursor.read_array::<2>()?;
            let units = cursor.read_until(encoding.terminator());
            Ok(decode_utf16(units, u16::from_be_bytes(bom) == 0xFEFF))
        }
        TextEncoding::Utf16BE => Ok(decode_utf16(cursor.read_until(encoding.terminator()), true)),
    }
}

/// ISO-8859-1 maps every byte to the code point of the same value.
pub fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

pub fn decode_utf8(data: &[u8]) -> String {
    UTF_8.decode_without_bom_handling(data).0.into_owned()
}

/// Decode UTF-16 code units (surrogate pairs included); the BOM, if any, has
/// already been consumed.
pub fn decode_utf16(data: &[u8], big_endian: bool) -> String {
    let codec = if big_endian { UTF_16BE } else { UTF_16LE };
    codec.decode_without_bom_handling(data).0.into_owned()
}
