// Bounded cursor and bit window over an in-memory buffer

use crate::error::{DecodeError, Result};

/// Forward-only reader over a byte slice.
///
/// Every read is bounds-checked; a short read fails with
/// [`DecodeError::Truncated`] and leaves the position unchanged.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Create a cursor positioned at `offset`, clamped to the end of `data`
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        ByteCursor {
            data,
            pos: offset.min(data.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn check(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Look at the next `n` bytes without consuming them
    pub fn peek(&self, n: usize) -> Result<&'a [u8]> {
        self.check(n)?;
        Ok(&self.data[self.pos..self.pos + n])
    }

    /// Read exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(n)?;
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read big-endian 32-bit integer
    pub fn read_be_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Read synchsafe 32-bit integer (7 bits per byte)
    pub fn read_synchsafe_u32(&mut self) -> Result<u32> {
        Ok(synchsafe(self.read_array()?))
    }

    /// Split off a sub-cursor over the next `n` bytes and advance past them.
    pub fn sub_cursor(&mut self, n: usize) -> Result<ByteCursor<'a>> {
        self.read_bytes(n).map(ByteCursor::new)
    }

    /// Read up to the next occurrence of `terminator`, stepping by its width.
    ///
    /// The returned span excludes the terminator and the cursor moves past it.
    /// A missing terminator yields everything that is left.
    pub fn read_until(&mut self, terminator: &[u8]) -> &'a [u8] {
        let width = terminator.len().max(1);
        let rest = &self.data[self.pos..];

        let end = rest
            .chunks_exact(width)
            .position(|unit| unit == terminator)
            .map(|units| units * width);

        match end {
            Some(end) => {
                self.pos += end + width;
                &rest[..end]
            }
            None => {
                self.pos = self.data.len();
                rest
            }
        }
    }

    /// Everything after the current position, consuming it
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }
}

/// Decode a 28-bit synchsafe integer: the low 7 bits of each byte, shifted
/// by 21, 14, 7 and 0.
pub fn synchsafe(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32 & 0x7F) << 21)
        | ((bytes[1] as u32 & 0x7F) << 14)
        | ((bytes[2] as u32 & 0x7F) << 7)
        | (bytes[3] as u32 & 0x7F)
}

/// Undo ID3 unsynchronisation: every `FF 00` pair becomes `FF`.
pub fn remove_unsynchronisation(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut previous_ff = false;
    for &byte in data {
        if !(previous_ff && byte == 0x00) {
            out.push(byte);
        }
        previous_ff = byte == 0xFF;
    }
    out
}

/// MSB-first view of a 32-bit word.
///
/// Fields are taken left to right; each `take` narrows the bit offset
/// counter, which starts at 32.
#[derive(Debug, Clone, Copy)]
pub struct BitWindow {
    word: u32,
    offset: u32,
}

impl BitWindow {
    pub fn new(bytes: [u8; 4]) -> Self {
        BitWindow {
            word: u32::from_be_bytes(bytes),
            offset: 32,
        }
    }

    /// Bits not yet taken
    pub fn remaining(&self) -> u32 {
        self.offset
    }

    /// Take the next `count` bits. Panics in debug builds if the window is
    /// overdrawn; callers use fixed layouts that sum to 32.
    pub fn take(&mut self, count: u32) -> u32 {
        debug_assert!(count > 0 && count <= self.offset);
        self.offset -= count;
        let mask = if count == 32 { u32::MAX } else { (1u32 << count) - 1 };
        (self.word >> self.offset) & mask
    }

    pub fn take_flag(&mut self) -> bool {
        self.take(1) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bytes_advances() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_bytes(2).unwrap(), &[1, 2]);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(cursor.read_u8().unwrap(), 3);
    }

    #[test]
    fn test_read_bytes_out_of_bounds() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        let err = cursor.read_bytes(4).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 4, available: 3 });
        // Failed reads do not move the cursor
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_at_clamps_offset() {
        let data = [0u8; 4];
        let cursor = ByteCursor::at(&data, 10);
        assert_eq!(cursor.position(), 4);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_read_be_u32() {
        let data = [0x00, 0x78, 0xBE, 0x33];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_be_u32().unwrap(), 7_913_011);
    }

    #[test]
    fn test_synchsafe() {
        assert_eq!(synchsafe([0x00, 0x00, 0x00, 0x55]), 85);
        assert_eq!(synchsafe([0x00, 0x27, 0x0D, 0x5D]), 640_733);
        // High bits are discarded rather than leaking into the value
        assert_eq!(synchsafe([0x80, 0x80, 0x80, 0xD5]), 85);
        assert_eq!(synchsafe([0x7F, 0x7F, 0x7F, 0x7F]), 0x0FFF_FFFF);
    }

    #[test]
    fn test_read_until_single_byte() {
        let data = b"time_reference\x000\x00";
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.read_until(&[0]), b"time_reference");
        assert_eq!(cursor.read_until(&[0]), b"0");
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_read_until_wide_respects_alignment() {
        // Bytes 3..5 are 0x00 0x00 but straddle two units, so they must not
        // end the string.
        let data = [0x00, 0x41, 0x42, 0x00, 0x00, 0x00, 0xFF];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_until(&[0, 0]), &[0x00, 0x41, 0x42, 0x00]);
        assert_eq!(cursor.position(), 6);
    }

    #[test]
    fn test_read_until_missing_terminator() {
        let data = b"Lavf59";
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.read_until(&[0]), b"Lavf59");
        assert!(cursor.is_empty());
        assert_eq!(cursor.read_until(&[0]), b"");
    }

    #[test]
    fn test_sub_cursor_is_bounded() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut cursor = ByteCursor::new(&data);
        let mut body = cursor.sub_cursor(3).unwrap();
        assert_eq!(cursor.position(), 3);
        assert_eq!(body.read_rest(), &[1, 2, 3]);
        assert!(body.read_u8().is_err());
    }

    #[test]
    fn test_bit_window_fields() {
        // 0xFFFBE044: sync, MPEG1, Layer III, no CRC, index 14, 44.1kHz
        let mut bits = BitWindow::new([0xFF, 0xFB, 0xE0, 0x44]);
        assert_eq!(bits.take(11), 0x7FF);
        assert_eq!(bits.take(2), 3);
        assert_eq!(bits.take(2), 1);
        assert!(bits.take_flag());
        assert_eq!(bits.take(4), 14);
        assert_eq!(bits.take(2), 0);
        assert_eq!(bits.remaining(), 10);
        assert!(!bits.take_flag());
        assert!(!bits.take_flag());
        assert_eq!(bits.take(2), 1);
        assert_eq!(bits.remaining(), 6);
    }

    #[test]
    fn test_bit_window_full_word() {
        let mut bits = BitWindow::new([0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(bits.take(32), 0xDEAD_BEEF);
        assert_eq!(bits.remaining(), 0);
    }

    #[test]
    fn test_remove_unsynchronisation() {
        assert_eq!(remove_unsynchronisation(&[0xFF, 0x00, 0xE0, 0x12]), [0xFF, 0xE0, 0x12]);
        assert_eq!(remove_unsynchronisation(&[0xFF, 0x00, 0x00]), [0xFF, 0x00]);
        assert_eq!(remove_unsynchronisation(&[0x00, 0xFF]), [0x00, 0xFF]);
        assert!(remove_unsynchronisation(&[]).is_empty());
    }
}
