// Error types for the decoder

use thiserror::Error;

/// Result type alias for decode operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors raised while decoding a single structure.
///
/// An absent structure (no "ID3" magic, no Xing/Info id) is not an error; the
/// decoders return `Ok(None)` for that case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the field requires
    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// Magic or sync mismatch, or a size that cannot be trusted
    #[error("malformed data: {0}")]
    Malformed(String),

    /// Reserved or unrecognised enumerator value
    #[error("unsupported {field} value {value}")]
    Unsupported { field: &'static str, value: u32 },
}

impl DecodeError {
    /// Create a malformed-data error
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        DecodeError::Malformed(msg.into())
    }

    pub fn unsupported(field: &'static str, value: u32) -> Self {
        DecodeError::Unsupported { field, value }
    }

    /// Whether this error came from running out of input
    pub fn is_truncated(&self) -> bool {
        matches!(self, DecodeError::Truncated { .. })
    }
}
