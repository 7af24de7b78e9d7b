// Decoder configuration

use serde::{Deserialize, Serialize};

/// Number of leading one-bits that make up an MPEG frame sync word.
///
/// The 11-bit form admits MPEG 2.5 streams; the 12-bit form is the original
/// MPEG-1/2 definition and rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncWidth {
    #[default]
    Eleven,
    Twelve,
}

impl SyncWidth {
    pub fn bits(self) -> u32 {
        match self {
            SyncWidth::Eleven => 11,
            SyncWidth::Twelve => 12,
        }
    }

    /// The all-ones pattern the sync field must equal
    pub fn pattern(self) -> u32 {
        (1 << self.bits()) - 1
    }
}

/// Knobs for the parts of the format that differ between writers and
/// revisions. The defaults suit files from common encoders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub sync_width: SyncWidth,
    /// Read ID3 frame sizes as synchsafe integers (ID3v2.4 conformant
    /// writers) instead of plain big-endian
    pub synchsafe_frame_sizes: bool,
    /// Stop collecting MPEG frame headers after this many; `None` scans the
    /// whole buffer
    pub max_frames: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            sync_width: SyncWidth::Eleven,
            synchsafe_frame_sizes: false,
            max_frames: None,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sync_width(mut self, sync_width: SyncWidth) -> Self {
        self.sync_width = sync_width;
        self
    }

    pub fn with_synchsafe_frame_sizes(mut self, enabled: bool) -> Self {
        self.synchsafe_frame_sizes = enabled;
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }
}
