// MPEG audio frame and VBR header handling
pub mod frame;
pub mod vbr;

pub use frame::{
    decode_frame_header, find_sync, ChannelMode, FrameScanner, Layer, MpegFrameHeader, MpegVersion,
};
pub use vbr::{decode_vbr_header, VbrHeader, VbrKind};
