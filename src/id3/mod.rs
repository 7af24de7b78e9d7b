// ID3v2 tag decoding
pub mod frames;
pub mod v2;

pub use frames::{
    decode_text_info_frame, FrameFormatFlags, FrameStatusFlags, Id3FrameHeader, Id3TextFrame,
};
pub use v2::{decode_tag, decode_tag_header, decode_tag_with, Id3v2Header, Id3v2Tag, TagFlags};
