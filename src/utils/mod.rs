// Shared low-level helpers
pub mod encoding;
pub mod io;

pub use encoding::TextEncoding;
pub use io::{BitWindow, ByteCursor};
