// CLI module for mp3meta
//
// Only compiled into the binary; the library and Python extension do not
// depend on it.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config};
pub use output::OutputFormatter;
