// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};
use mp3meta::{DecodeOptions, SyncWidth};

/// mp3meta - MPEG audio metadata CLI tool
#[derive(Parser, Debug)]
#[command(name = "mp3meta")]
#[command(about = "Inspect ID3v2 tags, MPEG frame headers and Xing/Info VBR headers", long_about = None)]
#[command(version)]
#[command(author = "xwsjjctz <xwsjjctz@icloud.com>")]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging; RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Width of the MPEG frame sync word
    #[arg(long, value_enum, default_value = "11", global = true)]
    pub sync_bits: SyncBits,

    /// Stop after this many audio frames
    #[arg(long, global = true)]
    pub max_frames: Option<usize>,

    /// Treat ID3 frame sizes as sync-safe integers (ID3v2.4 style)
    #[arg(long, global = true)]
    pub synchsafe_frame_sizes: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SyncBits {
    #[default]
    #[value(name = "11")]
    Eleven,
    #[value(name = "12")]
    Twelve,
}

impl From<SyncBits> for SyncWidth {
    fn from(bits: SyncBits) -> Self {
        match bits {
            SyncBits::Eleven => SyncWidth::Eleven,
            SyncBits::Twelve => SyncWidth::Twelve,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read metadata from audio file(s)
    Read {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Include every frame header in the output
        #[arg(long)]
        frames: bool,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Detect tag version, first frame and VBR header
    Detect {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },

    /// Batch process multiple files
    Batch {
        /// Directory path
        #[arg(short, long)]
        directory: String,

        /// File pattern (e.g., "*.mp3")
        #[arg(short, long, default_value = "*.mp3")]
        pattern: String,
    },

    /// Show file information
    Info {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },
}

impl Config {
    /// Decoder settings selected on the command line
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::new()
            .with_sync_width(self.sync_bits.into())
            .with_synchsafe_frame_sizes(self.synchsafe_frame_sizes)
            .with_max_frames(self.max_frames)
    }

    /// Default log filter when RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
