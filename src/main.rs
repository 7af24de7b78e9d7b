// CLI binary entry point for mp3meta

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{commands, Commands, Config, OutputFormatter};

fn main() -> Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = config.decode_options();
    let formatter = OutputFormatter::new(config.format, config.quiet);

    match &config.command {
        Commands::Read { files, frames, output } => {
            commands::command_read(files, *frames, output.as_deref(), &options, &formatter)
        }
        Commands::Detect { files } => commands::command_detect(files, &options, &formatter),
        Commands::Batch { directory, pattern } => {
            commands::command_batch(directory, pattern, &options, &formatter)
        }
        Commands::Info { files } => commands::command_info(files, &options, &formatter),
    }
}
