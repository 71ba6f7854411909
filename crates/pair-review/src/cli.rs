use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pair-review", version, about = "Local AI code review server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (local-review sessions, analysis, progress stream).
    Serve {
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Check that the store directory and configured providers are usable.
    Doctor,
}
