//! CLI argument definitions using clap
//!
//! Commands:
//! - clustergate serve --config <path> [--port <port>]
//! - clustergate hash-secret --secret <secret>
//! - clustergate check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Administrative command gateway for a storage cluster
#[derive(Parser, Debug)]
#[command(name = "clustergate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./clustergate.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the argon2 hash of a secret for the keyring
    HashSecret {
        #[arg(long)]
        secret: String,
    },

    /// Load and validate a configuration file, then exit
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./clustergate.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
