//! CLI module for the gateway
//!
//! Provides command-line interface for:
//! - serve: Load config and run the HTTP gateway
//! - hash-secret: Produce a keyring secret hash
//! - check-config: Validate a config file

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, hash_secret_command, load_config, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
