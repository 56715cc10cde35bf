//! CLI command implementations
//!
//! `serve` is the only long-running command. The others load, check, or
//! derive something and exit.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::json;

use crate::auth::crypto::{hash_secret, is_valid_hash};
use crate::http_server::{HttpServer, HttpServerConfig};
use crate::observability::{Event, Logger};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Load and validate the gateway configuration file
pub fn load_config(path: &Path) -> CliResult<HttpServerConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

    let config: HttpServerConfig = serde_json::from_str(&content)
        .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &HttpServerConfig) -> CliResult<()> {
    if config.host.trim().is_empty() {
        return Err(CliError::config_error("host must not be empty"));
    }

    if config.max_in_flight == 0 {
        return Err(CliError::config_error("max_in_flight must be > 0"));
    }

    let mut seen = HashSet::new();
    for entry in &config.keyring {
        if entry.username.is_empty() {
            return Err(CliError::config_error("keyring username must not be empty"));
        }
        if !seen.insert(entry.username.as_str()) {
            return Err(CliError::config_error(format!(
                "Duplicate keyring username: '{}'",
                entry.username
            )));
        }
        if !is_valid_hash(&entry.secret_hash) {
            return Err(CliError::config_error(format!(
                "Invalid secret_hash for '{}'. Use 'clustergate hash-secret'.",
                entry.username
            )));
        }
    }

    Ok(())
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::HashSecret { secret } => {
            println!("{}", hash_secret_command(&secret)?);
            Ok(())
        }
        Command::CheckConfig { config } => {
            println!("{}", check_config(&config)?);
            Ok(())
        }
    }
}

/// Load the config, build the gateway, and serve until Ctrl-C
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    Logger::event(Event::BootStart, &[]);

    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }

    let identities = config.keyring.len().to_string();
    let max_in_flight = config.max_in_flight.to_string();
    Logger::event(
        Event::ConfigLoaded,
        &[
            ("identities", &identities),
            ("max_in_flight", &max_in_flight),
        ],
    );

    let server = HttpServer::with_config(config);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Hash a secret for a keyring entry
pub fn hash_secret_command(secret: &str) -> CliResult<String> {
    if secret.is_empty() {
        return Err(CliError::config_error("secret must not be empty"));
    }
    Ok(hash_secret(secret)?)
}

/// Validate a config file and describe what it would serve
pub fn check_config(config_path: &Path) -> CliResult<String> {
    let config = load_config(config_path)?;
    let summary = json!({
        "addr": config.socket_addr(),
        "max_in_flight": config.max_in_flight,
        "identities": config.keyring.iter().map(|e| e.username.as_str()).collect::<Vec<_>>(),
        "cors_origins": config.cors_origins,
    });
    Ok(serde_json::to_string_pretty(&summary)?)
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use serde_json::Value;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_config(temp_dir: &TempDir, config: Value) -> PathBuf {
        let config_path = temp_dir.path().join("clustergate.json");
        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({"port": 9100}));

        let config = load_config(&path).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.max_in_flight, 64);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_config(&temp_dir.path().join("absent.json"));
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({"max_in_flight": 0}));
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_keyring_hash_validated() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            json!({"keyring": [{"username": "client.admin", "secret_hash": "plaintext"}]}),
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.message().contains("client.admin"));
    }

    #[test]
    fn test_duplicate_usernames_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let hash = hash_secret_command("key").unwrap();
        let path = write_config(
            &temp_dir,
            json!({"keyring": [
                {"username": "client.admin", "secret_hash": hash},
                {"username": "client.admin", "secret_hash": hash},
            ]}),
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.message().contains("Duplicate"));
    }

    #[test]
    fn test_check_config_lists_identities() {
        let temp_dir = TempDir::new().unwrap();
        let hash = hash_secret_command("key").unwrap();
        let path = write_config(
            &temp_dir,
            json!({"keyring": [{"username": "client.admin", "secret_hash": hash}]}),
        );

        let summary: Value = serde_json::from_str(&check_config(&path).unwrap()).unwrap();
        assert_eq!(summary["identities"][0], "client.admin");
        assert_eq!(summary["addr"], "0.0.0.0:8003");
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(hash_secret_command("").is_err());
    }
}
