//! # Capture Server - Headless Host
//!
//! Drives the capture zone engine from a newline-delimited JSON event feed.
//! This entry point handles CLI parsing, configuration loading, logging setup
//! and the application lifecycle.
//!
//! ## Quick Start
//!
//! ```bash
//! # Read events from stdin with the default configuration
//! capture_server < events.jsonl
//!
//! # Custom configuration and an event file
//! capture_server --config production.toml --feed events.jsonl
//!
//! # Faster ticks, verbose JSON logs
//! capture_server --tick-interval 20 --log-level debug --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `capture.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! SIGINT and SIGTERM stop the event sources, drain queued events and print
//! final statistics. A second signal exits immediately.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod feed;
pub mod host;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

pub use config::{EngineSection, LoggingSettings, SpawnerSettings};

/// Parses arguments, sets up logging and runs the application to completion.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    let mut logging = config.logging.clone();
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }
    if let Err(e) = logging::setup_logging(&logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_engine::ZoneIndex;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_config_builds_zone_index() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let zones = ZoneIndex::new(config.capture_points.clone()).expect("Default points should be valid");
        assert_eq!(zones.len(), 1);
        assert!(zones.get("HillA").is_some());
    }

    #[tokio::test]
    async fn test_cli_overrides_are_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.toml");
        let args = CliArgs::try_parse_from([
            "capture_server".to_string(),
            "--config".to_string(),
            path.display().to_string(),
            "--feed".to_string(),
            "events.jsonl".to_string(),
            "--tick-interval".to_string(),
            "0".to_string(),
        ])
        .unwrap();

        // A zero tick interval from the command line must fail validation.
        assert!(Application::new(args).await.is_err());
        assert!(path.exists());
    }
}
