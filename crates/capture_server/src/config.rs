//! Configuration management for the capture server.
//!
//! This module handles loading, validation, and conversion of the server
//! configuration from TOML files and command-line arguments.

use crate::cli::FeedSource;
use capture_engine::{validate_points, CapturePoint, EngineSettings, MessageTemplates, Position, SpawnerSelection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_stats_interval() -> u64 {
    60
}

fn default_zone_notice_delay() -> u64 {
    1
}

fn default_color_codes() -> bool {
    true
}

fn default_feed() -> String {
    "-".to_string()
}

fn default_mobs() -> Vec<String> {
    vec!["zombie".to_string(), "skeleton".to_string()]
}

fn default_provider_available() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine runtime and protection settings
    #[serde(default)]
    pub engine: EngineSection,
    /// Capture points in priority order; the first match wins where rings overlap
    #[serde(default)]
    pub capture_points: Vec<CapturePoint>,
    /// Reinforcement spawner selection
    #[serde(default)]
    pub spawner: SpawnerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Engine-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Event feed: a file path, or `-` for stdin
    #[serde(default = "default_feed")]
    pub feed: String,
    /// Milliseconds between periodic ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Seconds between health summaries
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    /// Ticks between entering a ring and the entry notice
    #[serde(default = "default_zone_notice_delay")]
    pub zone_notice_delay: u64,
    /// Translate `&` color codes in messages; when false they are stripped
    #[serde(default = "default_color_codes")]
    pub color_codes: bool,
    /// Command prefixes refused near every capture point
    #[serde(default)]
    pub blocked_commands: Vec<String>,
    /// Player-facing message templates
    #[serde(default)]
    pub messages: MessageTemplates,
}

/// Which spawner provides reinforcements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnerSettings {
    #[serde(default)]
    pub backend: SpawnerSelection,
    /// Mobs used for points that do not list their own
    #[serde(default = "default_mobs")]
    pub default_mobs: Vec<String>,
    /// Whether the external provider reports itself as loaded
    #[serde(default = "default_provider_available")]
    pub provider_available: bool,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            feed: default_feed(),
            tick_interval_ms: default_tick_interval(),
            stats_interval_secs: default_stats_interval(),
            zone_notice_delay: default_zone_notice_delay(),
            color_codes: default_color_codes(),
            blocked_commands: Vec::new(),
            messages: MessageTemplates::default(),
        }
    }
}

impl Default for SpawnerSettings {
    fn default() -> Self {
        Self {
            backend: SpawnerSelection::default(),
            default_mobs: default_mobs(),
            provider_available: default_provider_available(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut hill = CapturePoint::new("HillA", "world", Position::new(0.0, 64.0, 0.0), 2);
        hill.blocked_commands = vec!["/home".to_string(), "/tpa".to_string()];
        hill.capture_ticks = 600;
        hill.reinforcement_interval = 100;
        hill.max_reinforcements = 5;

        Self {
            engine: EngineSection {
                blocked_commands: vec!["/sethome".to_string()],
                ..EngineSection::default()
            },
            capture_points: vec![hill],
            spawner: SpawnerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration, or an error if the file could not be read,
    /// parsed, or (when missing) written.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the engine section into the settings the engine is built with.
    pub fn to_engine_settings(&self) -> EngineSettings {
        EngineSettings {
            blocked_commands: self.engine.blocked_commands.clone(),
            messages: self.engine.messages.clone(),
            zone_notice_delay: self.engine.zone_notice_delay,
        }
    }

    pub fn feed_source(&self) -> FeedSource {
        FeedSource::from_arg(&self.engine.feed)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.engine.tick_interval_ms == 0 {
            return Err("engine.tick_interval_ms must be greater than 0".to_string());
        }

        if self.engine.stats_interval_secs == 0 {
            return Err("engine.stats_interval_secs must be greater than 0".to_string());
        }

        if self.engine.feed.trim().is_empty() {
            return Err("engine.feed cannot be empty".to_string());
        }

        if let SpawnerSelection::External { provider } = &self.spawner.backend {
            if provider.trim().is_empty() {
                return Err("spawner.backend.provider cannot be empty".to_string());
            }
        }

        validate_points(&self.capture_points).map_err(|e| format!("Invalid capture points: {e}"))?;

        Ok(())
    }
}
