//! Command-line interface parsing and argument handling.
//!
//! Every option here overrides the matching setting from the configuration
//! file; anything left unset keeps the file's value.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Configuration file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "capture.toml";

/// Where world events are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Newline-delimited JSON on standard input
    Stdin,
    /// Newline-delimited JSON in a file
    File(PathBuf),
}

impl FeedSource {
    /// `-` selects standard input; anything else is a file path.
    pub fn from_arg(value: &str) -> Self {
        if value == "-" {
            FeedSource::Stdin
        } else {
            FeedSource::File(PathBuf::from(value))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FeedSource::Stdin => "stdin".to_string(),
            FeedSource::File(path) => path.display().to_string(),
        }
    }
}

/// Parsed command-line arguments.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the TOML configuration file
    pub config_path: PathBuf,
    /// Optional override for the event feed
    pub feed: Option<FeedSource>,
    /// Optional override for the tick interval in milliseconds
    pub tick_interval_ms: Option<u64>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    fn command() -> Command {
        Command::new("Capture Server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Headless host driving the capture zone engine from a world event feed")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value(DEFAULT_CONFIG_PATH),
            )
            .arg(
                Arg::new("feed")
                    .short('f')
                    .long("feed")
                    .value_name("FILE")
                    .help("Event feed (newline-delimited JSON); '-' reads stdin"),
            )
            .arg(
                Arg::new("tick-interval")
                    .short('t')
                    .long("tick-interval")
                    .value_name("MS")
                    .help("Milliseconds between periodic ticks")
                    .value_parser(value_parser!(u64)),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
    }

    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&Self::command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            feed: matches
                .get_one::<String>("feed")
                .map(|value| FeedSource::from_arg(value)),
            tick_interval_ms: matches.get_one::<u64>("tick-interval").copied(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_arguments() {
        let args = CliArgs::try_parse_from(["capture_server"]).unwrap();

        assert_eq!(args.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(args.feed.is_none());
        assert!(args.tick_interval_ms.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn overrides_are_parsed() {
        let args = CliArgs::try_parse_from([
            "capture_server",
            "--config",
            "prod.toml",
            "--feed",
            "-",
            "--tick-interval",
            "250",
            "--log-level",
            "debug",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("prod.toml"));
        assert_eq!(args.feed, Some(FeedSource::Stdin));
        assert_eq!(args.tick_interval_ms, Some(250));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }

    #[test]
    fn non_numeric_tick_interval_is_rejected() {
        assert!(CliArgs::try_parse_from(["capture_server", "--tick-interval", "soon"]).is_err());
    }

    #[test]
    fn feed_paths_other_than_dash_are_files() {
        assert_eq!(
            FeedSource::from_arg("events.jsonl"),
            FeedSource::File(PathBuf::from("events.jsonl"))
        );
        assert_eq!(FeedSource::Stdin.describe(), "stdin");
    }
}
