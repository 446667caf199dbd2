//! World event feed.
//!
//! Reads newline-delimited JSON [`WorldEvent`]s and forwards them, in order,
//! to the engine channel. Blank lines and `#` comments are skipped; malformed
//! lines are logged and skipped without stopping the feed.

use crate::cli::FeedSource;
use capture_engine::WorldEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Line counters for one feed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    pub lines: u64,
    pub events: u64,
    pub malformed: u64,
}

/// Parses one feed line. Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<WorldEvent>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Forwards every event from `reader` until EOF or until the engine goes away.
///
/// Malformed lines are logged and counted, never fatal.
///
/// # Arguments
///
/// * `reader` - Line-oriented source of JSON events
/// * `tx` - Sender half of the engine's event channel
///
/// # Returns
///
/// Counters describing what was read.
pub async fn read_feed<R>(reader: R, tx: mpsc::Sender<WorldEvent>) -> FeedSummary
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut summary = FeedSummary::default();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                summary.lines += 1;
                match parse_line(&line) {
                    Ok(Some(event)) => {
                        if tx.send(event).await.is_err() {
                            debug!("Engine channel closed; stopping feed");
                            break;
                        }
                        summary.events += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        summary.malformed += 1;
                        warn!("⚠️ Skipping malformed event on line {}: {}", summary.lines, e);
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("❌ Failed to read event feed: {}", e);
                break;
            }
        }
    }

    summary
}

/// Spawns the feed reader for `source`.
pub fn spawn_feed(source: FeedSource, tx: mpsc::Sender<WorldEvent>) -> JoinHandle<FeedSummary> {
    tokio::spawn(async move {
        let summary = match &source {
            FeedSource::Stdin => read_feed(BufReader::new(tokio::io::stdin()), tx).await,
            FeedSource::File(path) => match tokio::fs::File::open(path).await {
                Ok(file) => read_feed(BufReader::new(file), tx).await,
                Err(e) => {
                    error!("❌ Cannot open event feed {}: {}", path.display(), e);
                    return FeedSummary::default();
                }
            },
        };

        info!(
            "📥 Feed {} exhausted: {} event(s), {} malformed line(s)",
            source.describe(),
            summary.events,
            summary.malformed
        );
        summary
    })
}
