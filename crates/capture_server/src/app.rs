//! Main application logic and lifecycle management.
//!
//! The `Application` composes one [`CaptureEngine`] with the headless host
//! collaborators and drives it from two sources: the event feed and a
//! periodic ticker. Both write into a single channel read by one engine task,
//! so events are handled strictly in arrival order.

use crate::cli::{CliArgs, FeedSource};
use crate::config::AppConfig;
use crate::feed::spawn_feed;
use crate::host::{build_spawner, CaptureLedger, DayLogger, HeadlessWorld, LogNotifier};
use crate::logging::display_banner;
use crate::signals::{setup_signal_handlers, setup_signal_handlers_silent};
use capture_engine::{
    CaptureEngine, Collaborators, Colorizer, EngineStats, EventOutcome, LegacyColorizer, PeriodicTickEvent,
    PlainColorizer, WorldEvent, ZoneIndex, ZoneStatistics,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Events buffered between the sources and the engine task.
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Main application struct.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Where world events come from
    feed: FeedSource,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed command-line arguments
    ///
    /// # Returns
    ///
    /// A configured application ready to run, or an error if the
    /// configuration could not be loaded or failed validation.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(tick_interval_ms) = args.tick_interval_ms {
            config.engine.tick_interval_ms = tick_interval_ms;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        } else {
            info!("✅ Configuration loaded and validated successfully");
        }

        display_banner();

        let feed = args.feed.unwrap_or_else(|| config.feed_source());
        Ok(Self { config, feed })
    }

    /// Runs the engine until a shutdown signal arrives, then drains queued
    /// events and prints final statistics.
    ///
    /// The feed and the ticker are the only producers; the engine task is the
    /// only consumer, so every event is handled in arrival order.
    ///
    /// # Returns
    ///
    /// `Ok(())` after a clean shutdown, or an error if the capture points are
    /// invalid or signal handling could not be installed.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting capture server");
        self.log_configuration_summary();

        let zones = Arc::new(ZoneIndex::new(self.config.capture_points.clone())?);
        let statistics = Arc::new(ZoneStatistics::new());
        let ledger = Arc::new(CaptureLedger::default());
        let notifier = Arc::new(LogNotifier::default());
        let world = Arc::new(HeadlessWorld::new(self.config.spawner.provider_available));
        let colorizer: Arc<dyn Colorizer> = if self.config.engine.color_codes {
            Arc::new(LegacyColorizer)
        } else {
            Arc::new(PlainColorizer)
        };

        let collaborators = Collaborators {
            notifier: notifier.clone(),
            colorizer,
            outcome: ledger.clone(),
            statistics: statistics.clone(),
            spawner: build_spawner(&self.config.spawner, world.clone()),
            day_cycle: Arc::new(DayLogger::default()),
        };
        let engine = CaptureEngine::new(
            zones.clone(),
            self.config.to_engine_settings(),
            collaborators,
            Utc::now(),
        );

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stats_tx, stats_rx) = watch::channel(EngineStats::default());

        let engine_handle = tokio::spawn(run_engine(engine, rx, stats_tx));
        let ticker_handle = spawn_ticker(Duration::from_millis(self.config.engine.tick_interval_ms), tx.clone());
        let feed_handle = spawn_feed(self.feed.clone(), tx);

        // Start monitoring task for real-time statistics
        let monitoring_handle = {
            let statistics = statistics.clone();
            let zones = zones.clone();
            let period = Duration::from_secs(self.config.engine.stats_interval_secs);

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.tick().await;
                let mut last_events = 0u64;

                loop {
                    interval.tick().await;

                    let stats = *stats_rx.borrow();
                    let events_this_period = stats.events_handled.saturating_sub(last_events);
                    last_events = stats.events_handled;

                    info!(
                        "📊 Engine Health - {} events/period | {} sessions | {} players | {} zone kills | {} points",
                        events_this_period,
                        stats.active_sessions,
                        stats.tracked_players,
                        statistics.total_records(),
                        zones.len()
                    );
                }
            })
        };

        info!("✅ Capture server is now running!");
        info!("📥 Reading events from {}", self.feed.describe());
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        setup_signal_handlers().await?;

        // A second signal skips the drain.
        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("📡 Phase 1: Stopping event sources...");
        monitoring_handle.abort();
        ticker_handle.abort();
        feed_handle.abort();

        info!("⏳ Phase 2: Draining queued events...");
        match tokio::time::timeout(Duration::from_secs(5), engine_handle).await {
            Ok(Ok(engine)) => {
                log_final_statistics(&engine, &statistics, &ledger, &notifier, &world);
            }
            Ok(Err(e)) => error!("❌ Engine task failed: {}", e),
            Err(_) => warn!("⏰ Engine did not drain within timeout, skipping final statistics"),
        }

        info!("✅ Capture server shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🚩 Capture points: {}", self.config.capture_points.len());
        for point in &self.config.capture_points {
            info!(
                "    - {} in {} at ({:.0}, {:.0}, {:.0}), radius {} chunk(s)",
                point.id, point.world, point.position.x, point.position.y, point.position.z, point.capture_radius
            );
        }
        info!("  ⏱️ Tick interval: {}ms", self.config.engine.tick_interval_ms);
        info!("  🚫 Global blocked commands: {:?}", self.config.engine.blocked_commands);
        info!("  👹 Spawner: {:?}", self.config.spawner.backend);
    }
}

/// Single consumer of the event channel.
///
/// Returns the engine once every sender has been dropped and the channel is
/// drained. A stats snapshot is published after every tick.
pub async fn run_engine(
    mut engine: CaptureEngine,
    mut rx: mpsc::Receiver<WorldEvent>,
    stats_tx: watch::Sender<EngineStats>,
) -> CaptureEngine {
    while let Some(event) = rx.recv().await {
        let kind = event.kind();
        let is_tick = matches!(event, WorldEvent::PeriodicTick(_));

        if engine.handle(event) == EventOutcome::Cancel {
            debug!("🚫 {} cancelled by zone protection", kind);
        }
        if is_tick {
            stats_tx.send_replace(engine.stats());
        }
    }

    stats_tx.send_replace(engine.stats());
    engine
}

/// Emits a `PeriodicTick` every `period` until the engine channel closes.
pub fn spawn_ticker(period: Duration, tx: mpsc::Sender<WorldEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            interval.tick().await;
            let tick = WorldEvent::PeriodicTick(PeriodicTickEvent { now: Utc::now() });
            if tx.send(tick).await.is_err() {
                break;
            }
        }
    })
}

/// Logs final statistics during shutdown.
fn log_final_statistics(
    engine: &CaptureEngine,
    statistics: &ZoneStatistics,
    ledger: &CaptureLedger,
    notifier: &LogNotifier,
    world: &HeadlessWorld,
) {
    let stats = engine.stats();
    info!("📊 Final Statistics:");
    info!("  - Events handled: {} ({} cancelled, {} ignored)", stats.events_handled, stats.events_cancelled, stats.events_ignored);
    info!("  - Ticks: {}", stats.ticks);
    info!(
        "  - Captures: {} started, {} completed, {} cancelled, {} still active",
        stats.captures_started,
        ledger.completed(),
        ledger.cancelled(),
        stats.active_sessions
    );
    info!("  - Reinforcements spawned: {} (world saw {})", stats.reinforcements_spawned, world.spawned());
    info!("  - Messages sent: {}", notifier.sent());

    for point in engine.zones().snapshot().iter() {
        let totals = statistics.zone_totals(&point.id);
        info!(
            "  - {}: {} PvP kill(s), {} mob kill(s)",
            point.id, totals.player_kills, totals.mob_kills
        );
        if let Some((leader, row)) = statistics.leaderboard(&point.id).into_iter().next() {
            info!("      top fighter: {} ({} kills)", leader, row.player_kills + row.mob_kills);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_engine::{
        BlockAction, BlockChangeEvent, CaptureRequestEvent, CapturePoint, EngineSettings, PlayerId, PlayerMoveEvent,
        Position, SpawnerSelection, WorldId,
    };
    use crate::config::SpawnerSettings;

    fn engine_with(points: Vec<CapturePoint>) -> (CaptureEngine, Arc<CaptureLedger>) {
        let ledger = Arc::new(CaptureLedger::default());
        let world = Arc::new(HeadlessWorld::new(true));
        let settings = SpawnerSettings {
            backend: SpawnerSelection::Vanilla,
            ..SpawnerSettings::default()
        };
        let collaborators = Collaborators {
            notifier: Arc::new(LogNotifier::default()),
            colorizer: Arc::new(PlainColorizer),
            outcome: ledger.clone(),
            statistics: Arc::new(ZoneStatistics::new()),
            spawner: build_spawner(&settings, world),
            day_cycle: Arc::new(DayLogger::default()),
        };
        let zones = Arc::new(ZoneIndex::new(points).unwrap());
        (
            CaptureEngine::new(zones, EngineSettings::default(), collaborators, Utc::now()),
            ledger,
        )
    }

    fn hill() -> CapturePoint {
        let mut point = CapturePoint::new("HillA", "W", Position::new(0.0, 0.0, 0.0), 2);
        point.capture_ticks = 2;
        point
    }

    #[tokio::test]
    async fn engine_task_handles_events_in_order_and_returns_engine() {
        let (engine, ledger) = engine_with(vec![hill()]);
        let (tx, rx) = mpsc::channel(16);
        let (stats_tx, stats_rx) = watch::channel(EngineStats::default());
        let handle = tokio::spawn(run_engine(engine, rx, stats_tx));

        let alice = PlayerId::from("alice");
        tx.send(WorldEvent::PlayerMove(PlayerMoveEvent {
            player: Some(alice.clone()),
            world: Some(WorldId::from("W")),
            position: Some(Position::new(8.0, 64.0, 8.0)),
        }))
        .await
        .unwrap();
        tx.send(WorldEvent::CaptureAttempt(CaptureRequestEvent {
            player: Some(alice.clone()),
            point_id: Some("HillA".to_string()),
        }))
        .await
        .unwrap();
        tx.send(WorldEvent::BlockChange(BlockChangeEvent {
            actor: Some(alice.clone()),
            privileged: false,
            action: BlockAction::Place,
            world: Some(WorldId::from("W")),
            position: Some(Position::new(0.0, 64.0, 0.0)),
        }))
        .await
        .unwrap();
        for _ in 0..2 {
            tx.send(WorldEvent::PeriodicTick(PeriodicTickEvent { now: Utc::now() }))
                .await
                .unwrap();
        }
        drop(tx);

        let engine = handle.await.unwrap();
        let stats = engine.stats();

        assert_eq!(stats.events_handled, 5);
        assert_eq!(stats.events_cancelled, 1);
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.captures_started, 1);
        assert_eq!(ledger.completed(), 1);
        assert_eq!(stats_rx.borrow().ticks, 2);
    }

    #[tokio::test]
    async fn ticker_emits_periodic_ticks() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_ticker(Duration::from_millis(5), tx);

        let first = rx.recv().await;
        handle.abort();

        assert!(matches!(first, Some(WorldEvent::PeriodicTick(_))));
    }
}
