//! Headless implementations of the engine's collaborator traits.
//!
//! Without a real game world attached, every side effect becomes a log line
//! and a counter the shutdown report can read.

use crate::config::SpawnerSettings;
use capture_engine::{
    CancelReason, CaptureOutcome, CaptureSession, DayCycleHandler, EntityHandle, ExternalMobProvider,
    ExternalSpawner, Location, MobSpawner, Notifier, PlayerId, SpawnerSelection, VanillaSpawner, WorldSpawnApi,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Writes player messages to the log.
#[derive(Debug, Default)]
pub struct LogNotifier {
    sent: AtomicU64,
}

impl LogNotifier {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, player: &PlayerId, message: &str) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        info!("💬 → {}: {}", player, message);
    }
}

/// Counts capture results.
#[derive(Debug, Default)]
pub struct CaptureLedger {
    completed: AtomicU64,
    cancelled: AtomicU64,
}

impl CaptureLedger {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl CaptureOutcome for CaptureLedger {
    fn capture_completed(&self, session: &CaptureSession, finished_at: DateTime<Utc>) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        info!(
            "🏆 '{}' now belongs to {} ({})",
            session.point_id,
            session.player_id,
            finished_at.format("%H:%M:%S")
        );
    }

    fn capture_cancelled(&self, _session: &CaptureSession, _reason: CancelReason) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }
}

/// Logs day rollovers.
#[derive(Debug, Default)]
pub struct DayLogger {
    days: AtomicU64,
}

impl DayLogger {
    pub fn days(&self) -> u64 {
        self.days.load(Ordering::Relaxed)
    }
}

impl DayCycleHandler for DayLogger {
    fn on_day_rollover(&self) {
        let day = self.days.fetch_add(1, Ordering::Relaxed) + 1;
        info!("🌅 Day rollover #{}", day);
    }
}

/// Stand-in world that accepts every spawn request.
#[derive(Debug)]
pub struct HeadlessWorld {
    provider_available: bool,
    spawned: AtomicU64,
}

impl HeadlessWorld {
    pub fn new(provider_available: bool) -> Self {
        Self {
            provider_available,
            spawned: AtomicU64::new(0),
        }
    }

    pub fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    fn spawn(&self, mob: &str, location: &Location, target: &PlayerId) -> Option<EntityHandle> {
        self.spawned.fetch_add(1, Ordering::Relaxed);
        let handle = EntityHandle::new();
        info!(
            "👹 Spawned {} in {} at ({:.1}, {:.1}, {:.1}) hunting {}",
            mob, location.world, location.position.x, location.position.y, location.position.z, target
        );
        Some(handle)
    }
}

impl WorldSpawnApi for HeadlessWorld {
    fn spawn_entity(&self, mob: &str, location: &Location, target: &PlayerId) -> Option<EntityHandle> {
        self.spawn(mob, location, target)
    }
}

impl ExternalMobProvider for HeadlessWorld {
    fn is_loaded(&self) -> bool {
        self.provider_available
    }

    fn spawn_mob(&self, mob: &str, location: &Location, target: &PlayerId) -> Option<EntityHandle> {
        self.spawn(mob, location, target)
    }
}

/// Builds the spawner named by the configuration.
pub fn build_spawner(settings: &SpawnerSettings, world: Arc<HeadlessWorld>) -> Arc<dyn MobSpawner> {
    let mobs = settings.default_mobs.clone();
    match &settings.backend {
        SpawnerSelection::Vanilla => Arc::new(VanillaSpawner::new(world, mobs)),
        SpawnerSelection::External { provider } => Arc::new(ExternalSpawner::new(provider.clone(), world, mobs)),
    }
}
