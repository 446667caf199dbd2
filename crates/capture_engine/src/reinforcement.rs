//! # Reinforcement Dispatcher
//!
//! Best-effort mob spawning for contested points. The dispatcher talks to a
//! single [`MobSpawner`] chosen when the engine is composed; spawner failures
//! are reported as `None` and never affect the capture session.

use crate::types::{EntityHandle, Location, PlayerId};
use crate::zone::CapturePoint;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// One reinforcement request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub point_id: String,
    pub location: Location,
    pub target: PlayerId,
    pub mob: String,
}

/// Uniform contract over mob spawning backends.
pub trait MobSpawner: Send + Sync {
    /// Spawns one mob, or returns `None` if nothing was spawned.
    fn spawn(&self, request: &SpawnRequest) -> Option<EntityHandle>;

    /// Whether the backend can currently spawn anything.
    fn is_available(&self) -> bool;

    fn name(&self) -> &str;

    /// Mob identifiers this spawner uses when a point has none of its own.
    fn configured_mobs(&self) -> &[String];
}

/// Host world access used by the built-in spawner.
pub trait WorldSpawnApi: Send + Sync {
    fn spawn_entity(&self, mob: &str, location: &Location, target: &PlayerId) -> Option<EntityHandle>;
}

/// Third-party mob provider (a custom-mob plugin or similar).
pub trait ExternalMobProvider: Send + Sync {
    fn is_loaded(&self) -> bool;
    fn spawn_mob(&self, mob: &str, location: &Location, target: &PlayerId) -> Option<EntityHandle>;
}

/// Built-in spawner backed by the host world.
pub struct VanillaSpawner {
    world: Arc<dyn WorldSpawnApi>,
    mobs: Vec<String>,
}

impl VanillaSpawner {
    pub fn new(world: Arc<dyn WorldSpawnApi>, mobs: Vec<String>) -> Self {
        Self { world, mobs }
    }
}

impl MobSpawner for VanillaSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Option<EntityHandle> {
        self.world
            .spawn_entity(&request.mob, &request.location, &request.target)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "vanilla"
    }

    fn configured_mobs(&self) -> &[String] {
        &self.mobs
    }
}

/// Spawner delegating to a third-party provider.
pub struct ExternalSpawner {
    name: String,
    provider: Arc<dyn ExternalMobProvider>,
    mobs: Vec<String>,
}

impl ExternalSpawner {
    pub fn new(name: impl Into<String>, provider: Arc<dyn ExternalMobProvider>, mobs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            provider,
            mobs,
        }
    }
}

impl MobSpawner for ExternalSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Option<EntityHandle> {
        if !self.provider.is_loaded() {
            return None;
        }
        self.provider
            .spawn_mob(&request.mob, &request.location, &request.target)
    }

    fn is_available(&self) -> bool {
        self.provider.is_loaded()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configured_mobs(&self) -> &[String] {
        &self.mobs
    }
}

/// Which spawner backend the host should build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpawnerSelection {
    Vanilla,
    External { provider: String },
}

impl Default for SpawnerSelection {
    fn default() -> Self {
        SpawnerSelection::Vanilla
    }
}

/// Routes reinforcement requests to the configured spawner.
pub struct ReinforcementDispatcher {
    spawner: Arc<dyn MobSpawner>,
}

impl ReinforcementDispatcher {
    pub fn new(spawner: Arc<dyn MobSpawner>) -> Self {
        Self { spawner }
    }

    pub fn spawner_name(&self) -> &str {
        self.spawner.name()
    }

    /// Picks the mob for the `sequence`-th reinforcement of a session.
    ///
    /// Rotates through the point's list, falling back to the spawner's own.
    pub fn pick_mob(&self, point: &CapturePoint, sequence: u32) -> Option<String> {
        let pool: &[String] = if point.reinforcement_mobs.is_empty() {
            self.spawner.configured_mobs()
        } else {
            &point.reinforcement_mobs
        };
        if pool.is_empty() {
            return None;
        }
        Some(pool[sequence as usize % pool.len()].clone())
    }

    /// Requests one reinforcement at `point` aimed at `target`.
    pub fn reinforce(&self, point: &CapturePoint, target: &PlayerId, sequence: u32) -> Option<EntityHandle> {
        if !self.spawner.is_available() {
            warn!(
                "👹 Spawner '{}' unavailable; skipping reinforcement at '{}'",
                self.spawner.name(),
                point.id
            );
            return None;
        }

        let Some(mob) = self.pick_mob(point, sequence) else {
            debug!("👹 No reinforcement mobs configured for '{}'", point.id);
            return None;
        };

        let request = SpawnRequest {
            point_id: point.id.clone(),
            location: point.location(),
            target: target.clone(),
            mob,
        };
        match self.spawner.spawn(&request) {
            Some(handle) => {
                debug!(
                    "👹 Spawned {} ({}) at '{}' targeting {}",
                    request.mob, handle, point.id, target
                );
                Some(handle)
            }
            None => {
                warn!(
                    "👹 Spawner '{}' failed to spawn {} at '{}'",
                    self.spawner.name(),
                    request.mob,
                    point.id
                );
                None
            }
        }
    }
}
