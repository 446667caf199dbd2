//! # Capture Engine
//!
//! Composition root and handler entry points. The host owns one
//! `CaptureEngine` and feeds it [`WorldEvent`]s strictly one after another;
//! the engine never polls and never blocks.
//!
//! ## Dispatch
//!
//! | Event | Component |
//! |-------|-----------|
//! | `BlockChange`, `CommandAttempt` | [`ProtectionGate`] |
//! | `EntityDeath` | [`StatisticsAggregator`] |
//! | `PlayerDeath`, `PlayerQuit`, `CaptureAttempt`, `CaptureComplete`, `AdminCancel` | [`CaptureSessionManager`] |
//! | `PeriodicTick` | deferred tasks, then session re-validation, then [`ReinforcementDispatcher`] |
//! | `DayRollover` | forwarded to the [`DayCycleHandler`] |
//!
//! Every collaborator is injected at construction; nothing is looked up
//! globally.

use crate::deferred::{DeferredQueue, DeferredTask};
use crate::error::CaptureError;
use crate::events::*;
use crate::messages::{render, Colorizer, MessageTemplates, Notifier};
use crate::protection::{ActionRequest, GateDecision, GuardedAction, ProtectionGate};
use crate::reinforcement::{MobSpawner, ReinforcementDispatcher};
use crate::session::{CancelReason, CaptureOutcome, CaptureSessionManager, PlayerLocator};
use crate::statistics::{Combatant, StatisticsAggregator, StatisticsSink};
use crate::types::{Location, PlayerId};
use crate::zone::{ZoneClass, ZoneIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn default_zone_notice_delay() -> u64 {
    1
}

/// Engine-wide settings that are not tied to a single capture point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Command prefixes refused near every capture point
    #[serde(default)]
    pub blocked_commands: Vec<String>,
    /// Player-facing message templates
    #[serde(default)]
    pub messages: MessageTemplates,
    /// Ticks between entering a ring and the entry notice
    #[serde(default = "default_zone_notice_delay")]
    pub zone_notice_delay: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            blocked_commands: Vec::new(),
            messages: MessageTemplates::default(),
            zone_notice_delay: default_zone_notice_delay(),
        }
    }
}

/// Receives day rollovers. The engine itself does nothing with them.
pub trait DayCycleHandler: Send + Sync {
    fn on_day_rollover(&self);
}

/// Host-provided collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub colorizer: Arc<dyn Colorizer>,
    pub outcome: Arc<dyn CaptureOutcome>,
    pub statistics: Arc<dyn StatisticsSink>,
    pub spawner: Arc<dyn MobSpawner>,
    pub day_cycle: Arc<dyn DayCycleHandler>,
}

/// What the host should do with the event it just delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Let the action go ahead
    Proceed,
    /// Cancel the action in the host
    Cancel,
    /// The event was incomplete or irrelevant and was discarded
    Ignored,
}

/// Counters for monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub events_handled: u64,
    pub events_cancelled: u64,
    pub events_ignored: u64,
    pub ticks: u64,
    pub captures_started: u64,
    pub reinforcements_spawned: u64,
    /// Sessions active when the snapshot was taken
    pub active_sessions: usize,
    /// Players with a known location when the snapshot was taken
    pub tracked_players: usize,
}

/// Last known location of every online player.
#[derive(Debug, Default)]
pub struct PlayerTracker {
    locations: HashMap<PlayerId, Location>,
}

impl PlayerTracker {
    /// Stores the new location and returns the previous one.
    pub fn update(&mut self, player: &PlayerId, location: Location) -> Option<Location> {
        self.locations.insert(player.clone(), location)
    }

    pub fn remove(&mut self, player: &PlayerId) -> Option<Location> {
        self.locations.remove(player)
    }

    pub fn online(&self) -> usize {
        self.locations.len()
    }
}

impl PlayerLocator for PlayerTracker {
    fn locate(&self, player: &PlayerId) -> Option<Location> {
        self.locations.get(player).cloned()
    }
}

/// The capture zone engine.
pub struct CaptureEngine {
    zones: Arc<ZoneIndex>,
    sessions: CaptureSessionManager,
    gate: ProtectionGate,
    reinforcements: ReinforcementDispatcher,
    statistics: StatisticsAggregator,
    deferred: DeferredQueue,
    players: PlayerTracker,
    notifier: Arc<dyn Notifier>,
    colorizer: Arc<dyn Colorizer>,
    day_cycle: Arc<dyn DayCycleHandler>,
    messages: MessageTemplates,
    notice_delay: u64,
    clock: DateTime<Utc>,
    tick: u64,
    stats: EngineStats,
}

impl CaptureEngine {
    /// Wires every component around a shared zone index.
    ///
    /// `started_at` seeds the engine clock until the first periodic tick.
    pub fn new(
        zones: Arc<ZoneIndex>,
        settings: EngineSettings,
        collaborators: Collaborators,
        started_at: DateTime<Utc>,
    ) -> Self {
        let gate = ProtectionGate::new(
            Arc::clone(&zones),
            settings.blocked_commands.clone(),
            settings.messages.clone(),
            Arc::clone(&collaborators.colorizer),
        );

        info!(
            "🎯 Capture engine ready: {} point(s), spawner '{}'",
            zones.len(),
            collaborators.spawner.name()
        );

        Self {
            sessions: CaptureSessionManager::new(Arc::clone(&zones), collaborators.outcome),
            statistics: StatisticsAggregator::new(Arc::clone(&zones), collaborators.statistics),
            reinforcements: ReinforcementDispatcher::new(collaborators.spawner),
            gate,
            zones,
            deferred: DeferredQueue::new(),
            players: PlayerTracker::default(),
            notifier: collaborators.notifier,
            colorizer: collaborators.colorizer,
            day_cycle: collaborators.day_cycle,
            messages: settings.messages,
            notice_delay: settings.zone_notice_delay,
            clock: started_at,
            tick: 0,
            stats: EngineStats::default(),
        }
    }

    /// Handles one event from the world feed.
    pub fn handle(&mut self, event: WorldEvent) -> EventOutcome {
        let kind = event.kind();
        self.stats.events_handled += 1;

        let outcome = match event {
            WorldEvent::BlockChange(e) => self.on_block_change(e),
            WorldEvent::CommandAttempt(e) => self.on_command_attempt(e),
            WorldEvent::EntityDeath(e) => self.on_entity_death(e),
            WorldEvent::PlayerDeath(e) => self.on_player_death(e),
            WorldEvent::PlayerMove(e) => self.on_player_move(e),
            WorldEvent::PlayerQuit(e) => self.on_player_quit(e),
            WorldEvent::CaptureAttempt(e) => self.on_capture_attempt(e),
            WorldEvent::CaptureComplete(e) => self.on_capture_complete(e),
            WorldEvent::AdminCancel(e) => self.on_admin_cancel(e),
            WorldEvent::ReloadPoints(e) => self.on_reload(e),
            WorldEvent::PeriodicTick(e) => self.on_tick(e.now),
            WorldEvent::DayRollover => {
                self.day_cycle.on_day_rollover();
                EventOutcome::Proceed
            }
        };

        match outcome {
            EventOutcome::Cancel => self.stats.events_cancelled += 1,
            EventOutcome::Ignored => {
                self.stats.events_ignored += 1;
                debug!("Discarded {} event", kind);
            }
            EventOutcome::Proceed => {}
        }
        outcome
    }

    /// Starts a capture if the start condition holds: the point exists and the
    /// player's last known location is inside its capture ring.
    pub fn begin_capture(&mut self, point_id: &str, player: &PlayerId) -> Result<(), CaptureError> {
        let point = self
            .zones
            .get(point_id)
            .ok_or_else(|| CaptureError::UnknownPoint(point_id.to_string()))?;

        let inside = self
            .players
            .locate(player)
            .map(|location| point.classify(&location).class == ZoneClass::InsideCapture)
            .unwrap_or(false);
        if !inside {
            return Err(CaptureError::NotInCaptureZone {
                point: point_id.to_string(),
                player: player.clone(),
            });
        }

        self.sessions.start_session(point_id, player, self.clock)?;
        self.stats.captures_started += 1;
        self.send(player, &point.templates(&self.messages).capture_started, &point.id);
        Ok(())
    }

    pub fn sessions(&self) -> &CaptureSessionManager {
        &self.sessions
    }

    pub fn zones(&self) -> &Arc<ZoneIndex> {
        &self.zones
    }

    pub fn players(&self) -> &PlayerTracker {
        &self.players
    }

    /// Counter snapshot including current session and player totals.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            active_sessions: self.sessions.active_count(),
            tracked_players: self.players.online(),
            ..self.stats
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn clock(&self) -> DateTime<Utc> {
        self.clock
    }

    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    fn on_block_change(&mut self, event: BlockChangeEvent) -> EventOutcome {
        let (Some(actor), Some(location)) = (event.actor.as_ref(), event.location()) else {
            return EventOutcome::Ignored;
        };
        self.guard(actor, event.privileged, &location, GuardedAction::Block(event.action))
    }

    fn on_command_attempt(&mut self, event: CommandAttemptEvent) -> EventOutcome {
        let (Some(actor), Some(command), Some(location)) =
            (event.actor.as_ref(), event.command.as_deref(), event.location())
        else {
            return EventOutcome::Ignored;
        };
        self.players.update(actor, location.clone());
        self.guard(actor, event.privileged, &location, GuardedAction::Command(command))
    }

    fn guard(
        &self,
        actor: &PlayerId,
        privileged: bool,
        location: &Location,
        action: GuardedAction<'_>,
    ) -> EventOutcome {
        let request = ActionRequest {
            actor,
            privileged,
            location,
            action,
        };
        match self.gate.evaluate(&request) {
            GateDecision::Allow => EventOutcome::Proceed,
            GateDecision::Deny { message, .. } => {
                self.notifier.notify(actor, &message);
                EventOutcome::Cancel
            }
        }
    }

    fn on_entity_death(&mut self, event: EntityDeathEvent) -> EventOutcome {
        let location = event.location();
        let (Some(victim), Some(location)) = (event.victim, location) else {
            return EventOutcome::Ignored;
        };

        let victim = Combatant {
            id: victim,
            is_player: event.victim_is_player,
        };
        let killer = event.killer.map(|id| Combatant {
            id,
            is_player: event.killer_is_player,
        });

        self.statistics
            .on_kill(&victim, killer.as_ref(), &location, self.clock);
        EventOutcome::Proceed
    }

    fn on_player_death(&mut self, event: PlayerDeathEvent) -> EventOutcome {
        let Some(player) = event.player else {
            return EventOutcome::Ignored;
        };
        self.sessions.on_player_death(&player);
        EventOutcome::Proceed
    }

    fn on_player_move(&mut self, event: PlayerMoveEvent) -> EventOutcome {
        let location = event.location();
        let (Some(player), Some(location)) = (event.player, location) else {
            return EventOutcome::Ignored;
        };

        let previous = self
            .players
            .update(&player, location.clone())
            .and_then(|old| self.zones.find_containing(&old))
            .map(|found| (found.point.id.clone(), found.membership.class));

        if let Some(found) = self.zones.find_containing(&location) {
            let current = (found.point.id.clone(), found.membership.class);
            if previous.as_ref() != Some(&current) {
                let task = DeferredTask::ZoneNotice {
                    player,
                    point_id: current.0,
                    class: current.1,
                };
                if !self.deferred.contains(&task) {
                    self.deferred.schedule(self.tick, self.notice_delay, task);
                }
            }
        }
        EventOutcome::Proceed
    }

    fn on_player_quit(&mut self, event: PlayerQuitEvent) -> EventOutcome {
        let Some(player) = event.player else {
            return EventOutcome::Ignored;
        };
        self.players.remove(&player);
        self.sessions
            .cancel_player_sessions(&player, CancelReason::Disconnect);
        EventOutcome::Proceed
    }

    fn on_capture_attempt(&mut self, event: CaptureRequestEvent) -> EventOutcome {
        let (Some(player), Some(point_id)) = (event.player, event.point_id) else {
            return EventOutcome::Ignored;
        };
        match self.begin_capture(&point_id, &player) {
            Ok(()) => EventOutcome::Proceed,
            Err(e) => {
                debug!("Capture attempt rejected: {}", e);
                EventOutcome::Ignored
            }
        }
    }

    fn on_capture_complete(&mut self, event: CaptureRequestEvent) -> EventOutcome {
        let (Some(player), Some(point_id)) = (event.player, event.point_id) else {
            return EventOutcome::Ignored;
        };
        match self.sessions.complete_session(&point_id, &player, self.clock) {
            Ok(_) => EventOutcome::Proceed,
            Err(e) => {
                debug!("Capture completion rejected: {}", e);
                EventOutcome::Ignored
            }
        }
    }

    fn on_admin_cancel(&mut self, event: CaptureRequestEvent) -> EventOutcome {
        let (Some(player), Some(point_id)) = (event.player, event.point_id) else {
            return EventOutcome::Ignored;
        };
        self.sessions
            .cancel_session(&point_id, &player, CancelReason::AdminOverride);
        EventOutcome::Proceed
    }

    fn on_reload(&mut self, event: ReloadPointsEvent) -> EventOutcome {
        if let Err(e) = self.zones.reload(event.points) {
            warn!("⚠️ Capture point reload rejected, keeping current set: {}", e);
            return EventOutcome::Ignored;
        }
        if let Some(commands) = event.blocked_commands {
            self.gate.set_global_blocked(commands);
        }
        EventOutcome::Proceed
    }

    fn on_tick(&mut self, now: DateTime<Utc>) -> EventOutcome {
        self.clock = now;
        self.tick += 1;
        self.stats.ticks += 1;

        for task in self.deferred.drain_due(self.tick) {
            self.run_deferred(task);
        }

        let report = self.sessions.tick(now, &self.players);

        for key in report.reinforcements_due {
            let Some(point) = self.zones.get(&key.point_id) else {
                continue;
            };
            let Some(sequence) = self
                .sessions
                .get(&key.point_id, &key.player_id)
                .map(|session| session.reinforcements)
            else {
                continue;
            };
            if self
                .reinforcements
                .reinforce(&point, &key.player_id, sequence)
                .is_some()
            {
                self.sessions.record_reinforcement(&key);
                self.stats.reinforcements_spawned += 1;
            }
        }
        EventOutcome::Proceed
    }

    fn run_deferred(&self, task: DeferredTask) {
        match task {
            DeferredTask::ZoneNotice {
                player,
                point_id,
                class,
            } => {
                let Some(location) = self.players.locate(&player) else {
                    return;
                };
                let Some(found) = self
                    .zones
                    .find_containing(&location)
                    .filter(|found| found.point.id == point_id && found.membership.class == class)
                else {
                    debug!("Zone notice for {} at '{}' dropped: no longer applicable", player, point_id);
                    return;
                };

                let templates = found.point.templates(&self.messages);
                let template = match class {
                    ZoneClass::InsideCapture => &templates.entered_capture,
                    _ => &templates.entered_buffer,
                };
                self.send(&player, template, &point_id);
            }
        }
    }

    fn send(&self, player: &PlayerId, template: &str, point_id: &str) {
        let message = self.colorizer.colorize(&render(template, point_id, None));
        self.notifier.notify(player, &message);
    }
}
