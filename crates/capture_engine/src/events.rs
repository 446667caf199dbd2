//! # World Event Feed
//!
//! Events the host delivers to the engine, one at a time and in arrival order.
//!
//! Every externally supplied field that a host might fail to provide is an
//! `Option`. Handlers treat a missing field as "nothing to do" and discard the
//! event instead of failing.
//!
//! ## Wire form
//!
//! Events are internally tagged JSON objects:
//!
//! ```json
//! { "type": "block_change", "actor": "alice", "action": "break",
//!   "world": "overworld", "position": { "x": 10.0, "y": 64.0, "z": -3.0 } }
//! { "type": "periodic_tick", "now": "2024-01-15T10:30:45Z" }
//! { "type": "day_rollover" }
//! ```

use crate::protection::BlockAction;
use crate::types::{Location, PlayerId, Position, WorldId};
use crate::zone::CapturePoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    BlockChange(BlockChangeEvent),
    CommandAttempt(CommandAttemptEvent),
    EntityDeath(EntityDeathEvent),
    PlayerDeath(PlayerDeathEvent),
    PlayerMove(PlayerMoveEvent),
    PlayerQuit(PlayerQuitEvent),
    CaptureAttempt(CaptureRequestEvent),
    CaptureComplete(CaptureRequestEvent),
    AdminCancel(CaptureRequestEvent),
    ReloadPoints(ReloadPointsEvent),
    PeriodicTick(PeriodicTickEvent),
    DayRollover,
}

impl WorldEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorldEvent::BlockChange(_) => "block_change",
            WorldEvent::CommandAttempt(_) => "command_attempt",
            WorldEvent::EntityDeath(_) => "entity_death",
            WorldEvent::PlayerDeath(_) => "player_death",
            WorldEvent::PlayerMove(_) => "player_move",
            WorldEvent::PlayerQuit(_) => "player_quit",
            WorldEvent::CaptureAttempt(_) => "capture_attempt",
            WorldEvent::CaptureComplete(_) => "capture_complete",
            WorldEvent::AdminCancel(_) => "admin_cancel",
            WorldEvent::ReloadPoints(_) => "reload_points",
            WorldEvent::PeriodicTick(_) => "periodic_tick",
            WorldEvent::DayRollover => "day_rollover",
        }
    }
}

/// A block is about to be broken or placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockChangeEvent {
    pub actor: Option<PlayerId>,
    #[serde(default)]
    pub privileged: bool,
    pub action: BlockAction,
    pub world: Option<WorldId>,
    pub position: Option<Position>,
}

impl BlockChangeEvent {
    pub fn location(&self) -> Option<Location> {
        Location::from_parts(self.world.clone(), self.position)
    }
}

/// A player is about to run a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAttemptEvent {
    pub actor: Option<PlayerId>,
    #[serde(default)]
    pub privileged: bool,
    pub command: Option<String>,
    pub world: Option<WorldId>,
    pub position: Option<Position>,
}

impl CommandAttemptEvent {
    pub fn location(&self) -> Option<Location> {
        Location::from_parts(self.world.clone(), self.position)
    }
}

/// Any entity died.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDeathEvent {
    pub victim: Option<String>,
    #[serde(default)]
    pub victim_is_player: bool,
    pub killer: Option<String>,
    #[serde(default)]
    pub killer_is_player: bool,
    pub world: Option<WorldId>,
    pub position: Option<Position>,
}

impl EntityDeathEvent {
    pub fn location(&self) -> Option<Location> {
        Location::from_parts(self.world.clone(), self.position)
    }
}

/// A player died; used only for session cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDeathEvent {
    pub player: Option<PlayerId>,
}

/// A player's position changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoveEvent {
    pub player: Option<PlayerId>,
    pub world: Option<WorldId>,
    pub position: Option<Position>,
}

impl PlayerMoveEvent {
    pub fn location(&self) -> Option<Location> {
        Location::from_parts(self.world.clone(), self.position)
    }
}

/// A player left the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerQuitEvent {
    pub player: Option<PlayerId>,
}

/// Capture start, external completion, or administrative cancellation for one
/// `(point, player)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequestEvent {
    pub player: Option<PlayerId>,
    pub point_id: Option<String>,
}

/// Administrative replacement of the whole capture point set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadPointsEvent {
    pub points: Vec<CapturePoint>,
    /// New global blocked-command list; unchanged when absent
    pub blocked_commands: Option<Vec<String>>,
}

/// Periodic heartbeat driving session re-validation and reinforcements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicTickEvent {
    pub now: DateTime<Utc>,
}
