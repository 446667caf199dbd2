//! # Capture Engine - Zone Protection and Capture Sessions
//!
//! Host-agnostic engine for contested capture points in a block-based world.
//! The engine never performs I/O: the host delivers [`WorldEvent`]s one at a
//! time and supplies every side effect through small collaborator traits.
//!
//! ## Responsibilities
//!
//! * **Zone membership** - Capture and buffer rings around each point, measured
//!   in horizontal chunk distance
//! * **Capture sessions** - One active attempt per `(point, player)`, cancelled
//!   on death, zone exit, disconnect or administrative override
//! * **Protection** - Block and command restrictions near points
//! * **Reinforcements** - Best-effort mob spawning through a pluggable spawner
//! * **Combat statistics** - Kills attributed to the zone they happened in
//!
//! ## Example
//!
//! ```rust
//! use capture_engine::{CapturePoint, Location, Position, ZoneClass, ZoneIndex};
//!
//! let hill = CapturePoint::new("HillA", "overworld", Position::new(0.0, 64.0, 0.0), 2);
//! let zones = ZoneIndex::new(vec![hill]).unwrap();
//!
//! let found = zones.find_containing(&Location::new("overworld", 24.0, 70.0, 0.0)).unwrap();
//! assert_eq!(found.point.id, "HillA");
//! assert_eq!(found.membership.class, ZoneClass::InsideCapture);
//! ```
//!
//! ## Concurrency
//!
//! [`CaptureEngine`] is driven by a single task. The only state shared with
//! other tasks is the [`ZoneIndex`] (swapped atomically on reload) and the
//! [`ZoneStatistics`] sink (concurrent map).

pub use deferred::{DeferredQueue, DeferredTask};
pub use engine::{
    CaptureEngine, Collaborators, DayCycleHandler, EngineSettings, EngineStats, EventOutcome, PlayerTracker,
};
pub use error::{CaptureError, ConfigError};
pub use events::*;
pub use messages::{render, Colorizer, LegacyColorizer, MessageTemplates, Notifier, PlainColorizer};
pub use protection::{
    normalize_command, ActionRequest, BlockAction, DenyReason, GateDecision, GuardedAction, ProtectionGate,
    CLAIM_COMMAND_PREFIXES,
};
pub use reinforcement::{
    ExternalMobProvider, ExternalSpawner, MobSpawner, ReinforcementDispatcher, SpawnRequest, SpawnerSelection,
    VanillaSpawner, WorldSpawnApi,
};
pub use session::{
    CancelReason, CaptureOutcome, CaptureSession, CaptureSessionManager, PlayerLocator, SessionKey, SessionState,
    TickReport,
};
pub use statistics::{
    Combatant, KillKind, KillRecord, StatisticsAggregator, StatisticsSink, ZonePlayerStats, ZoneStatistics,
};
pub use types::{EntityHandle, Location, PlayerId, Position, WorldId, CHUNK_SIZE};
pub use zone::{validate_points, CapturePoint, ZoneClass, ZoneIndex, ZoneMatch, ZoneMembership};

pub mod deferred;
pub mod engine;
pub mod error;
pub mod events;
pub mod messages;
pub mod protection;
pub mod reinforcement;
pub mod session;
pub mod statistics;
pub mod types;
pub mod zone;
