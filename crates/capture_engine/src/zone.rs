//! # Capture Zone Index
//!
//! Holds the configured capture points and answers zone-membership queries.
//!
//! Each point owns two concentric horizontal rings measured in chunks:
//!
//! ```text
//!   distance <= capture_radius                     -> InsideCapture
//!   capture_radius < distance <= capture_radius+1  -> InsideBuffer
//!   otherwise (or another world)                   -> Outside
//! ```
//!
//! Lookups across points are first-match in configuration order. When rings
//! overlap the earlier point wins, never the closest one.
//!
//! The point set is read-mostly. A reload swaps the whole set in one store so
//! readers see either the old set or the new one.

use crate::error::ConfigError;
use crate::messages::MessageTemplates;
use crate::types::{Location, Position, WorldId};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Static definition of a contested point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturePoint {
    /// Unique identifier
    pub id: String,
    /// World the point lives in
    pub world: WorldId,
    /// Centre of the point in block coordinates
    pub position: Position,
    /// Radius of the capture zone, in chunks
    pub capture_radius: u32,
    /// Command prefixes refused inside the capture and buffer zones
    #[serde(default)]
    pub blocked_commands: Vec<String>,
    /// Mob identifiers used for reinforcements, in rotation order
    #[serde(default)]
    pub reinforcement_mobs: Vec<String>,
    /// Ticks of uninterrupted presence needed to finish a capture (0 = external completion only)
    #[serde(default)]
    pub capture_ticks: u32,
    /// Ticks between reinforcement requests (0 = no reinforcements)
    #[serde(default)]
    pub reinforcement_interval: u32,
    /// Upper bound on reinforcements spawned for a single session
    #[serde(default)]
    pub max_reinforcements: u32,
    /// Message templates for this point; the engine-wide table when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<MessageTemplates>,
}

impl CapturePoint {
    /// Creates a point with no command rules, reinforcements or auto-completion.
    pub fn new(id: impl Into<String>, world: impl Into<WorldId>, position: Position, capture_radius: u32) -> Self {
        Self {
            id: id.into(),
            world: world.into(),
            position,
            capture_radius,
            blocked_commands: Vec::new(),
            reinforcement_mobs: Vec::new(),
            capture_ticks: 0,
            reinforcement_interval: 0,
            max_reinforcements: 0,
            messages: None,
        }
    }

    /// This point's templates, falling back to `defaults`.
    pub fn templates<'a>(&'a self, defaults: &'a MessageTemplates) -> &'a MessageTemplates {
        self.messages.as_ref().unwrap_or(defaults)
    }

    /// One chunk ring beyond the capture zone.
    ///
    /// Widened so that `u32::MAX` still has a ring.
    pub fn buffer_radius(&self) -> u64 {
        u64::from(self.capture_radius) + 1
    }

    pub fn location(&self) -> Location {
        Location {
            world: self.world.clone(),
            position: self.position,
        }
    }

    /// Classifies `location` against this point.
    ///
    /// World identity is checked first; a location in another world is
    /// `Outside` without computing any distance.
    pub fn classify(&self, location: &Location) -> ZoneMembership {
        if location.world != self.world {
            return ZoneMembership::outside();
        }

        let distance = self.position.chunk_distance(location.position);
        let class = if distance <= f64::from(self.capture_radius) {
            ZoneClass::InsideCapture
        } else if distance <= self.buffer_radius() as f64 {
            ZoneClass::InsideBuffer
        } else {
            ZoneClass::Outside
        };

        ZoneMembership {
            class,
            distance: Some(distance),
        }
    }
}

/// Which ring of a point a location falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneClass {
    InsideCapture,
    InsideBuffer,
    Outside,
}

/// Result of classifying one location against one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneMembership {
    pub class: ZoneClass,
    /// Chunk distance used for the classification; `None` when the worlds differ
    pub distance: Option<f64>,
}

impl ZoneMembership {
    fn outside() -> Self {
        Self {
            class: ZoneClass::Outside,
            distance: None,
        }
    }

    pub fn is_inside(&self) -> bool {
        self.class != ZoneClass::Outside
    }
}

/// A point together with the membership that matched it.
#[derive(Debug, Clone)]
pub struct ZoneMatch {
    pub point: Arc<CapturePoint>,
    pub membership: ZoneMembership,
}

/// Validates a candidate point set before it may be installed.
pub fn validate_points(points: &[CapturePoint]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for point in points {
        if point.id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        if point.world.0.trim().is_empty() {
            return Err(ConfigError::EmptyWorld(point.id.clone()));
        }
        if !seen.insert(point.id.as_str()) {
            return Err(ConfigError::DuplicatePoint(point.id.clone()));
        }
    }
    Ok(())
}

/// Read-mostly registry of capture points in configuration order.
#[derive(Debug)]
pub struct ZoneIndex {
    points: ArcSwap<Vec<Arc<CapturePoint>>>,
}

impl ZoneIndex {
    /// Builds an index from a validated point set.
    pub fn new(points: Vec<CapturePoint>) -> Result<Self, ConfigError> {
        validate_points(&points)?;
        Ok(Self {
            points: ArcSwap::from_pointee(points.into_iter().map(Arc::new).collect()),
        })
    }

    pub fn empty() -> Self {
        Self {
            points: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Replaces the whole point set in a single store.
    ///
    /// An invalid set is rejected and the current set stays in place.
    pub fn reload(&self, points: Vec<CapturePoint>) -> Result<(), ConfigError> {
        validate_points(&points)?;
        let count = points.len();
        self.points
            .store(Arc::new(points.into_iter().map(Arc::new).collect()));
        info!("🗺️ Capture points reloaded: {} point(s) active", count);
        Ok(())
    }

    /// Consistent view of the current point set.
    pub fn snapshot(&self) -> Arc<Vec<Arc<CapturePoint>>> {
        self.points.load_full()
    }

    pub fn len(&self) -> usize {
        self.points.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.load().is_empty()
    }

    pub fn get(&self, point_id: &str) -> Option<Arc<CapturePoint>> {
        self.points
            .load()
            .iter()
            .find(|point| point.id == point_id)
            .cloned()
    }

    /// Classifies `location` against `point`.
    pub fn classify(&self, point: &CapturePoint, location: &Location) -> ZoneMembership {
        point.classify(location)
    }

    /// Returns the first configured point whose capture or buffer ring contains
    /// `location`.
    pub fn find_containing(&self, location: &Location) -> Option<ZoneMatch> {
        self.points.load().iter().find_map(|point| {
            let membership = point.classify(location);
            membership.is_inside().then(|| ZoneMatch {
                point: Arc::clone(point),
                membership,
            })
        })
    }
}

impl Default for ZoneIndex {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hill(radius: u32) -> CapturePoint {
        CapturePoint::new("HillA", "W", Position::new(0.0, 0.0, 0.0), radius)
    }

    /// Location `chunks` chunks east of the origin.
    fn east(world: &str, chunks: f64) -> Location {
        Location::new(world, chunks * 16.0, 64.0, 0.0)
    }

    #[test]
    fn buffer_radius_is_one_ring_beyond_capture() {
        assert_eq!(hill(0).buffer_radius(), 1);
        assert_eq!(hill(4).buffer_radius(), 5);
    }

    #[test]
    fn largest_radius_classifies_far_locations_without_overflow() {
        let point = hill(u32::MAX);
        assert_eq!(point.buffer_radius(), u64::from(u32::MAX) + 1);

        let index = ZoneIndex::new(vec![point]).unwrap();
        let found = index.find_containing(&Location::new("W", 1e12, 64.0, 0.0));
        assert!(found.is_none());

        let membership = index.get("HillA").unwrap().classify(&east("W", 1e3));
        assert_eq!(membership.class, ZoneClass::InsideCapture);
    }

    #[test]
    fn classify_rings_at_their_boundaries() {
        let point = hill(2);

        assert_eq!(point.classify(&east("W", 0.0)).class, ZoneClass::InsideCapture);
        assert_eq!(point.classify(&east("W", 2.0)).class, ZoneClass::InsideCapture);
        assert_eq!(point.classify(&east("W", 2.01)).class, ZoneClass::InsideBuffer);
        assert_eq!(point.classify(&east("W", 3.0)).class, ZoneClass::InsideBuffer);
        assert_eq!(point.classify(&east("W", 3.01)).class, ZoneClass::Outside);
    }

    #[test]
    fn classify_reports_distance_used() {
        let membership = hill(2).classify(&Location::new("W", 48.0, 0.0, 64.0));
        assert_eq!(membership.distance, Some(5.0));
        assert_eq!(membership.class, ZoneClass::Outside);
    }

    #[test]
    fn zero_radius_point_still_has_a_buffer_ring() {
        let point = hill(0);
        assert_eq!(point.classify(&east("W", 0.0)).class, ZoneClass::InsideCapture);
        assert_eq!(point.classify(&east("W", 0.5)).class, ZoneClass::InsideBuffer);
    }

    #[test]
    fn other_world_is_always_outside() {
        let membership = hill(50).classify(&east("Nether", 0.0));
        assert_eq!(membership.class, ZoneClass::Outside);
        assert!(membership.distance.is_none());
    }

    #[test]
    fn find_containing_prefers_earlier_point_on_overlap() {
        let a = CapturePoint::new("A", "W", Position::new(0.0, 0.0, 0.0), 3);
        let b = CapturePoint::new("B", "W", Position::new(32.0, 0.0, 0.0), 3);
        let index = ZoneIndex::new(vec![a, b]).unwrap();

        // Two chunks from B's centre, closer to B than to A, yet A is configured first.
        let found = index.find_containing(&east("W", 2.0)).unwrap();
        assert_eq!(found.point.id, "A");
    }

    #[test]
    fn find_containing_returns_none_outside_every_ring() {
        let index = ZoneIndex::new(vec![hill(2)]).unwrap();
        assert!(index.find_containing(&east("W", 10.0)).is_none());
        assert!(index.find_containing(&east("Other", 0.0)).is_none());
    }

    #[test]
    fn reload_swaps_whole_set() {
        let index = ZoneIndex::new(vec![hill(2)]).unwrap();
        let before = index.snapshot();

        let replacement = CapturePoint::new("Fort", "W", Position::new(160.0, 0.0, 0.0), 1);
        index.reload(vec![replacement]).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].id, "HillA");
        assert!(index.get("HillA").is_none());
        assert!(index.get("Fort").is_some());
    }

    #[test]
    fn reload_rejects_invalid_set_and_keeps_current() {
        let index = ZoneIndex::new(vec![hill(2)]).unwrap();

        let result = index.reload(vec![hill(1), hill(3)]);
        assert_eq!(result, Err(ConfigError::DuplicatePoint("HillA".to_string())));
        assert_eq!(index.get("HillA").unwrap().capture_radius, 2);
    }

    #[test]
    fn validation_rejects_empty_identifiers() {
        let mut nameless = hill(1);
        nameless.id = " ".to_string();
        assert_eq!(validate_points(&[nameless]), Err(ConfigError::EmptyId));

        let mut worldless = hill(1);
        worldless.world = WorldId::from("");
        assert_eq!(
            validate_points(&[worldless]),
            Err(ConfigError::EmptyWorld("HillA".to_string()))
        );
    }
}
