//! # Core Type Definitions
//!
//! Identity and location types shared by every engine component.
//!
//! ## Key Types
//!
//! - [`PlayerId`] - Stable identity of a player
//! - [`WorldId`] - Opaque world identifier, compared by equality only
//! - [`Position`] - Block-space coordinate with double precision
//! - [`Location`] - A position bound to a world
//!
//! The vertical axis is `y`. Zone geometry only ever looks at `x` and `z`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// World units per chunk along each horizontal axis.
pub const CHUNK_SIZE: f64 = 16.0;

/// Stable identity of a player.
///
/// Hosts hand players over as strings (names or UUID text); the engine never
/// interprets the contents.
///
/// # Examples
///
/// ```rust
/// use capture_engine::PlayerId;
///
/// let alice = PlayerId::from("alice");
/// assert_eq!(alice.to_string(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque world identifier.
///
/// Two locations are only ever compared geometrically when their worlds are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub String);

impl From<&str> for WorldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle of an entity spawned on behalf of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle(pub Uuid);

impl EntityHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 3D coordinate in world (block) units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate (east-west)
    pub x: f64,
    /// Y coordinate (vertical, ignored by zone geometry)
    pub y: f64,
    /// Z coordinate (north-south)
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Horizontal Euclidean distance to `other`, measured in chunks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use capture_engine::Position;
    ///
    /// let a = Position::new(0.0, 64.0, 0.0);
    /// let b = Position::new(48.0, 10.0, 64.0);
    /// assert_eq!(a.chunk_distance(b), 5.0);
    /// ```
    pub fn chunk_distance(&self, other: Position) -> f64 {
        let dx = (self.x - other.x) / CHUNK_SIZE;
        let dz = (self.z - other.z) / CHUNK_SIZE;
        (dx * dx + dz * dz).sqrt()
    }
}

/// A position inside a specific world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub position: Position,
}

impl Location {
    pub fn new(world: impl Into<WorldId>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            position: Position::new(x, y, z),
        }
    }

    /// Assembles a location from the optional parts carried by an event.
    ///
    /// Returns `None` when either part is missing.
    pub fn from_parts(world: Option<WorldId>, position: Option<Position>) -> Option<Self> {
        Some(Self {
            world: world?,
            position: position?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_distance_ignores_vertical_axis() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(0.0, 250.0, 0.0);
        assert_eq!(a.chunk_distance(b), 0.0);
    }

    #[test]
    fn chunk_distance_is_symmetric() {
        let a = Position::new(-40.0, 70.0, 12.0);
        let b = Position::new(24.0, 3.0, -52.0);
        assert_eq!(a.chunk_distance(b), b.chunk_distance(a));
    }

    #[test]
    fn location_requires_both_parts() {
        let world = Some(WorldId::from("overworld"));
        let pos = Some(Position::new(1.0, 2.0, 3.0));

        assert!(Location::from_parts(world.clone(), pos).is_some());
        assert!(Location::from_parts(None, pos).is_none());
        assert!(Location::from_parts(world, None).is_none());
    }
}
