//! Shared Domain Types
//!
//! Identifiers and small enums used across movement, streaming and the
//! coordinator.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;

// =============================================================================
// ENTITY ID
// =============================================================================

/// Opaque handle to a spawned entity.
///
/// Handles are issued from a monotonic counter and never reused within a
/// world, so a stale handle simply stops resolving after destruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Raw counter value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

// =============================================================================
// DIRECTION
// =============================================================================

/// Cardinal direction the player can face and step in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Direction {
    /// Forward along the corridor (+Y)
    #[default]
    Up,
    /// Back along the corridor (-Y)
    Down,
    /// Across the lane (-X)
    Left,
    /// Across the lane (+X)
    Right,
}

impl Direction {
    /// Unit vector for one cell in this direction.
    pub fn unit(self) -> FixedVec2 {
        match self {
            Direction::Up => FixedVec2::UP,
            Direction::Down => FixedVec2::DOWN,
            Direction::Left => FixedVec2::LEFT,
            Direction::Right => FixedVec2::RIGHT,
        }
    }

    /// Stable index for hashing.
    pub fn index(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

// =============================================================================
// LANE TYPE
// =============================================================================

/// Terrain of one lane row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LaneType {
    /// Static hazards only
    Grass = 0,
    /// Cars, lethal on contact
    Road = 1,
    /// Logs, passable
    River = 2,
    /// Trains, lethal on contact
    Rail = 3,
}

impl LaneType {
    /// All lane types, in palette order.
    pub const ALL: [LaneType; 4] = [LaneType::Grass, LaneType::Road, LaneType::River, LaneType::Rail];
}

// =============================================================================
// ENTITY KIND
// =============================================================================

/// What an entity is. Doubles as the collider tag seen by spatial queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityKind {
    /// The runner
    Player = 0,
    /// Static blocking hazard (rocks, trees)
    Obstacle = 1,
    /// Road vehicle
    Car = 2,
    /// Rail vehicle
    Train = 3,
    /// River log, passable
    Log = 4,
    /// Stamina pickup
    Item = 5,
}

impl EntityKind {
    /// Vehicles never block a step; touching one ends the run.
    #[inline]
    pub fn is_vehicle(self) -> bool {
        matches!(self, EntityKind::Car | EntityKind::Train)
    }

    /// Kinds a lane counts against its `max_obstacles` cap.
    #[inline]
    pub fn is_hazard(self) -> bool {
        matches!(
            self,
            EntityKind::Obstacle | EntityKind::Car | EntityKind::Train | EntityKind::Log
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_units() {
        assert_eq!(Direction::Up.unit(), FixedVec2::from_ints(0, 1));
        assert_eq!(Direction::Down.unit(), FixedVec2::from_ints(0, -1));
        assert_eq!(Direction::Left.unit(), FixedVec2::from_ints(-1, 0));
        assert_eq!(Direction::Right.unit(), FixedVec2::from_ints(1, 0));
        assert_eq!(Direction::default(), Direction::Up);
    }

    #[test]
    fn test_entity_kind_classes() {
        assert!(EntityKind::Car.is_vehicle());
        assert!(EntityKind::Train.is_vehicle());
        assert!(!EntityKind::Log.is_vehicle());
        assert!(!EntityKind::Obstacle.is_vehicle());

        assert!(EntityKind::Log.is_hazard());
        assert!(!EntityKind::Item.is_hazard());
        assert!(!EntityKind::Player.is_hazard());
    }
}
