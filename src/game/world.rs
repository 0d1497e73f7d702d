//! Entity World
//!
//! Owns every live entity and answers the two spatial queries movement
//! validation needs: a circle overlap at a point and a ray cast along a path.
//!
//! Entities live in a `BTreeMap` keyed by id, so iteration (and therefore
//! "first hit" selection) is deterministic.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, fixed_div, fixed_mul, fixed_clamp, to_fixed};
use crate::core::vec2::FixedVec2;
use crate::game::state::{EntityId, EntityKind};

// =============================================================================
// COLLIDERS
// =============================================================================

/// Axis-aligned collider shape plus its physics layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColliderShape {
    /// Half width / half height of the box
    pub half_extents: FixedVec2,
    /// Physics layer index (0..32), matched against probe layer masks
    pub layer: u8,
}

impl ColliderShape {
    /// Box with the given half extents on layer 0.
    pub const fn new(half_x: Fixed, half_y: Fixed) -> Self {
        Self {
            half_extents: FixedVec2::new(half_x, half_y),
            layer: 0,
        }
    }

    /// Square box with the given half size on layer 0.
    pub const fn square(half: Fixed) -> Self {
        Self::new(half, half)
    }

    /// Same box on a different layer.
    pub const fn on_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }
}

/// Collider shape for each entity kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeTable {
    /// Runner
    pub player: ColliderShape,
    /// Static hazard
    pub obstacle: ColliderShape,
    /// Road vehicle
    pub car: ColliderShape,
    /// Rail vehicle
    pub train: ColliderShape,
    /// River log
    pub log: ColliderShape,
    /// Stamina pickup
    pub item: ColliderShape,
}

impl Default for ShapeTable {
    fn default() -> Self {
        Self {
            player: ColliderShape::square(to_fixed(0.4)),
            obstacle: ColliderShape::square(to_fixed(0.45)),
            car: ColliderShape::new(to_fixed(0.9), to_fixed(0.4)),
            train: ColliderShape::new(to_fixed(2.0), to_fixed(0.4)),
            log: ColliderShape::new(to_fixed(1.2), to_fixed(0.4)),
            item: ColliderShape::square(to_fixed(0.3)),
        }
    }
}

impl ShapeTable {
    /// Shape for a kind.
    pub fn get(&self, kind: EntityKind) -> ColliderShape {
        match kind {
            EntityKind::Player => self.player,
            EntityKind::Obstacle => self.obstacle,
            EntityKind::Car => self.car,
            EntityKind::Train => self.train,
            EntityKind::Log => self.log,
            EntityKind::Item => self.item,
        }
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// A live object in the world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Handle
    pub id: EntityId,
    /// What it is; also its collider tag
    pub kind: EntityKind,
    /// Center position
    pub position: FixedVec2,
    /// Horizontal speed in units per second (0 for static entities)
    pub velocity_x: Fixed,
    /// Collider box and layer
    pub shape: ColliderShape,
    /// Lane index that spawned it, if any
    pub lane: Option<i32>,
}

impl Entity {
    /// Box corners (min, max).
    #[inline]
    pub fn bounds(&self) -> (FixedVec2, FixedVec2) {
        let half = self.shape.half_extents;
        (self.position - half, self.position + half)
    }

    /// Does a circle at `center` touch this box?
    pub fn overlaps_circle(&self, center: FixedVec2, radius: Fixed) -> bool {
        let (min, max) = self.bounds();
        let closest = FixedVec2::new(
            fixed_clamp(center.x, min.x, max.x),
            fixed_clamp(center.y, min.y, max.y),
        );
        center.distance_squared(closest) <= fixed_mul(radius, radius)
    }

    /// Do two boxes overlap? Boxes that only share an edge do not.
    pub fn overlaps_box(&self, other: &Entity) -> bool {
        let (a_min, a_max) = self.bounds();
        let (b_min, b_max) = other.bounds();
        a_min.x < b_max.x && b_min.x < a_max.x && a_min.y < b_max.y && b_min.y < a_max.y
    }

    /// Distance along a unit ray at which it enters this box.
    ///
    /// A ray that starts inside the box hits at distance 0.
    pub fn ray_entry(&self, origin: FixedVec2, direction: FixedVec2, max_distance: Fixed) -> Option<Fixed> {
        let (min, max) = self.bounds();
        let mut t_enter: Fixed = 0;
        let mut t_exit: Fixed = max_distance;

        let slabs = [
            (origin.x, direction.x, min.x, max.x),
            (origin.y, direction.y, min.y, max.y),
        ];

        for (o, d, lo, hi) in slabs {
            if d == 0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let mut t0 = fixed_div(lo - o, d);
            let mut t1 = fixed_div(hi - o, d);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        Some(t_enter)
    }
}

// =============================================================================
// SPATIAL QUERIES
// =============================================================================

/// A collider reported by a spatial query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColliderHit {
    /// Entity that was hit
    pub entity: EntityId,
    /// Its tag
    pub kind: EntityKind,
    /// Its physics layer
    pub layer: u8,
    /// Distance along the ray (0 for overlaps)
    pub distance: Fixed,
}

impl ColliderHit {
    fn from_entity(entity: &Entity, distance: Fixed) -> Self {
        Self {
            entity: entity.id,
            kind: entity.kind,
            layer: entity.shape.layer,
            distance,
        }
    }
}

/// Spatial queries used by movement validation.
///
/// Both queries take an `ignore` handle so the mover's own collider, which
/// always contains the ray origin, never reports itself.
pub trait SpatialQuery {
    /// First collider (in id order) touching a circle at `point`.
    fn overlap(&self, point: FixedVec2, radius: Fixed, ignore: Option<EntityId>) -> Option<ColliderHit>;

    /// Nearest collider along `direction` within `max_distance`.
    fn raycast(
        &self,
        origin: FixedVec2,
        direction: FixedVec2,
        max_distance: Fixed,
        ignore: Option<EntityId>,
    ) -> Option<ColliderHit>;
}

// =============================================================================
// WORLD
// =============================================================================

/// Entity store.
#[derive(Clone, Debug)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u32,
    shapes: ShapeTable,
}

impl Default for World {
    fn default() -> Self {
        Self::new(ShapeTable::default())
    }
}

impl World {
    /// Create an empty world.
    pub fn new(shapes: ShapeTable) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
            shapes,
        }
    }

    /// Spawn a static entity of `kind` at `position`.
    pub fn spawn(&mut self, kind: EntityKind, position: FixedVec2) -> EntityId {
        self.spawn_with(kind, position, 0, None)
    }

    /// Spawn an entity with a horizontal velocity and owning lane.
    pub fn spawn_with(
        &mut self,
        kind: EntityKind,
        position: FixedVec2,
        velocity_x: Fixed,
        lane: Option<i32>,
    ) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        self.entities.insert(
            id,
            Entity {
                id,
                kind,
                position,
                velocity_x,
                shape: self.shapes.get(kind),
                lane,
            },
        );

        id
    }

    /// Destroy an entity. Returns false if it was already gone.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.entities.remove(&id).is_some()
    }

    /// Is the handle still live?
    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Look up an entity.
    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Look up an entity mutably.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Move an entity. Returns false if it no longer exists.
    pub fn set_position(&mut self, id: EntityId, position: FixedVec2) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => {
                entity.position = position;
                true
            }
            None => false,
        }
    }

    /// Iterate entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterate entities mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when nothing is alive.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Count live entities of one kind.
    pub fn count_kind(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind == kind).count()
    }

    /// Remove everything. Handles keep counting up so stale ones never revive.
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Colliders whose boxes overlap `id`'s box, in id order.
    pub fn touching(&self, id: EntityId) -> Vec<ColliderHit> {
        let Some(subject) = self.entities.get(&id) else {
            return Vec::new();
        };

        self.entities
            .values()
            .filter(|other| other.id != id && subject.overlaps_box(other))
            .map(|other| ColliderHit::from_entity(other, 0))
            .collect()
    }
}

impl SpatialQuery for World {
    fn overlap(&self, point: FixedVec2, radius: Fixed, ignore: Option<EntityId>) -> Option<ColliderHit> {
        self.entities
            .values()
            .filter(|entity| Some(entity.id) != ignore)
            .find(|entity| entity.overlaps_circle(point, radius))
            .map(|entity| ColliderHit::from_entity(entity, 0))
    }

    fn raycast(
        &self,
        origin: FixedVec2,
        direction: FixedVec2,
        max_distance: Fixed,
        ignore: Option<EntityId>,
    ) -> Option<ColliderHit> {
        let mut best: Option<ColliderHit> = None;

        for entity in self.entities.values() {
            if Some(entity.id) == ignore {
                continue;
            }
            if let Some(distance) = entity.ray_entry(origin, direction, max_distance) {
                // Strict less-than keeps the lower id on ties
                if best.map_or(true, |hit| distance < hit.distance) {
                    best = Some(ColliderHit::from_entity(entity, distance));
                }
            }
        }

        best
    }
}

// =============================================================================
// TESTS
// =============================================================================
