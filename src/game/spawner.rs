//! Lane Spawner
//!
//! Each materialized lane owns one spawner. Grass lanes keep a small set of
//! static hazards topped up; road, river and rail lanes emit moving hazards
//! from one edge on a fixed interval. Non-grass lanes may also roll a single
//! stamina pickup when they appear.
//!
//! The live count never trusts callbacks: each update first drops handles
//! whose entities have disappeared from the world.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::fixed::{Fixed, from_int};
use crate::core::rng::RandomSource;
use crate::core::vec2::FixedVec2;
use crate::game::state::{EntityId, EntityKind, LaneType};
use crate::game::world::World;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Edge a lane's moving hazards enter from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnEdge {
    /// Enter at -offset and travel right
    Left,
    /// Enter at +offset and travel left
    Right,
}

/// Spawn rules for one lane type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneRules {
    /// What to spawn. `None` leaves the lane empty.
    pub obstacle: Option<EntityKind>,
    /// Minimum ticks between moving spawns
    pub spawn_interval_ticks: u32,
    /// Cap on live hazards owned by the lane
    pub max_obstacles: u32,
    /// Hazard speed in units per second
    pub speed: Fixed,
    /// Entry edge for moving hazards
    pub spawn_edge: SpawnEdge,
    /// Chance (0-100) of a pickup when the lane appears
    pub item_percent: u32,
}

/// Rules per lane type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaneTable {
    rules: BTreeMap<LaneType, LaneRules>,
}

impl LaneTable {
    /// Empty table; unknown lane types spawn nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rules for a type.
    pub fn insert(&mut self, lane_type: LaneType, rules: LaneRules) {
        self.rules.insert(lane_type, rules);
    }

    /// Rules for a type.
    pub fn get(&self, lane_type: LaneType) -> Option<&LaneRules> {
        self.rules.get(&lane_type)
    }
}

/// Horizontal extents shared by every lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnArea {
    /// |x| where moving hazards enter
    pub spawn_offset: Fixed,
    /// Static hazards and pickups land on integer x in [-span, span]
    pub hazard_span: i32,
}

// =============================================================================
// SPAWNER
// =============================================================================

/// Hazard and pickup spawner for one lane.
#[derive(Clone, Debug)]
pub struct LaneSpawner {
    index: i32,
    lane_type: LaneType,
    y: Fixed,
    rules: Option<LaneRules>,
    area: SpawnArea,
    clear_column: Option<i32>,

    live_count: u32,
    last_spawn_tick: Option<u32>,
    /// Hazards counted against `max_obstacles`
    hazards: Vec<EntityId>,
    /// Everything the lane spawned, hazards and pickups
    owned: Vec<EntityId>,
}

impl LaneSpawner {
    /// Create a spawner. Nothing is spawned until [`materialize`](Self::materialize).
    ///
    /// `clear_column`, when set, is an x cell static hazards must never use.
    pub fn new(
        index: i32,
        lane_type: LaneType,
        y: Fixed,
        rules: Option<LaneRules>,
        area: SpawnArea,
        clear_column: Option<i32>,
    ) -> Self {
        Self {
            index,
            lane_type,
            y,
            rules,
            area,
            clear_column,
            live_count: 0,
            last_spawn_tick: None,
            hazards: Vec::new(),
            owned: Vec::new(),
        }
    }

    /// Lane index.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Lane type.
    pub fn lane_type(&self) -> LaneType {
        self.lane_type
    }

    /// World y of the lane's row.
    pub fn y(&self) -> Fixed {
        self.y
    }

    /// Live hazards currently counted.
    pub fn live_count(&self) -> u32 {
        self.live_count
    }

    /// Every entity the lane still owns.
    pub fn owned(&self) -> &[EntityId] {
        &self.owned
    }

    /// One-time setup when the lane appears: roll for a pickup.
    pub fn materialize<R: RandomSource>(&mut self, world: &mut World, rng: &mut R) {
        let Some(rules) = &self.rules else { return };
        if self.lane_type == LaneType::Grass || rules.item_percent == 0 {
            return;
        }

        let x = rng.next_int_range(-self.area.hazard_span, self.area.hazard_span);
        if rng.roll_percent(rules.item_percent) {
            let id = world.spawn_with(
                EntityKind::Item,
                FixedVec2::new(from_int(x), self.y),
                0,
                Some(self.index),
            );
            self.owned.push(id);
            debug!(lane = self.index, x, "Item placed");
        }
    }

    /// Per-tick spawning.
    pub fn update<R: RandomSource>(&mut self, tick: u32, world: &mut World, rng: &mut R) {
        self.observe_destroyed(world);

        let Some(rules) = &self.rules else { return };
        let Some(kind) = rules.obstacle else { return };

        if self.live_count >= rules.max_obstacles {
            return;
        }

        if self.lane_type == LaneType::Grass {
            self.top_up_static(kind, world, rng);
        } else {
            let due = self
                .last_spawn_tick
                .map_or(true, |last| tick.saturating_sub(last) >= rules.spawn_interval_ticks);
            if due {
                self.spawn_moving(kind, tick, world);
            }
        }
    }

    /// Destroy everything the lane owns.
    pub fn teardown(&mut self, world: &mut World) {
        for id in self.owned.drain(..) {
            world.destroy(id);
        }
        self.hazards.clear();
        self.live_count = 0;
    }

    /// Drop handles whose entities are gone.
    fn observe_destroyed(&mut self, world: &World) {
        let mut gone = 0u32;
        self.hazards.retain(|id| {
            let alive = world.contains(*id);
            if !alive {
                gone += 1;
            }
            alive
        });
        self.live_count = self.live_count.saturating_sub(gone);
        self.owned.retain(|id| world.contains(*id));
    }

    /// Place one static hazard at a random cell.
    fn top_up_static<R: RandomSource>(&mut self, kind: EntityKind, world: &mut World, rng: &mut R) {
        let x = rng.next_int_range(-self.area.hazard_span, self.area.hazard_span);
        if self.clear_column == Some(x) {
            // Retry next tick
            return;
        }

        let id = world.spawn_with(kind, FixedVec2::new(from_int(x), self.y), 0, Some(self.index));
        self.track_hazard(id);
    }

    /// Emit one moving hazard from the lane's edge.
    fn spawn_moving(&mut self, kind: EntityKind, tick: u32, world: &mut World) {
        let Some(rules) = &self.rules else { return };

        let (x, velocity) = match rules.spawn_edge {
            SpawnEdge::Left => (-self.area.spawn_offset, rules.speed),
            SpawnEdge::Right => (self.area.spawn_offset, -rules.speed),
        };

        let id = world.spawn_with(kind, FixedVec2::new(x, self.y), velocity, Some(self.index));
        self.last_spawn_tick = Some(tick);
        self.track_hazard(id);

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(lane = self.index, ?kind, tick, "Hazard spawned");
    }

    fn track_hazard(&mut self, id: EntityId) {
        self.hazards.push(id);
        self.owned.push(id);
        self.live_count += 1;
    }
}

// =============================================================================
// TESTS
// =============================================================================
