//! Lane Streamer
//!
//! Keeps a contiguous window of lanes around the player. Lanes are indexed
//! by integer row (`y = index * lane_height`); the window covers
//! `[min_lane, max_lane)` and slides as the player advances.
//!
//! ```text
//!   max_lane ──►  ┌──────────┐   player_lane + lanes_ahead
//!                 │  ahead   │
//!   player  ───►  ├──────────┤
//!                 │  behind  │
//!   min_lane ──►  └──────────┘   player_lane - lanes_behind
//! ```

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::core::fixed::Fixed;
use crate::core::rng::RandomSource;
use crate::game::spawner::{LaneSpawner, LaneTable, SpawnArea};
use crate::game::state::LaneType;
use crate::game::world::World;

/// Window and palette settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Height of one lane row
    pub lane_height: Fixed,
    /// Lanes kept ahead of the player
    pub lanes_ahead: i32,
    /// Lanes kept behind the player
    pub lanes_behind: i32,
    /// First lane of the initial fill
    pub initial_offset: i32,
    /// Lane types to draw from; the initial fill uses the first entry
    pub palette: Vec<LaneType>,
    /// Keep static hazards out of the start column in initial lanes
    pub keep_start_column_clear: bool,
}

/// Sliding lane window.
#[derive(Clone, Debug)]
pub struct LaneStreamer {
    config: StreamerConfig,
    table: LaneTable,
    area: SpawnArea,
    lanes: VecDeque<LaneSpawner>,
    min_lane: i32,
    max_lane: i32,
}

impl LaneStreamer {
    /// Create an empty streamer.
    pub fn new(config: StreamerConfig, table: LaneTable, area: SpawnArea) -> Self {
        Self {
            config,
            table,
            area,
            lanes: VecDeque::new(),
            min_lane: 0,
            max_lane: 0,
        }
    }

    /// Lowest materialized lane index (inclusive).
    pub fn min_lane(&self) -> i32 {
        self.min_lane
    }

    /// One past the highest materialized lane index.
    pub fn max_lane(&self) -> i32 {
        self.max_lane
    }

    /// Number of materialized lanes.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Lanes from lowest to highest.
    pub fn lanes(&self) -> impl ExactSizeIterator<Item = &LaneSpawner> {
        self.lanes.iter()
    }

    /// Lane at `index`, if materialized.
    pub fn lane(&self, index: i32) -> Option<&LaneSpawner> {
        if index < self.min_lane || index >= self.max_lane {
            return None;
        }
        self.lanes.get((index - self.min_lane) as usize)
    }

    /// Row index containing world height `y`.
    pub fn lane_index_of(&self, y: Fixed) -> i32 {
        (y as i64).div_euclid(self.config.lane_height as i64) as i32
    }

    /// Populate lanes `initial_offset .. lanes_ahead` with the first palette
    /// entry, keeping `start_column` clear of static hazards.
    pub fn initial_fill<R: RandomSource>(&mut self, world: &mut World, rng: &mut R, start_column: i32) {
        let Some(&first) = self.config.palette.first() else {
            return;
        };

        let clear = self.config.keep_start_column_clear.then_some(start_column);
        self.min_lane = self.config.initial_offset;
        self.max_lane = self.config.initial_offset;

        for index in self.config.initial_offset..self.config.lanes_ahead {
            self.push_back(index, first, clear, world, rng);
        }

        info!(
            min = self.min_lane,
            max = self.max_lane,
            lane_type = ?first,
            "Initial lanes filled"
        );
    }

    /// Slide the window to follow the player.
    pub fn update_window<R: RandomSource>(&mut self, player_y: Fixed, world: &mut World, rng: &mut R) {
        let player_lane = self.lane_index_of(player_y);
        let ahead = player_lane + self.config.lanes_ahead;
        let behind = player_lane - self.config.lanes_behind;

        if self.lanes.is_empty() {
            self.max_lane = self.max_lane.min(ahead);
            self.min_lane = self.max_lane;
        }

        while self.max_lane < ahead {
            let lane_type = match rng.choose(&self.config.palette) {
                Some(lane_type) => *lane_type,
                None => return,
            };
            let index = self.max_lane;
            self.push_back(index, lane_type, None, world, rng);
        }

        while self.min_lane < behind {
            if let Some(mut lane) = self.lanes.pop_front() {
                lane.teardown(world);
                debug!(lane = lane.index(), "Lane retired behind");
            }
            self.min_lane += 1;
        }

        // Walking backwards: retire rows that fell out of the ahead window
        while self.max_lane > ahead && self.max_lane > self.min_lane {
            if let Some(mut lane) = self.lanes.pop_back() {
                lane.teardown(world);
                debug!(lane = lane.index(), "Lane retired ahead");
            }
            self.max_lane -= 1;
        }
    }

    /// Run every lane's spawner for this tick.
    pub fn update_lanes<R: RandomSource>(&mut self, tick: u32, world: &mut World, rng: &mut R) {
        for lane in self.lanes.iter_mut() {
            lane.update(tick, world, rng);
        }
    }

    /// Tear down every lane and reset both frontiers to 0.
    pub fn reset(&mut self, world: &mut World) {
        for mut lane in self.lanes.drain(..) {
            lane.teardown(world);
        }
        self.min_lane = 0;
        self.max_lane = 0;
    }

    fn push_back<R: RandomSource>(
        &mut self,
        index: i32,
        lane_type: LaneType,
        clear_column: Option<i32>,
        world: &mut World,
        rng: &mut R,
    ) {
        let y = index.wrapping_mul(self.config.lane_height);
        let mut lane = LaneSpawner::new(
            index,
            lane_type,
            y,
            self.table.get(lane_type).cloned(),
            self.area,
            clear_column,
        );
        lane.materialize(world, rng);

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(index, ?lane_type, "Lane materialized");

        self.lanes.push_back(lane);
        self.max_lane = index + 1;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FIXED_ONE, from_int, to_fixed};
    use crate::core::rng::DeterministicRng;
    use crate::game::spawner::{LaneRules, SpawnEdge};
    use crate::game::state::EntityKind;
    use proptest::prelude::*;

    fn streamer() -> LaneStreamer {
        let mut table = LaneTable::new();
        table.insert(
            LaneType::Grass,
            LaneRules {
                obstacle: Some(EntityKind::Obstacle),
                spawn_interval_ticks: 1,
                max_obstacles: 3,
                speed: 0,
                spawn_edge: SpawnEdge::Left,
                item_percent: 0,
            },
        );
        table.insert(
            LaneType::Road,
            LaneRules {
                obstacle: Some(EntityKind::Car),
                spawn_interval_ticks: 120,
                max_obstacles: 3,
                speed: from_int(3),
                spawn_edge: SpawnEdge::Left,
                item_percent: 20,
            },
        );

        LaneStreamer::new(
            StreamerConfig {
                lane_height: FIXED_ONE,
                lanes_ahead: 10,
                lanes_behind: 5,
                initial_offset: -5,
                palette: vec![LaneType::Grass, LaneType::Road],
                keep_start_column_clear: true,
            },
            table,
            SpawnArea {
                spawn_offset: from_int(10),
                hazard_span: 10,
            },
        )
    }

    fn assert_window(streamer: &LaneStreamer) {
        assert_eq!(
            streamer.lane_count() as i32,
            streamer.max_lane() - streamer.min_lane(),
            "lanes must be contiguous"
        );
        for (offset, lane) in streamer.lanes().enumerate() {
            assert_eq!(lane.index(), streamer.min_lane() + offset as i32);
        }
    }

    #[test]
    fn test_initial_fill() {
        let mut s = streamer();
        let mut world = World::default();
        let mut rng = DeterministicRng::new(1);

        s.initial_fill(&mut world, &mut rng, 0);

        assert_eq!(s.min_lane(), -5);
        assert_eq!(s.max_lane(), 10);
        assert_eq!(s.lane_count(), 15);
        assert!(s.lanes().all(|l| l.lane_type() == LaneType::Grass));
        assert_window(&s);
    }

    #[test]
    fn test_initial_fill_keeps_start_column_clear() {
        let mut s = streamer();
        let mut world = World::default();
        let mut rng = DeterministicRng::new(77);

        s.initial_fill(&mut world, &mut rng, 0);
        for tick in 1..=200 {
            s.update_lanes(tick, &mut world, &mut rng);
        }

        assert!(world.count_kind(EntityKind::Obstacle) > 0);
        assert!(world.iter().all(|e| e.position.x != 0));
    }

    #[test]
    fn test_window_follows_player() {
        let mut s = streamer();
        let mut world = World::default();
        let mut rng = DeterministicRng::new(2);
        s.initial_fill(&mut world, &mut rng, 0);

        s.update_window(from_int(3), &mut world, &mut rng);
        assert_eq!(s.max_lane(), 13);
        assert_eq!(s.min_lane(), -2);
        assert_window(&s);
        assert!(s.lane(-3).is_none());
        assert_eq!(s.lane(12).map(|l| l.index()), Some(12));
    }

    #[test]
    fn test_window_retracts_when_walking_back() {
        let mut s = streamer();
        let mut world = World::default();
        let mut rng = DeterministicRng::new(3);
        s.initial_fill(&mut world, &mut rng, 0);

        s.update_window(from_int(-2), &mut world, &mut rng);
        assert_eq!(s.max_lane(), 8);
        assert_eq!(s.min_lane(), -5, "no backfill behind");
        assert_window(&s);
    }

    #[test]
    fn test_partial_row_floors() {
        let s = streamer();
        assert_eq!(s.lane_index_of(to_fixed(0.99)), 0);
        assert_eq!(s.lane_index_of(to_fixed(-0.25)), -1);
        assert_eq!(s.lane_index_of(from_int(-3)), -3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut s = streamer();
        let mut world = World::default();
        let mut rng = DeterministicRng::new(4);
        s.initial_fill(&mut world, &mut rng, 0);
        s.update_lanes(1, &mut world, &mut rng);
        assert!(!world.is_empty());

        s.reset(&mut world);
        assert_eq!(s.lane_count(), 0);
        assert_eq!((s.min_lane(), s.max_lane()), (0, 0));
        assert!(world.is_empty());
    }

    #[test]
    fn test_update_from_empty_after_reset() {
        let mut s = streamer();
        let mut world = World::default();
        let mut rng = DeterministicRng::new(5);

        s.update_window(from_int(20), &mut world, &mut rng);
        assert_eq!(s.min_lane(), 15);
        assert_eq!(s.max_lane(), 30);
        assert_window(&s);
    }

    proptest! {
        #[test]
        fn prop_window_invariant(seed in any::<u64>(), moves in prop::collection::vec(-3i32..=3, 1..40)) {
            let mut s = streamer();
            let mut world = World::default();
            let mut rng = DeterministicRng::new(seed);
            s.initial_fill(&mut world, &mut rng, 0);

            let mut lane = 0i32;
            for (tick, delta) in moves.into_iter().enumerate() {
                lane += delta;
                s.update_window(from_int(lane), &mut world, &mut rng);
                s.update_lanes(tick as u32 + 1, &mut world, &mut rng);

                prop_assert!(s.max_lane() <= lane + 10);
                prop_assert!(s.min_lane() >= lane - 5);
                prop_assert_eq!(s.lane_count() as i32, s.max_lane() - s.min_lane());
                for l in s.lanes() {
                    prop_assert!(l.live_count() <= 3);
                }
            }
        }
    }
}
