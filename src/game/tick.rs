//! Session Tick
//!
//! One fixed-rate step of the whole game. Everything that changes state
//! happens here, in a fixed order, so a seed plus a recorded input stream
//! reproduces a run exactly.

use tracing::info;

use crate::config::GameConfig;
use crate::core::fixed::{Fixed, fixed_floor};
use crate::core::hash::{StateHash, compute_state_hash};
use crate::core::rng::{DeterministicRng, RandomSource};
use crate::core::vec2::FixedVec2;
use crate::game::coordinator::{CoordinatorConfig, GameCoordinator, GameState};
use crate::game::events::{EventHandler, EventKind, GameEvent, GameEventData, Subscription};
use crate::game::input::{Gesture, InputRecording, PlayerInput};
use crate::game::movement::{MoveOutcome, MovementConfig, PlayerMovementController};
use crate::game::obstacle::advance_obstacles;
use crate::game::probe::{ContactTracker, ProbeConfig, SpatialProbe};
use crate::game::spawner::{LaneTable, SpawnArea};
use crate::game::state::EntityKind;
use crate::game::storage::{MemoryStore, ScoreStore};
use crate::game::streamer::{LaneStreamer, StreamerConfig};
use crate::game::world::{ShapeTable, World};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick number just simulated
    pub tick: u32,
    /// Events published since the previous tick
    pub events: Vec<GameEvent>,
    /// What the tick's gesture did, if one was delivered
    pub movement: Option<MoveOutcome>,
    /// Destination of a step that landed this tick
    pub landed: Option<FixedVec2>,
    /// Whether the run is over after this tick
    pub game_over: bool,
}

/// Runtime configuration, in ticks and fixed-point.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Step tuning
    pub movement: MovementConfig,
    /// Step validation
    pub probe: ProbeConfig,
    /// Lane window
    pub streamer: StreamerConfig,
    /// Spawn rules per lane type
    pub lanes: LaneTable,
    /// Lane extents
    pub area: SpawnArea,
    /// Collider shapes per kind
    pub shapes: ShapeTable,
    /// |x| past which moving hazards are removed
    pub destroy_distance: Fixed,
    /// Score, stamina and persistence
    pub coordinator: CoordinatorConfig,
    /// Stamina restored by a pickup
    pub item_restore: i32,
    /// Camera height relative to the player
    pub camera_offset: Fixed,
    /// Player spawn point
    pub player_start: FixedVec2,
}

impl Default for SessionConfig {
    fn default() -> Self {
        GameConfig::default().build()
    }
}

/// A running game.
pub struct Session<S: ScoreStore, R: RandomSource = DeterministicRng> {
    config: SessionConfig,
    seed: u64,
    tick: u32,
    world: World,
    streamer: LaneStreamer,
    player: Option<PlayerMovementController>,
    contacts: ContactTracker,
    coordinator: GameCoordinator<S>,
    rng: R,
    camera_y: Fixed,
    /// Events not yet handed out in a `TickResult`
    pending: Vec<GameEvent>,
}

impl<S: ScoreStore> Session<S, DeterministicRng> {
    /// Create a session seeded with `seed` and load the first level.
    pub fn new(config: SessionConfig, seed: u64, store: S) -> Self {
        Self::with_rng(config, seed, store, DeterministicRng::new(seed))
    }
}

impl<S: ScoreStore, R: RandomSource> Session<S, R> {
    /// Create a session with a custom random source.
    pub fn with_rng(config: SessionConfig, seed: u64, store: S, rng: R) -> Self {
        let mut session = Self {
            world: World::new(config.shapes.clone()),
            streamer: LaneStreamer::new(config.streamer.clone(), config.lanes.clone(), config.area),
            player: None,
            contacts: ContactTracker::new(),
            coordinator: GameCoordinator::new(config.coordinator.clone(), store),
            rng,
            camera_y: 0,
            pending: Vec::new(),
            tick: 0,
            seed,
            config,
        };

        session.load_level();
        session.route_events();
        session
    }

    // =========================================================================
    // STEPPING
    // =========================================================================

    /// Run one tick with an optional gesture.
    pub fn tick(&mut self, gesture: Option<Gesture>) -> TickResult {
        // 0. Advance tick counter
        self.tick += 1;
        self.coordinator.begin_tick(self.tick);

        let mut result = TickResult {
            tick: self.tick,
            ..TickResult::default()
        };

        // 1. Gesture and step interpolation
        if let Some(player) = self.player.as_mut() {
            if let Some(gesture) = gesture {
                if !self.coordinator.is_game_over() {
                    result.movement = Some(player.handle_gesture(&gesture, &self.world));
                }
            }
            result.landed = player.advance(&mut self.world);
        }

        // 2. Moving hazards
        advance_obstacles(&mut self.world, self.config.destroy_distance);

        // 3. Contacts
        self.process_contacts();

        // 4. Score and camera
        let player_y = self.player_position().map(|p| p.y);
        self.coordinator.update_progress(player_y);
        if let Some(y) = player_y {
            self.camera_y = self.camera_y.max(y.wrapping_add(self.config.camera_offset));
        }

        // 5. Stamina drain
        self.coordinator.tick_stamina();

        // 6. Lane window and spawners
        if let Some(y) = player_y {
            self.streamer.update_window(y, &mut self.world, &mut self.rng);
        }
        self.streamer.update_lanes(self.tick, &mut self.world, &mut self.rng);

        // 7. React to notifications
        self.route_events();

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(tick = self.tick, entities = self.world.len(), "Tick complete");

        result.events = std::mem::take(&mut self.pending);
        result.game_over = self.coordinator.is_game_over();
        result
    }

    /// Apply one tick's worth of recorded inputs: restarts first, then the
    /// last gesture, then the tick itself.
    pub fn apply_inputs(&mut self, inputs: &[PlayerInput]) -> TickResult {
        let mut gesture = None;
        for input in inputs {
            match input {
                PlayerInput::Restart => {
                    self.restart();
                }
                PlayerInput::Gesture(g) => gesture = Some(*g),
            }
        }
        self.tick(gesture)
    }

    /// Request a restart. Returns false if the coordinator refused it.
    ///
    /// The level is rebuilt immediately; resulting events are returned by
    /// the next `tick`. A freshly loaded level cannot be restarted again
    /// until a tick has run on it.
    pub fn restart(&mut self) -> bool {
        self.coordinator.begin_tick(self.tick);
        let accepted = self.coordinator.restart_game();
        self.route_events();
        accepted
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn load_level(&mut self) {
        let start = self.config.player_start;
        let id = self.world.spawn(EntityKind::Player, start);

        self.player = Some(PlayerMovementController::new(
            id,
            self.config.movement.clone(),
            SpatialProbe::new(self.config.probe.clone()),
        ));
        self.contacts.clear();
        self.camera_y = start.y.wrapping_add(self.config.camera_offset);

        self.streamer
            .initial_fill(&mut self.world, &mut self.rng, fixed_floor(start.x));
        self.coordinator.initialize_level(Some(start.y));

        info!(tick = self.tick, seed = self.seed, lanes = self.streamer.lane_count(), "Level loaded");
    }

    fn process_contacts(&mut self) {
        let Some(entity) = self.player.as_ref().map(|p| p.entity()) else {
            return;
        };
        if self.coordinator.is_game_over() {
            return;
        }

        for hit in self.contacts.entered(&self.world, entity) {
            match hit.kind {
                EntityKind::Car | EntityKind::Train => {
                    info!(tick = self.tick, kind = ?hit.kind, "Player hit by vehicle");
                    self.coordinator.game_over();
                }
                EntityKind::Item => {
                    self.coordinator.add_stamina(self.config.item_restore);
                    self.world.destroy(hit.entity);
                }
                EntityKind::Obstacle | EntityKind::Log | EntityKind::Player => {}
            }
        }
    }

    /// Drain the coordinator outbox and act on lifecycle events.
    fn route_events(&mut self) {
        loop {
            let events = self.coordinator.take_events();
            if events.is_empty() {
                break;
            }

            for event in events {
                match event.data {
                    GameEventData::GameOverPlayer => self.teardown_player(),
                    GameEventData::GameRestarted => self.reload_level(),
                    _ => {}
                }
                self.pending.push(event);
            }
        }
    }

    fn teardown_player(&mut self) {
        if let Some(player) = self.player.take() {
            self.world.destroy(player.entity());
            self.coordinator.detach_player();
            self.contacts.clear();
            info!(tick = self.tick, "Player removed");
        }
    }

    fn reload_level(&mut self) {
        self.streamer.reset(&mut self.world);
        self.world.clear();
        self.player = None;
        self.load_level();
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    /// Register an observer on the coordinator.
    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) -> Subscription {
        self.coordinator.subscribe(kind, handler)
    }

    /// Remove an observer.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.coordinator.unsubscribe(subscription)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Ticks simulated so far.
    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    /// Session seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run snapshot.
    pub fn state(&self) -> GameState {
        self.coordinator.state()
    }

    /// Entity store.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable entity store, for scripted scenarios.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Lane window.
    pub fn streamer(&self) -> &LaneStreamer {
        &self.streamer
    }

    /// Run coordinator.
    pub fn coordinator(&self) -> &GameCoordinator<S> {
        &self.coordinator
    }

    /// Player controller, while the player exists.
    pub fn player(&self) -> Option<&PlayerMovementController> {
        self.player.as_ref()
    }

    /// Player position, while the player exists.
    pub fn player_position(&self) -> Option<FixedVec2> {
        let player = self.player.as_ref()?;
        self.world.get(player.entity()).map(|e| e.position)
    }

    /// Height the camera should sit at. Only ever moves up within a level.
    pub fn camera_target_y(&self) -> Fixed {
        self.camera_y
    }

    /// Fingerprint of the simulation state.
    ///
    /// The high score comes from outside the simulation and is left out.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.seed, |h| {
            let state = self.coordinator.state();
            h.update_bool(state.is_game_over);
            h.update_i32(state.current_score);
            h.update_i32(state.stamina);

            match &self.player {
                Some(player) => {
                    h.update_bool(true);
                    h.update_u32(player.entity().raw());
                    h.update_u8(player.facing().index());
                    h.update_bool(player.is_moving());
                }
                None => h.update_bool(false),
            }

            h.update_i32(self.streamer.min_lane());
            h.update_i32(self.streamer.max_lane());
            h.update_len(self.streamer.lanes().len());
            for lane in self.streamer.lanes() {
                h.update_i32(lane.index());
                h.update_u8(lane.lane_type() as u8);
                h.update_u32(lane.live_count());
            }

            h.update_len(self.world.len());
            for entity in self.world.iter() {
                h.update_u32(entity.id.raw());
                h.update_u8(entity.kind as u8);
                h.update_vec2(entity.position);
                h.update_fixed(entity.velocity_x);
            }
        })
    }
}

/// Replay a recording against a fresh in-memory session.
///
/// Returns the session after `tick_count` ticks and every event it produced.
pub fn replay_session(
    config: &SessionConfig,
    recording: &InputRecording,
    tick_count: u32,
) -> (Session<MemoryStore>, Vec<GameEvent>) {
    let mut session = Session::new(config.clone(), recording.seed, MemoryStore::new());
    let mut all_events = Vec::new();

    for _ in 0..tick_count {
        let next = session.tick_count() + 1;
        let inputs: Vec<PlayerInput> = recording.inputs_at(next).iter().map(|e| e.input).collect();
        let result = session.apply_inputs(&inputs);
        all_events.extend(result.events);
    }

    (session, all_events)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{from_int, to_fixed};
    use crate::game::coordinator::MAX_STAMINA;
    use crate::game::state::Direction;

    fn session(seed: u64) -> Session<MemoryStore> {
        Session::new(SessionConfig::default(), seed, MemoryStore::new())
    }

    fn run_idle(session: &mut Session<MemoryStore>, ticks: u32) -> Vec<GameEvent> {
        (0..ticks).flat_map(|_| session.tick(None).events).collect()
    }

    /// Tap, then idle until the step lands.
    fn hop(session: &mut Session<MemoryStore>) {
        session.tick(Some(Gesture::tap()));
        while session.player().map_or(false, |p| p.is_moving()) {
            session.tick(None);
        }
    }

    #[test]
    fn test_new_session_layout() {
        let mut s = session(1);

        assert_eq!(s.player_position(), Some(FixedVec2::ZERO));
        assert_eq!(s.streamer().min_lane(), -5);
        assert_eq!(s.streamer().max_lane(), 10);

        let first = s.tick(None);
        let kinds: Vec<EventKind> = first.events.iter().map(|e| e.kind()).collect();
        assert_eq!(&kinds[..2], &[EventKind::StaminaChanged, EventKind::ScoreChanged]);
    }

    #[test]
    fn test_tick_determinism() {
        let mut a = session(12345);
        let mut b = session(12345);

        for t in 0..300u32 {
            let gesture = (t % 20 == 0).then(Gesture::tap);
            a.tick(gesture);
            b.tick(gesture);
        }

        assert_eq!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = session(1);
        let mut b = session(2);
        run_idle(&mut a, 120);
        run_idle(&mut b, 120);

        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_hops_score_rows() {
        let mut s = session(7);
        // Start column is kept clear in the initial grass lanes
        for _ in 0..3 {
            hop(&mut s);
        }

        assert_eq!(s.player_position(), Some(FixedVec2::from_ints(0, 3)));
        assert_eq!(s.state().current_score, 3);
        assert_eq!(s.state().high_score, 3);
        assert_eq!(s.streamer().max_lane(), 13);
    }

    #[test]
    fn test_turn_without_moving() {
        let mut s = session(7);
        let result = s.tick(Some(Gesture::swipe(-100, 0)));

        assert_eq!(result.movement, Some(MoveOutcome::Turned(Direction::Left)));
        assert_eq!(s.player_position(), Some(FixedVec2::ZERO));
    }

    #[test]
    fn test_camera_only_rises() {
        let mut s = session(7);
        let start = s.camera_target_y();
        assert_eq!(start, to_fixed(-2.0));

        hop(&mut s);
        let after_hop = s.camera_target_y();
        assert_eq!(after_hop, from_int(1) + to_fixed(-2.0));

        // Turn down, then step down
        s.tick(Some(Gesture::swipe(0, -100)));
        s.tick(Some(Gesture::swipe(0, -100)));
        run_idle(&mut s, 10);
        assert_eq!(s.camera_target_y(), after_hop);
    }

    #[test]
    fn test_stamina_depletion_ends_run() {
        let mut config = SessionConfig::default();
        config.coordinator.stamina_interval_ticks = 1;
        let mut s = Session::new(config, 3, MemoryStore::new());

        let events = run_idle(&mut s, MAX_STAMINA as u32 + 5);
        let tail: Vec<EventKind> = events
            .iter()
            .map(|e| e.kind())
            .filter(|k| matches!(k, EventKind::GameOver | EventKind::GameOverPlayer))
            .collect();

        assert_eq!(tail, vec![EventKind::GameOver, EventKind::GameOverPlayer]);
        assert!(s.state().is_game_over);
        assert!(s.player().is_none());
        assert_eq!(s.world().count_kind(EntityKind::Player), 0);

        // Input is ignored once the player is gone
        let result = s.tick(Some(Gesture::tap()));
        assert!(result.movement.is_none());
    }

    #[test]
    fn test_vehicle_contact_ends_run() {
        let mut s = session(5);
        s.world_mut()
            .spawn_with(EntityKind::Car, FixedVec2::new(to_fixed(1.5), 0), -from_int(3), Some(0));

        let mut saw_game_over = false;
        for _ in 0..30 {
            let result = s.tick(None);
            saw_game_over |= result.events.iter().any(|e| e.kind() == EventKind::GameOver);
            if result.game_over {
                break;
            }
        }

        assert!(saw_game_over);
        assert!(s.player().is_none());
    }

    #[test]
    fn test_item_restores_stamina() {
        let mut config = SessionConfig::default();
        config.coordinator.stamina_interval_ticks = 1;
        let mut s = Session::new(config, 5, MemoryStore::new());
        run_idle(&mut s, 50);
        let before = s.state().stamina;

        let item = s.world_mut().spawn(EntityKind::Item, FixedVec2::new(to_fixed(0.1), 0));
        s.tick(None);

        assert!(!s.world().contains(item));
        // +30 from the item, -1 from this tick's drain
        assert_eq!(s.state().stamina, before + 30 - 1);
    }

    #[test]
    fn test_log_is_harmless() {
        let mut s = session(5);
        s.world_mut()
            .spawn_with(EntityKind::Log, FixedVec2::new(to_fixed(0.5), 0), 0, Some(0));

        let result = s.tick(None);
        assert!(!result.game_over);
        assert!(s.player().is_some());
    }

    #[test]
    fn test_restart_rebuilds_level() {
        let mut s = session(9);
        hop(&mut s);
        hop(&mut s);
        s.world_mut()
            .spawn_with(EntityKind::Car, FixedVec2::new(to_fixed(0.3), from_int(2)), 0, Some(2));
        s.tick(None);
        assert!(s.state().is_game_over);

        assert!(s.restart());
        let state = s.state();
        assert!(!state.is_game_over);
        assert_eq!(state.current_score, 0);
        assert_eq!(state.stamina, MAX_STAMINA);
        assert_eq!(state.high_score, 2);
        assert_eq!(s.player_position(), Some(FixedVec2::ZERO));
        assert_eq!(s.streamer().lane_count(), 15);
        assert_eq!(s.world().count_kind(EntityKind::Player), 1);

        let events = s.tick(None).events;
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            &kinds[..3],
            &[EventKind::GameRestarted, EventKind::StaminaChanged, EventKind::ScoreChanged]
        );
    }

    #[test]
    fn test_double_restart_is_noop() {
        let mut s = session(9);
        hop(&mut s);
        assert!(s.restart());
        let rebuilt = s.compute_hash();

        assert!(!s.restart());
        assert_eq!(s.compute_hash(), rebuilt, "level not rolled again");

        let restarts = s
            .tick(None)
            .events
            .iter()
            .filter(|e| e.kind() == EventKind::GameRestarted)
            .count();
        assert_eq!(restarts, 1);

        let result = s.apply_inputs(&[PlayerInput::Restart, PlayerInput::Restart]);
        let restarts = result
            .events
            .iter()
            .filter(|e| e.kind() == EventKind::GameRestarted)
            .count();
        assert_eq!(restarts, 1);
    }

    #[test]
    fn test_observers_receive_notifications() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut s = session(4);
        let scores = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&scores);
        let sub = s.subscribe(
            EventKind::ScoreChanged,
            Box::new(move |e| {
                if let GameEventData::ScoreChanged(v) = e.data {
                    sink.borrow_mut().push(v);
                }
            }),
        );

        hop(&mut s);
        assert_eq!(*scores.borrow(), vec![1]);

        assert!(s.unsubscribe(sub));
        hop(&mut s);
        assert_eq!(*scores.borrow(), vec![1]);
    }

    #[test]
    fn test_window_invariant_over_long_run() {
        let mut s = session(21);
        for t in 0..2000u32 {
            let gesture = (t % 7 == 0).then(Gesture::tap);
            s.tick(gesture);

            let streamer = s.streamer();
            assert_eq!(
                streamer.lane_count() as i32,
                streamer.max_lane() - streamer.min_lane()
            );
            for lane in streamer.lanes() {
                assert!(lane.live_count() <= 3);
            }
            if let Some(pos) = s.player_position() {
                let lane = streamer.lane_index_of(pos.y);
                assert!(streamer.max_lane() <= lane + 10);
                assert!(streamer.min_lane() >= lane - 5);
            }
        }
    }

    #[test]
    fn test_replay_matches_live_run() {
        let config = SessionConfig::default();
        let seed = 4242;
        let mut live = Session::new(config.clone(), seed, MemoryStore::new());
        let mut recording = InputRecording::new(seed);
        let mut live_events = Vec::new();

        for t in 1..=600u32 {
            let mut inputs = Vec::new();
            if t == 400 {
                inputs.push(PlayerInput::Restart);
            }
            if t % 11 == 0 {
                inputs.push(PlayerInput::Gesture(Gesture::tap()));
            } else if t % 29 == 0 {
                inputs.push(PlayerInput::Gesture(Gesture::swipe(90, 5)));
            }
            for input in &inputs {
                recording.record(t, *input);
            }
            live_events.extend(live.apply_inputs(&inputs).events);
        }
        recording.finalize(600);

        let bytes = recording.to_bytes().unwrap();
        let decoded = InputRecording::from_bytes(&bytes).unwrap();
        let (replayed, replay_events) = replay_session(&config, &decoded, 600);

        assert_eq!(replayed.compute_hash(), live.compute_hash());
        assert_eq!(replay_events, live_events);
    }

    #[test]
    fn test_hash_ignores_high_score() {
        let a = Session::new(SessionConfig::default(), 8, MemoryStore::new());
        let b = Session::new(SessionConfig::default(), 8, MemoryStore::with_value("HighScore", 500));

        assert_eq!(a.compute_hash(), b.compute_hash());
        assert_eq!(b.state().high_score, 500);
    }
}
