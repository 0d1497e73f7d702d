//! Game Coordinator
//!
//! Owns the run-level state: score, high score, stamina and the game-over
//! flag. Every change is published through the observer registry and queued
//! on an outbox the session drains each tick.
//!
//! # Stamina
//!
//! Stamina drains by one point per interval while a run is live. The drain
//! is a cancellable task: it stops itself (before decrementing) as soon as
//! the run ends, and fires game over exactly once when it reaches zero.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::core::fixed::{Fixed, fixed_floor};
use crate::game::events::{EventBus, EventHandler, EventKind, GameEvent, Subscription};
use crate::game::storage::ScoreStore;

/// Stamina ceiling; also the value each level starts with.
pub const MAX_STAMINA: i32 = 100;

/// Coordinator tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Ticks between stamina decrements
    pub stamina_interval_ticks: u32,
    /// Persistence key for the high score
    pub high_score_key: String,
}

/// Snapshot of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Run has ended
    pub is_game_over: bool,
    /// Furthest whole row reached
    pub current_score: i32,
    /// Best score ever persisted
    pub high_score: i32,
    /// Remaining stamina, 0..=MAX_STAMINA
    pub stamina: i32,
}

#[derive(Clone, Copy, Debug)]
struct StaminaTask {
    interval: u32,
    elapsed: u32,
}

/// Run coordinator.
pub struct GameCoordinator<S: ScoreStore> {
    config: CoordinatorConfig,
    state: GameState,
    store: S,
    bus: EventBus,
    outbox: Vec<GameEvent>,
    tick: u32,

    stamina_task: Option<StaminaTask>,
    /// Start height of the tracked player; `None` suspends scoring
    start_y: Option<Fixed>,
    max_reached: i32,
    /// Tick the current level was loaded on; `None` until a level exists
    /// and while an accepted restart waits for its rebuild
    level_loaded_at: Option<u32>,
}

impl<S: ScoreStore> GameCoordinator<S> {
    /// Create a coordinator and load the persisted high score.
    pub fn new(config: CoordinatorConfig, store: S) -> Self {
        let high_score = store.get_int(&config.high_score_key, 0);
        info!(high_score, "Coordinator ready");

        Self {
            config,
            state: GameState {
                is_game_over: false,
                current_score: 0,
                high_score,
                stamina: MAX_STAMINA,
            },
            store,
            bus: EventBus::new(),
            outbox: Vec::new(),
            tick: 0,
            stamina_task: None,
            start_y: None,
            max_reached: 0,
            level_loaded_at: None,
        }
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    /// Register an observer.
    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) -> Subscription {
        self.bus.subscribe(kind, handler)
    }

    /// Remove an observer. Unknown tokens are ignored.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    /// Live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.bus.subscriber_count(kind)
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Stamp subsequent events with `tick`.
    pub fn begin_tick(&mut self, tick: u32) {
        self.tick = tick;
    }

    fn publish(&mut self, event: GameEvent) {
        self.bus.dispatch(&event);
        self.outbox.push(event);
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Start a level: refill stamina, (re)start the drain and announce the
    /// current values. `player_start_y` is `None` when no player exists.
    pub fn initialize_level(&mut self, player_start_y: Option<Fixed>) {
        self.stamina_task = None;
        self.state.stamina = MAX_STAMINA;
        self.stamina_task = Some(StaminaTask {
            interval: self.config.stamina_interval_ticks.max(1),
            elapsed: 0,
        });
        self.start_y = player_start_y;
        self.level_loaded_at = Some(self.tick);

        self.publish(GameEvent::stamina_changed(self.tick, self.state.stamina));
        self.publish(GameEvent::score_changed(self.tick, self.state.current_score));
    }

    /// Stop tracking the player (it was destroyed).
    pub fn detach_player(&mut self) {
        self.start_y = None;
    }

    /// End the run. Returns false if it had already ended.
    ///
    /// Publishes `GameOver` then `GameOverPlayer`, both delivered before this
    /// returns.
    pub fn game_over(&mut self) -> bool {
        if self.state.is_game_over {
            return false;
        }

        self.state.is_game_over = true;
        self.stamina_task = None;

        info!(
            tick = self.tick,
            score = self.state.current_score,
            high_score = self.state.high_score,
            "Game over"
        );

        self.publish(GameEvent::game_over(self.tick));
        self.publish(GameEvent::game_over_player(self.tick));
        true
    }

    /// Reset the run and request a level reload.
    ///
    /// Returns false (and does nothing) while a previous restart is still
    /// waiting for its level, or when no tick has run since the level loaded.
    pub fn restart_game(&mut self) -> bool {
        match self.level_loaded_at {
            Some(loaded) if loaded != self.tick => {}
            _ => return false,
        }

        self.state.is_game_over = false;
        self.state.current_score = 0;
        self.state.stamina = MAX_STAMINA;
        self.max_reached = 0;
        self.stamina_task = None;
        self.start_y = None;
        self.level_loaded_at = None;

        info!(tick = self.tick, "Restart requested");
        self.publish(GameEvent::game_restarted(self.tick));
        true
    }

    // =========================================================================
    // SCORE
    // =========================================================================

    /// Score from the tracked player's height.
    ///
    /// Frozen when the run is over or no player is tracked.
    pub fn update_progress(&mut self, player_y: Option<Fixed>) {
        if self.state.is_game_over {
            return;
        }
        let (Some(y), Some(start)) = (player_y, self.start_y) else {
            return;
        };

        let current = fixed_floor(y.wrapping_sub(start));
        if current > self.max_reached {
            self.max_reached = current;
            self.update_score(current);
        }
    }

    /// Set the score, persisting a new high score.
    pub fn update_score(&mut self, new_score: i32) {
        self.state.current_score = new_score;
        self.publish(GameEvent::score_changed(self.tick, new_score));

        if new_score > self.state.high_score {
            self.state.high_score = new_score;
            self.store.set_int(&self.config.high_score_key, new_score);
            if let Err(err) = self.store.flush() {
                warn!(error = %err, "Failed to persist high score");
            }
        }
    }

    // =========================================================================
    // STAMINA
    // =========================================================================

    /// Advance the stamina drain by one tick.
    pub fn tick_stamina(&mut self) {
        if self.stamina_task.is_some() && self.state.is_game_over {
            self.stamina_task = None;
            return;
        }

        let Some(task) = self.stamina_task.as_mut() else {
            return;
        };

        task.elapsed += 1;
        if task.elapsed < task.interval {
            return;
        }
        task.elapsed = 0;

        self.state.stamina = (self.state.stamina - 1).max(0);
        self.publish(GameEvent::stamina_changed(self.tick, self.state.stamina));

        if self.state.stamina == 0 {
            self.stamina_task = None;
            self.game_over();
        }
    }

    /// Add stamina, clamped to `0..=MAX_STAMINA`. Always notifies.
    pub fn add_stamina(&mut self, amount: i32) {
        self.state.stamina = self.state.stamina.saturating_add(amount).clamp(0, MAX_STAMINA);
        self.publish(GameEvent::stamina_changed(self.tick, self.state.stamina));
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Current snapshot.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Has the run ended?
    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over
    }

    /// Is the stamina drain running?
    pub fn stamina_active(&self) -> bool {
        self.stamina_task.is_some()
    }

    /// Is a restart waiting for its level?
    pub fn level_pending(&self) -> bool {
        self.level_loaded_at.is_none()
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back.
    pub fn into_store(self) -> S {
        self.store
    }
}

// =============================================================================
// TESTS
// =============================================================================
