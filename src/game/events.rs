//! Game Events
//!
//! Notifications published by the coordinator, and the observer registry
//! that delivers them.
//!
//! Delivery is synchronous: every handler subscribed to an event's kind runs
//! before `publish` returns, in subscription order. The same events are also
//! queued on the coordinator's outbox so the session can hand them back in
//! its `TickResult`.

use std::fmt;

use serde::{Serialize, Deserialize};

// =============================================================================
// EVENT DATA
// =============================================================================

/// Notification payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Stamina changed; carries the new value
    StaminaChanged(i32),
    /// Score changed; carries the new value
    ScoreChanged(i32),
    /// Run ended. Always followed by `GameOverPlayer`.
    GameOver,
    /// Player-facing teardown signal, published after `GameOver`
    GameOverPlayer,
    /// A restart was accepted and the level is about to reload
    GameRestarted,
}

/// Subscription key for a notification kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    /// `GameEventData::StaminaChanged`
    StaminaChanged = 0,
    /// `GameEventData::ScoreChanged`
    ScoreChanged = 1,
    /// `GameEventData::GameOver`
    GameOver = 2,
    /// `GameEventData::GameOverPlayer`
    GameOverPlayer = 3,
    /// `GameEventData::GameRestarted`
    GameRestarted = 4,
}

impl GameEventData {
    /// Kind used for routing to subscribers.
    pub fn kind(&self) -> EventKind {
        match self {
            GameEventData::StaminaChanged(_) => EventKind::StaminaChanged,
            GameEventData::ScoreChanged(_) => EventKind::ScoreChanged,
            GameEventData::GameOver => EventKind::GameOver,
            GameEventData::GameOverPlayer => EventKind::GameOverPlayer,
            GameEventData::GameRestarted => EventKind::GameRestarted,
        }
    }
}

/// A notification stamped with the tick it was published on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when the event occurred
    pub tick: u32,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Create stamina changed event.
    pub fn stamina_changed(tick: u32, stamina: i32) -> Self {
        Self::new(tick, GameEventData::StaminaChanged(stamina))
    }

    /// Create score changed event.
    pub fn score_changed(tick: u32, score: i32) -> Self {
        Self::new(tick, GameEventData::ScoreChanged(score))
    }

    /// Create game over event.
    pub fn game_over(tick: u32) -> Self {
        Self::new(tick, GameEventData::GameOver)
    }

    /// Create player teardown event.
    pub fn game_over_player(tick: u32) -> Self {
        Self::new(tick, GameEventData::GameOverPlayer)
    }

    /// Create restart event.
    pub fn game_restarted(tick: u32) -> Self {
        Self::new(tick, GameEventData::GameRestarted)
    }

    /// Routing kind of the payload.
    #[inline]
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }
}

// =============================================================================
// OBSERVER REGISTRY
// =============================================================================

/// Observer callback.
pub type EventHandler = Box<dyn FnMut(&GameEvent)>;

/// Proof of a live subscription.
///
/// Deliberately not `Clone`: handing the token back to
/// [`EventBus::unsubscribe`] consumes it, so a handler can only be removed
/// once.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
    kind: EventKind,
}

impl Subscription {
    /// Kind this subscription listens to.
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

struct Registered {
    id: u64,
    kind: EventKind,
    handler: EventHandler,
}

/// Observer registry keyed by [`EventKind`].
pub struct EventBus {
    next_id: u64,
    handlers: Vec<Registered>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            handlers: Vec::new(),
        }
    }

    /// Register `handler` for every event of `kind`.
    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.push(Registered { id, kind, handler });
        Subscription { id, kind }
    }

    /// Remove a handler. Returns false when the token is not registered here.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.handlers.len();
        self.handlers
            .retain(|entry| !(entry.id == subscription.id && entry.kind == subscription.kind));
        self.handlers.len() != before
    }

    /// Deliver `event` to its subscribers, in subscription order.
    pub fn dispatch(&mut self, event: &GameEvent) {
        let kind = event.kind();
        for entry in self.handlers.iter_mut().filter(|entry| entry.kind == kind) {
            (entry.handler)(event);
        }
    }

    /// Number of live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.iter().filter(|entry| entry.kind == kind).count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id)
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
