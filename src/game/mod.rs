//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `state`: Entity ids, directions, lane and entity kinds
//! - `world`: Entity store, colliders, overlap and ray queries
//! - `probe`: Step validation and trigger-enter contacts
//! - `input`: Gesture classification, pointer tracking, recordings
//! - `movement`: Gesture-driven grid movement
//! - `obstacle`: Moving hazard motion and expiry
//! - `spawner`: Per-lane hazard and pickup spawning
//! - `streamer`: Lane window around the player
//! - `coordinator`: Score, stamina, game over and restart
//! - `events`: Notifications and observer registry
//! - `storage`: High score persistence
//! - `tick`: Session loop and replay

pub mod state;
pub mod world;
pub mod probe;
pub mod input;
pub mod movement;
pub mod obstacle;
pub mod spawner;
pub mod streamer;
pub mod coordinator;
pub mod events;
pub mod storage;
pub mod tick;

// Re-export key types
pub use state::{Direction, EntityId, EntityKind, LaneType};
pub use events::{EventKind, GameEvent, GameEventData, Subscription};
pub use coordinator::{GameCoordinator, GameState, MAX_STAMINA};
pub use movement::{MoveOutcome, PlayerMovementController};
pub use tick::{Session, SessionConfig, TickResult, replay_session};
