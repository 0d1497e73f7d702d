//! # Lane Runner
//!
//! Deterministic simulation core for an endless lane-crossing runner: the
//! player hops cell by cell up a corridor of grass, road, river and rail
//! lanes while stamina drains and traffic streams past.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        LANE RUNNER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Seeded Xorshift128+ behind RandomSource   │
//! │  └── hash.rs     - State fingerprints for replay checks      │
//! │                                                              │
//! │  game/           - Simulation (deterministic)                │
//! │  ├── state.rs    - Ids, directions, lane and entity kinds    │
//! │  ├── world.rs    - Entity store and spatial queries          │
//! │  ├── probe.rs    - Step validation and contact tracking      │
//! │  ├── input.rs    - Gesture classification and recordings     │
//! │  ├── movement.rs - Turn-then-step grid controller            │
//! │  ├── obstacle.rs - Moving hazard translation and expiry      │
//! │  ├── spawner.rs  - Per-lane hazard and pickup spawning       │
//! │  ├── streamer.rs - Sliding lane window                       │
//! │  ├── coordinator.rs - Score, stamina, game over, restart     │
//! │  ├── events.rs   - Notifications and observer registry       │
//! │  ├── storage.rs  - High score persistence                    │
//! │  └── tick.rs     - Session loop and replay                   │
//! │                                                              │
//! │  config.rs       - JSON settings compiled to runtime config  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Everything under `core/` and `game/` is deterministic:
//! - No floating-point arithmetic in the tick loop
//! - No HashMap (BTreeMap for sorted iteration)
//! - Time is counted in ticks, never read from a clock
//! - All randomness from a seeded Xorshift128+
//!
//! Positions are Q16.16, so the corridor is bounded: the player cannot step
//! past `core::fixed::POSITION_LIMIT_UNITS` rows from the origin, and the
//! streamed lane span on either side is capped in configuration so lanes
//! near that edge stay representable.
//!
//! A seed plus an [`InputRecording`] reproduces a run bit for bit.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod config;
pub mod game;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::{DeterministicRng, RandomSource};
pub use config::{ConfigError, GameConfig};
pub use game::input::{Gesture, InputRecording, PlayerInput};
pub use game::storage::{JsonFileStore, MemoryStore, ScoreStore};
pub use game::tick::{Session, SessionConfig, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
