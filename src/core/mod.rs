//! Core deterministic primitives.
//!
//! Fixed-point math, vectors, randomness and state fingerprints shared by
//! every simulation module.

pub mod fixed;
pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use rng::{DeterministicRng, RandomSource};
pub use hash::{compute_state_hash, StateHash};
