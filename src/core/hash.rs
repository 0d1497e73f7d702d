//! State Fingerprints
//!
//! SHA-256 over the simulation state, used to check that a replayed gesture
//! recording reproduces the original run exactly.

use sha2::{Sha256, Digest};
use super::fixed::Fixed;
use super::vec2::FixedVec2;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for session state. Update order is significant.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for session state.
    pub fn for_session_state() -> Self {
        Self::new(b"LANE_RUNNER_STATE_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a Fixed value.
    #[inline]
    pub fn update_fixed(&mut self, value: Fixed) {
        self.update_i32(value);
    }

    /// Update with a FixedVec2.
    #[inline]
    pub fn update_vec2(&mut self, value: FixedVec2) {
        self.update_fixed(value.x);
        self.update_fixed(value.y);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Length prefix for a variable-length section, so adjacent sections
    /// cannot shift into each other.
    #[inline]
    pub fn update_len(&mut self, len: usize) {
        self.update_u64(len as u64);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a session fingerprint.
///
/// Tick and seed always go first; `add_state` appends the rest.
pub fn compute_state_hash<F>(tick: u32, seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_session_state();
    hasher.update_u32(tick);
    hasher.update_u64(seed);
    add_state(&mut hasher);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_session_state();
            hasher.update_u32(100);
            hasher.update_fixed(to_fixed(5.5));
            hasher.update_vec2(FixedVec2::from_ints(1, 2));
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_compute_state_hash_includes_tick() {
        let hash = compute_state_hash(100, 12345, |hasher| hasher.update_i32(7));
        let same = compute_state_hash(100, 12345, |hasher| hasher.update_i32(7));
        let later = compute_state_hash(101, 12345, |hasher| hasher.update_i32(7));

        assert_eq!(hash, same);
        assert_ne!(hash, later);
    }

    #[test]
    fn test_length_prefix_separates_sections() {
        let split = |first: &[i32], second: &[i32]| {
            let mut h = StateHasher::for_session_state();
            for section in [first, second] {
                h.update_len(section.len());
                section.iter().for_each(|v| h.update_i32(*v));
            }
            h.finalize()
        };

        assert_ne!(split(&[1, 2], &[3]), split(&[1], &[2, 3]));
    }
}
