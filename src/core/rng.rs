//! Deterministic Random Number Generation
//!
//! Lane types, static hazard placement and item rolls all draw from a
//! [`RandomSource`]. Sessions use the seeded [`DeterministicRng`]
//! (Xorshift128+); tests can plug in scripted sources.

use serde::{Serialize, Deserialize};

/// Source of randomness for world generation.
///
/// Only `next_u64` is required; the helpers derive everything else from it so
/// a scripted source controls every draw.
pub trait RandomSource {
    /// Next raw 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Random integer in range [0, max). Returns 0 when `max` is 0.
    fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Random integer in the inclusive range [min, max].
    fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as u32;
        min + self.next_int(range) as i32
    }

    /// Roll a percentage: true with probability `percent` / 100.
    fn roll_percent(&mut self, percent: u32) -> bool {
        self.next_int(100) < percent
    }

    /// Pick a random element from a slice.
    fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            slice.get(idx)
        }
    }
}

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// Given the same seed, produces the same sequence on every platform, which
/// is what makes gesture recordings replayable.
///
/// # Example
///
/// ```
/// use lane_runner::core::rng::{DeterministicRng, RandomSource};
///
/// let mut a = DeterministicRng::new(7);
/// let mut b = DeterministicRng::new(7);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// SplitMix64 spreads weak seeds (0, 1, 2...) across the state.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift must never see an all-zero state
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

impl RandomSource for DeterministicRng {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed list of raw values, cycling when exhausted.
    struct Scripted {
        values: Vec<u64>,
        cursor: usize,
    }

    impl RandomSource for Scripted {
        fn next_u64(&mut self) -> u64 {
            let value = self.values[self.cursor % self.values.len()];
            self.cursor += 1;
            value
        }
    }

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_int_range_inclusive() {
        let mut rng = DeterministicRng::new(5678);
        let mut seen_min = false;
        let mut seen_max = false;

        for _ in 0..5000 {
            let val = rng.next_int_range(-10, 10);
            assert!((-10..=10).contains(&val));
            seen_min |= val == -10;
            seen_max |= val == 10;
        }

        assert!(seen_min && seen_max, "both ends of the lane should be reachable");
        assert_eq!(rng.next_int_range(5, 5), 5);
    }

    #[test]
    fn test_next_int_edges() {
        let mut rng = DeterministicRng::new(1234);
        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_roll_percent_bounds() {
        let mut rng = DeterministicRng::new(99);
        for _ in 0..500 {
            assert!(!rng.roll_percent(0));
            assert!(rng.roll_percent(100));
        }
    }

    #[test]
    fn test_scripted_source_drives_helpers() {
        let mut rng = Scripted { values: vec![2, 7, 0], cursor: 0 };
        let palette = ["grass", "road", "river", "rail"];

        assert_eq!(rng.choose(&palette), Some(&"river"));
        assert_eq!(rng.next_int(5), 2);
        assert_eq!(rng.next_int_range(-10, 10), -10);
        assert!(rng.choose::<u8>(&[]).is_none());
    }

    #[test]
    fn test_state_checkpoint() {
        let mut rng = DeterministicRng::new(5555);
        for _ in 0..50 {
            rng.next_u64();
        }

        let saved_state = rng.state();
        let next_values: Vec<u64> = (0..10).map(|_| rng.next_u64()).collect();
        rng.set_state(saved_state);

        for expected in next_values {
            assert_eq!(rng.next_u64(), expected);
        }
    }
}
