//! Q16.16 Fixed-Point Arithmetic
//!
//! Every position, velocity and distance in the lane simulation is a Q16.16
//! fixed-point number. Integer arithmetic keeps replays bit-identical across
//! platforms; floats only appear at the configuration boundary and in logs.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! One world unit is one grid cell, so a run of 30k lanes still fits.

use crate::TICK_RATE;

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

/// Tick duration: 1/60 second = round(65536/60) = 1092
pub const TICK_DURATION: Fixed = 1092;

// =============================================================================
// CONVERSIONS
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Example
/// ```
/// use lane_runner::core::fixed::{to_fixed, FIXED_ONE};
/// const STEP: i32 = to_fixed(2.5);
/// assert_eq!(STEP, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float. Display and logging only.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Largest |coordinate| a player may step to, in world units.
///
/// Half the Q16.16 range; the rest is headroom for lanes streamed ahead of
/// and behind the player.
pub const POSITION_LIMIT_UNITS: i32 = 16384;

/// [`POSITION_LIMIT_UNITS`] in fixed point.
pub const POSITION_LIMIT: Fixed = POSITION_LIMIT_UNITS << FIXED_SCALE;

/// Integer to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Floor to the nearest integer at or below `x`.
///
/// Arithmetic shift rounds toward negative infinity, which is exactly the
/// lane-index semantics (`y = -0.25` is lane -1, not lane 0).
#[inline]
pub const fn fixed_floor(x: Fixed) -> i32 {
    x >> FIXED_SCALE
}

/// Convert a duration in seconds to a whole number of ticks (at least one).
///
/// Only called while compiling configuration, never from the tick loop.
pub fn secs_to_ticks(secs: f64) -> u32 {
    let ticks = (secs * TICK_RATE as f64).round();
    if ticks < 1.0 {
        1
    } else {
        ticks as u32
    }
}

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Multiply two fixed-point numbers through an i64 intermediate.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers. Divide-by-zero returns 0.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square root using a fixed 6 iterations of Newton-Raphson.
///
/// Returns 0 for non-positive inputs.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }

    let mut guess = (x >> 1).max(1);
    for _ in 0..6 {
        let div = fixed_div(x, guess);
        guess = (guess.wrapping_add(div)) >> 1;
        if guess == 0 {
            guess = 1;
        }
    }

    guess
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    value.max(min).min(max)
}

/// Linear interpolation: a + (b - a) * t, with t in [0, FIXED_ONE].
#[inline]
pub fn fixed_lerp(a: Fixed, b: Fixed, t: Fixed) -> Fixed {
    let diff = b.wrapping_sub(a);
    a.wrapping_add(fixed_mul(diff, t))
}

/// Progress fraction `elapsed / total` as fixed-point, saturating at 1.0.
#[inline]
pub fn tick_fraction(elapsed: u32, total: u32) -> Fixed {
    if total == 0 || elapsed >= total {
        return FIXED_ONE;
    }
    ((elapsed as i64 * FIXED_ONE as i64) / total as i64) as Fixed
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(TICK_DURATION, 1092);
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(1.0), FIXED_ONE);
        assert_eq!(to_fixed(0.5), FIXED_HALF);
        assert_eq!(to_fixed(-1.0), -FIXED_ONE);
        assert_eq!(from_int(-3), to_fixed(-3.0));
    }

    #[test]
    fn test_fixed_floor_rounds_down() {
        assert_eq!(fixed_floor(to_fixed(2.75)), 2);
        assert_eq!(fixed_floor(from_int(3)), 3);
        assert_eq!(fixed_floor(to_fixed(-0.25)), -1);
        assert_eq!(fixed_floor(from_int(-5)), -5);
        assert_eq!(fixed_floor(0), 0);
    }

    #[test]
    fn test_fixed_mul_div() {
        assert_eq!(fixed_mul(to_fixed(2.0), to_fixed(3.0)), to_fixed(6.0));
        assert_eq!(fixed_mul(to_fixed(-2.0), to_fixed(3.0)), to_fixed(-6.0));
        assert_eq!(fixed_div(to_fixed(6.0), to_fixed(2.0)), to_fixed(3.0));
        assert_eq!(fixed_div(FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_fixed_sqrt() {
        let result = fixed_sqrt(to_fixed(4.0));
        assert!((result - to_fixed(2.0)).abs() < 100);
        assert_eq!(fixed_sqrt(0), 0);
        assert_eq!(fixed_sqrt(-FIXED_ONE), 0);
    }

    #[test]
    fn test_secs_to_ticks() {
        assert_eq!(secs_to_ticks(1.0), 60);
        assert_eq!(secs_to_ticks(0.1), 6);
        assert_eq!(secs_to_ticks(2.0), 120);
        // Never zero, so a scheduled task always makes progress
        assert_eq!(secs_to_ticks(0.0), 1);
    }

    #[test]
    fn test_tick_fraction() {
        assert_eq!(tick_fraction(0, 6), 0);
        assert_eq!(tick_fraction(3, 6), FIXED_HALF);
        assert_eq!(tick_fraction(6, 6), FIXED_ONE);
        assert_eq!(tick_fraction(9, 6), FIXED_ONE);
        assert_eq!(tick_fraction(1, 0), FIXED_ONE);
    }

    #[test]
    fn test_fixed_lerp() {
        assert_eq!(fixed_lerp(0, from_int(4), FIXED_HALF), from_int(2));
        assert_eq!(fixed_lerp(from_int(1), from_int(2), FIXED_ONE), from_int(2));
    }
}
