//! Fixed-Point 2D Vector
//!
//! Positions on the lane grid: `x` runs across a lane, `y` runs up the corridor.

use std::fmt;
use std::ops::{Add, Sub};
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, FIXED_ONE, FIXED_SCALE,
    fixed_mul, fixed_div, fixed_sqrt, fixed_lerp,
};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: FIXED_ONE, y: 0 };

    /// Unit vector pointing up (+Y)
    pub const UP: Self = Self { x: 0, y: FIXED_ONE };

    /// Unit vector pointing left (-X)
    pub const LEFT: Self = Self { x: -FIXED_ONE, y: 0 };

    /// Unit vector pointing down (-Y)
    pub const DOWN: Self = Self { x: 0, y: -FIXED_ONE };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components (cell coordinates).
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
        }
    }

    /// Add another vector, or `None` if a component overflows.
    #[inline]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(other.x)?,
            y: self.y.checked_add(other.y)?,
        })
    }

    /// Both components within `-limit..=limit`.
    #[inline]
    pub fn within(self, limit: Fixed) -> bool {
        let limit = limit.unsigned_abs();
        self.x.unsigned_abs() <= limit && self.y.unsigned_abs() <= limit
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Squared length. Prefer this for comparisons.
    #[inline]
    pub fn length_squared(self) -> Fixed {
        fixed_mul(self.x, self.x)
            .wrapping_add(fixed_mul(self.y, self.y))
    }

    /// Length (magnitude).
    #[inline]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> Fixed {
        self.sub(other).length_squared()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Normalize to unit length. Returns ZERO if length is zero.
    ///
    /// Axis-aligned vectors normalize exactly, which keeps cardinal raycasts
    /// free of rounding.
    #[inline]
    pub fn normalize(self) -> Self {
        if self.x == 0 && self.y != 0 {
            return Self::new(0, if self.y > 0 { FIXED_ONE } else { -FIXED_ONE });
        }
        if self.y == 0 && self.x != 0 {
            return Self::new(if self.x > 0 { FIXED_ONE } else { -FIXED_ONE }, 0);
        }
        let len = self.length();
        if len == 0 {
            return Self::ZERO;
        }
        Self {
            x: fixed_div(self.x, len),
            y: fixed_div(self.y, len),
        }
    }

    /// Linear interpolation. t = 0 returns self, t = FIXED_ONE returns other.
    #[inline]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: fixed_lerp(self.x, other.x, t),
            y: fixed_lerp(self.y, other.y, t),
        }
    }

    /// Convert to float tuple for logging.
    #[inline]
    pub fn to_floats(self) -> (f32, f32) {
        (
            self.x as f32 / FIXED_ONE as f32,
            self.y as f32 / FIXED_ONE as f32,
        )
    }
}

impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        FixedVec2::add(self, rhs)
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        FixedVec2::sub(self, rhs)
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "Vec2({:.3}, {:.3})", fx, fy)
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "({:.3}, {:.3})", fx, fy)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_HALF};

    #[test]
    fn test_vec2_add_sub() {
        let a = FixedVec2::from_ints(3, 4);
        let b = FixedVec2::from_ints(1, 2);
        assert_eq!(a + b, FixedVec2::from_ints(4, 6));
        assert_eq!(a - b, FixedVec2::from_ints(2, 2));
    }

    #[test]
    fn test_checked_add_and_within() {
        let top = FixedVec2::new(0, Fixed::MAX);
        assert_eq!(top.checked_add(FixedVec2::UP), None);
        assert_eq!(
            FixedVec2::from_ints(1, 2).checked_add(FixedVec2::UP),
            Some(FixedVec2::from_ints(1, 3))
        );

        let limit = FIXED_ONE * 4;
        assert!(FixedVec2::from_ints(-4, 4).within(limit));
        assert!(!FixedVec2::from_ints(0, 5).within(limit));
        assert!(!FixedVec2::new(Fixed::MIN, 0).within(limit));
    }

    #[test]
    fn test_vec2_length() {
        let v = FixedVec2::from_ints(3, 4);
        assert_eq!(v.length_squared(), to_fixed(25.0));
        assert!((v.length() - to_fixed(5.0)).abs() < 200, "Length should be ~5.0");
    }

    #[test]
    fn test_cardinal_normalize_is_exact() {
        assert_eq!(FixedVec2::from_ints(0, 7).normalize(), FixedVec2::UP);
        assert_eq!(FixedVec2::from_ints(-3, 0).normalize(), FixedVec2::LEFT);
        assert_eq!(FixedVec2::ZERO.normalize(), FixedVec2::ZERO);
    }

    #[test]
    fn test_diagonal_normalize() {
        let norm = FixedVec2::from_ints(3, 4).normalize();
        assert!((norm.length() - FIXED_ONE).abs() < 200);
    }

    #[test]
    fn test_vec2_lerp() {
        let a = FixedVec2::from_ints(0, 0);
        let b = FixedVec2::from_ints(0, 1);
        assert_eq!(a.lerp(b, FIXED_HALF), FixedVec2::new(0, FIXED_HALF));
        assert_eq!(a.lerp(b, FIXED_ONE), b);
    }
}
