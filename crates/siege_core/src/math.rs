//! Fixed-point math utilities for deterministic simulation.
//!
//! All battle geometry uses fixed-point arithmetic so that two runs with
//! the same layout and army produce bit-identical results on every
//! platform. Floating-point values only appear at IO boundaries (layout
//! and army files, statistics export).

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// √2 in fixed-point, the cost of a diagonal grid step.
pub const SQRT_2: Fixed = Fixed::from_bits(6_074_001_000);

/// One half.
pub const HALF: Fixed = Fixed::from_bits(1 << 31);

/// Tolerance used when comparing squared distances against squared ranges.
///
/// Five LSBs, roughly 1.2e-9.
pub const RANGE_EPSILON: Fixed = Fixed::from_bits(5);

/// Fixed-point 2D vector.
///
/// Ordering is lexicographic on `(x, y)`, which gives sampled point sets a
/// stable iteration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-edited fixed-point values.
///
/// Data tables are written by hand, so ranges and speeds are stored as
/// decimals (`range: 3.5`) and converted on load.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("value {value} out of range")))
    }
}

/// Serde support for optional human-edited fixed-point values.
pub mod option_fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number as a decimal.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(|v| v.to_num::<f64>()).serialize(serializer)
    }

    /// Deserialize an optional fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<f64>::deserialize(deserializer)? {
            Some(value) => Fixed::checked_from_num(value)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("value {value} out of range"))),
            None => Ok(None),
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Build a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Build a vector from boundary-format floats.
    ///
    /// Values outside the fixed-point range saturate.
    #[must_use]
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(Fixed::saturating_from_num(x), Fixed::saturating_from_num(y))
    }

    /// Convert to floats for presentation and export.
    #[must_use]
    pub fn to_f64(self) -> (f64, f64) {
        (self.x.to_num(), self.y.to_num())
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Step from `self` towards `target` by at most `max_step`.
    ///
    /// Lands exactly on `target` when it is within reach.
    #[must_use]
    pub fn step_towards(self, target: Self, max_step: Fixed) -> Self {
        let offset = target - self;
        let distance = offset.length();
        if distance <= max_step || distance == Fixed::ZERO {
            return target;
        }
        Self::new(
            self.x + offset.x * max_step / distance,
            self.y + offset.y * max_step / distance,
        )
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Runs 64 bisection steps, enough to settle every fractional bit.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Axis-aligned rectangle in world units, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Lower corner.
    pub min: Vec2Fixed,
    /// Upper corner.
    pub max: Vec2Fixed,
}

impl Rect {
    /// Create a rectangle from its corners.
    #[must_use]
    pub const fn new(min: Vec2Fixed, max: Vec2Fixed) -> Self {
        Self { min, max }
    }

    /// Grow the rectangle by `margin` on every side.
    #[must_use]
    pub fn expand(self, margin: Fixed) -> Self {
        Self {
            min: Vec2Fixed::new(self.min.x - margin, self.min.y - margin),
            max: Vec2Fixed::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Point of the rectangle closest to `point` (the point itself if inside).
    #[must_use]
    pub fn closest_point(self, point: Vec2Fixed) -> Vec2Fixed {
        Vec2Fixed::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    /// Squared distance from `point` to the rectangle edge (zero inside).
    #[must_use]
    pub fn distance_squared_to(self, point: Vec2Fixed) -> Fixed {
        point.distance_squared(self.closest_point(point))
    }

    /// Whether `point` lies within `range` of the rectangle.
    ///
    /// Compares squared distances with [`RANGE_EPSILON`] slack.
    #[must_use]
    pub fn within_range(self, point: Vec2Fixed, range: Fixed) -> bool {
        self.distance_squared_to(point) <= range * range + RANGE_EPSILON
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
