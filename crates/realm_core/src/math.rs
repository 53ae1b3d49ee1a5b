//! Fixed-point math utilities for deterministic simulation.
//!
//! Stocks, capacities, modifiers and damage multipliers all use
//! fixed-point arithmetic so that two runs from the same seed produce
//! byte-identical snapshots on any platform.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Lowest effective scale a stack of negative modifiers can reach.
pub const MIN_SCALE_PERCENT: i32 = 10;

/// `100 + bonus`, floored at [`MIN_SCALE_PERCENT`].
#[must_use]
pub const fn scale_percent(bonus: i32) -> i32 {
    let scale = 100 + bonus;
    if scale < MIN_SCALE_PERCENT {
        MIN_SCALE_PERCENT
    } else {
        scale
    }
}

/// `value × (1 + bonus%)`, exact for whole-percent results.
#[must_use]
pub fn apply_percent(value: Fixed, bonus: i32) -> Fixed {
    value.saturating_mul(Fixed::from_num(scale_percent(bonus))) / Fixed::from_num(100)
}

/// `numerator / denominator` as a probability.
#[must_use]
pub fn ratio(numerator: u32, denominator: u32) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Truncate a non-negative fixed value to `u32`, saturating at the ends.
#[must_use]
pub fn floor_u32(value: Fixed) -> u32 {
    if value <= Fixed::ZERO {
        0
    } else {
        value.floor().saturating_to_num::<u32>()
    }
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

/// Serde support for ordered maps with fixed-point values.
pub mod fixed_map_serde {
    use std::collections::BTreeMap;

    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize every value as its raw bit representation.
    pub fn serialize<S, K>(map: &BTreeMap<K, Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize + Ord,
    {
        serializer.collect_map(map.iter().map(|(key, value)| (key, value.to_bits())))
    }

    /// Deserialize a map of raw bit representations.
    pub fn deserialize<'de, D, K>(deserializer: D) -> Result<BTreeMap<K, Fixed>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de> + Ord,
    {
        let raw = BTreeMap::<K, i64>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(key, bits)| (key, Fixed::from_bits(bits)))
            .collect())
    }
}
