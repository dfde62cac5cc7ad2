//! Fixed-point math utilities for deterministic stat evaluation.
//!
//! Stat values, weights and durability all use fixed-point arithmetic so that
//! the same modifier set always folds to bit-identical results, regardless of
//! platform.

use fixed::types::{I32F32, I64F64};

/// Fixed-point number type for all item math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across save boundaries.
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

/// Serde support for fixed-point numbers written by hand in content files.
///
/// Content authors write `12.5`, not raw bits. Values are parsed as `f64`
/// once at load time and converted; nothing downstream touches floats.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize as a decimal number.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize from a decimal number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("value {value} out of fixed range")))
    }
}

/// Multiply a per-unit fixed value by a count, saturating on overflow.
///
/// The product is taken in a wider type, since counts above `i32::MAX` do
/// not fit in [`Fixed`] themselves.
#[must_use]
pub fn scale(value: Fixed, count: u32) -> Fixed {
    let product = I64F64::from_num(value).saturating_mul(I64F64::from_num(count));
    Fixed::saturating_from_num(product)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);

        let result1 = a * Fixed::from_num(7);
        let result2 = b * Fixed::from_num(7);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_scale_saturates() {
        assert_eq!(scale(Fixed::from_num(2), 3), Fixed::from_num(6));
        assert_eq!(scale(Fixed::MAX, 2), Fixed::MAX);
        assert_eq!(scale(Fixed::from_num(-1), u32::MAX), Fixed::MIN);
    }

    #[test]
    fn test_scale_counts_beyond_i32() {
        assert_eq!(scale(Fixed::from_num(0.5), 3_000_000_000), Fixed::from_num(1_500_000_000));
        assert_eq!(scale(Fixed::from_num(2), u32::MAX), Fixed::MAX);
        assert_eq!(scale(Fixed::ZERO, u32::MAX), Fixed::ZERO);
    }

    #[test]
    fn test_decimal_roundtrip_through_ron() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper(#[serde(with = "fixed_decimal")] Fixed);

        let parsed: Wrapper = ron::from_str("(12.5)").expect("parse");
        assert_eq!(parsed.0, Fixed::from_num(12.5));
    }
}
