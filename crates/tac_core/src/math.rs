//! Fixed-point math for modifiers.
//!
//! Attack and defense bonuses, cost discounts and income multipliers are
//! percentages. They are evaluated with fixed-point arithmetic so that every
//! client computes identical damage and funds.

use fixed::types::I32F32;

/// Fixed-point number type for all rule math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// A ratio of `percent / 100`.
#[must_use]
pub fn percent(percent: i32) -> Fixed {
    Fixed::from_num(percent) / Fixed::from_num(100)
}

/// Scale an integer amount by `percent / 100`, rounding down and clamping at
/// zero.
///
/// The product is formed before the single division so that ratios like
/// 130% stay exact.
#[must_use]
pub fn scale(amount: u32, percent: i32) -> u32 {
    let numerator = i64::from(amount) * i64::from(percent);
    if numerator <= 0 {
        return 0;
    }
    let scaled = Fixed::saturating_from_num(numerator) / Fixed::from_num(100);
    scaled.floor().to_num::<u32>()
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

/// Serde support for `Option<Fixed>`.
pub mod option_fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => v.to_bits().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<i64>::deserialize(deserializer)?;
        Ok(opt.map(Fixed::from_bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_and_scale() {
        assert_eq!(scale(250, 80), 200);
        assert_eq!(scale(100, 130), 130);
        assert_eq!(scale(200, 130), 260);
        assert_eq!(scale(55, 50), 27);
        assert_eq!(scale(10, -20), 0);
        assert_eq!(percent(50), Fixed::from_num(0.5));
    }

    #[test]
    fn test_fixed_serde_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "fixed_serde")]
            value: Fixed,
        }

        let json = serde_json::to_string(&Wrapper { value: percent(30) }).unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, percent(30));
    }
}
