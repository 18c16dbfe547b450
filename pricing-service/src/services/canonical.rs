//! Conversion between human-entered values and stored canonical units.
//!
//! Staff type "10" for ten percent or "25.00" for twenty-five dollars. The
//! store keeps fractions (0.10), whole-number percentages (7.5) or integer
//! cents (2500). Every transform rounds the human value to two decimal
//! places first, so `from_canonical(to_canonical(x)) == x` at that precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::str::FromStr;

/// Canonical unit a field is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueUnit {
    /// Human percent stored as a fraction: "10" -> 0.10.
    PercentFraction,
    /// Human percent stored as-is: "7.5" -> 7.5.
    WholePercent,
    /// Human currency stored as integer cents: "25.00" -> 2500.
    Cents,
}

/// Whether a human-entered magnitude lowers or raises the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Discount,
    Premium,
}

const HUMAN_DP: u32 = 2;

fn round_human(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(HUMAN_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a human entry, tolerating a currency symbol, a percent sign and
/// thousands separators.
pub fn parse_entry(raw: &str) -> Result<Decimal, AppError> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("A value is required")));
    }
    Decimal::from_str(&cleaned)
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("'{}' is not a number", raw.trim())))
}

/// Human entry to canonical value. Zero is valid and stays zero.
pub fn to_canonical(unit: ValueUnit, raw: &str) -> Result<Decimal, AppError> {
    let human = round_human(parse_entry(raw)?);
    Ok(match unit {
        ValueUnit::PercentFraction => (human / Decimal::ONE_HUNDRED).normalize(),
        ValueUnit::WholePercent => human.normalize(),
        ValueUnit::Cents => human
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!("'{}' is out of range", raw.trim()))
            })?
            .trunc(),
    })
}

/// Human magnitude plus direction to a signed canonical value. Discounts
/// are stored negative.
pub fn to_canonical_signed(
    unit: ValueUnit,
    raw: &str,
    direction: Direction,
) -> Result<Decimal, AppError> {
    let magnitude = to_canonical(unit, raw)?;
    if magnitude.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if magnitude.is_sign_negative() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Enter a positive amount and choose discount or premium"
        )));
    }
    Ok(match direction {
        Direction::Discount => -magnitude,
        Direction::Premium => magnitude,
    })
}

/// Canonical value back to the string staff would have typed.
pub fn from_canonical(unit: ValueUnit, canonical: Decimal) -> String {
    match unit {
        // out-of-range values are rejected on write; shown unscaled if met
        ValueUnit::PercentFraction => canonical
            .checked_mul(Decimal::ONE_HUNDRED)
            .map_or(canonical, round_human)
            .normalize()
            .to_string(),
        ValueUnit::WholePercent => round_human(canonical).normalize().to_string(),
        ValueUnit::Cents => {
            let mut dollars = canonical.trunc() / Decimal::ONE_HUNDRED;
            dollars.rescale(HUMAN_DP);
            dollars.to_string()
        }
    }
}

/// Inverse of [`to_canonical_signed`]: the unsigned display string and the
/// direction it was entered with.
pub fn from_canonical_signed(unit: ValueUnit, canonical: Decimal) -> (String, Direction) {
    let direction = if canonical.is_sign_negative() && !canonical.is_zero() {
        Direction::Discount
    } else {
        Direction::Premium
    };
    (from_canonical(unit, canonical.abs()), direction)
}

/// Canonical cents as an integer, for fields stored as `i64`.
pub fn cents(canonical: Decimal) -> Result<i64, AppError> {
    use rust_decimal::prelude::ToPrimitive;
    canonical
        .trunc()
        .to_i64()
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Amount {} is out of range", canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_whole_percent_round_trip() {
        let stored = to_canonical(ValueUnit::WholePercent, "7.5").unwrap();
        assert_eq!(stored, dec("7.5"));
        assert_eq!(from_canonical(ValueUnit::WholePercent, stored), "7.5");
    }

    #[test]
    fn test_percent_fraction_round_trip() {
        for entry in ["10", "12.5", "0.25", "100", "33.33"] {
            let stored = to_canonical(ValueUnit::PercentFraction, entry).unwrap();
            assert_eq!(from_canonical(ValueUnit::PercentFraction, stored), entry);
        }
        assert_eq!(
            to_canonical(ValueUnit::PercentFraction, "10").unwrap(),
            dec("0.10")
        );
    }

    #[test]
    fn test_cents_round_trip() {
        let stored = to_canonical(ValueUnit::Cents, "$25.00").unwrap();
        assert_eq!(stored, dec("2500"));
        assert_eq!(from_canonical(ValueUnit::Cents, stored), "25.00");
        assert_eq!(to_canonical(ValueUnit::Cents, "1,234.5").unwrap(), dec("123450"));
        assert_eq!(from_canonical(ValueUnit::Cents, dec("123450")), "1234.50");
    }

    #[test]
    fn test_rounds_to_two_places() {
        assert_eq!(to_canonical(ValueUnit::Cents, "19.999").unwrap(), dec("2000"));
        assert_eq!(
            to_canonical(ValueUnit::PercentFraction, "12.345").unwrap(),
            dec("0.1235")
        );
    }

    #[test]
    fn test_discount_is_negated() {
        let stored =
            to_canonical_signed(ValueUnit::PercentFraction, "10", Direction::Discount).unwrap();
        assert_eq!(stored, dec("-0.1"));
        assert_eq!(
            from_canonical_signed(ValueUnit::PercentFraction, stored),
            ("10".to_string(), Direction::Discount)
        );
        assert!(to_canonical_signed(ValueUnit::Cents, "-5", Direction::Premium).is_err());
    }

    #[test]
    fn test_zero_is_explicit() {
        let stored = to_canonical(ValueUnit::PercentFraction, "0").unwrap();
        assert!(stored.is_zero());
        assert_eq!(from_canonical(ValueUnit::PercentFraction, stored), "0");
        let signed = to_canonical_signed(ValueUnit::Cents, "0", Direction::Discount).unwrap();
        assert!(signed.is_zero());
        assert_eq!(
            from_canonical_signed(ValueUnit::Cents, signed).1,
            Direction::Premium
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(to_canonical(ValueUnit::Cents, "abc").is_err());
        assert!(to_canonical(ValueUnit::Cents, "   ").is_err());
    }

    #[test]
    fn test_huge_amounts_do_not_panic() {
        let max = Decimal::MAX.to_string();
        assert!(matches!(
            to_canonical(ValueUnit::Cents, &max),
            Err(AppError::BadRequest(_))
        ));
        assert!(to_canonical(ValueUnit::PercentFraction, &max).is_ok());
        assert!(!from_canonical(ValueUnit::PercentFraction, Decimal::MAX).is_empty());
    }
}
