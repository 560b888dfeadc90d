// src/units.rs

//! Measurement units and unit-aware rounding
//!
//! Units come in two kinds:
//! - **Discrete** (`piece`): counted items. Scaled values are rounded to whole
//!   items, except below one item where a single decimal place is kept so a
//!   small fractional count does not collapse to zero.
//! - **Continuous** (`gram`, `kilogram`, `milliliter`, `liter`): rounded to a
//!   configurable number of decimal places.
//!
//! Units are never converted into each other. Two quantities can only be
//! related when their units are identical.
//!
//! All rounding is round-half-up on the *written* decimal value of the float
//! (the shortest representation that round-trips), so `0.15` rounds to `0.2`
//! even though the nearest binary double is slightly below `0.15`.

use crate::error::Error;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of decimal places for continuous units
pub const DEFAULT_PRECISION: u32 = 3;

/// Largest precision a caller may request
pub const MAX_PRECISION: u32 = 10;

/// Whether a unit counts items or measures an amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureKind {
    Discrete,
    Continuous,
}

/// A measurement unit for yields and ingredient quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Unit {
    Piece,
    Gram,
    Kilogram,
    Milliliter,
    Liter,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Piece => "piece",
            Unit::Gram => "gram",
            Unit::Kilogram => "kilogram",
            Unit::Milliliter => "milliliter",
            Unit::Liter => "liter",
        }
    }

    pub fn kind(&self) -> MeasureKind {
        match self {
            Unit::Piece => MeasureKind::Discrete,
            Unit::Gram | Unit::Kilogram | Unit::Milliliter | Unit::Liter => {
                MeasureKind::Continuous
            }
        }
    }

    pub fn is_discrete(&self) -> bool {
        self.kind() == MeasureKind::Discrete
    }

    /// All known units, in declaration order
    pub fn all() -> [Unit; 5] {
        [
            Unit::Piece,
            Unit::Gram,
            Unit::Kilogram,
            Unit::Milliliter,
            Unit::Liter,
        ]
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "piece" | "pieces" | "pc" | "pcs" => Ok(Unit::Piece),
            "gram" | "grams" | "g" => Ok(Unit::Gram),
            "kilogram" | "kilograms" | "kg" => Ok(Unit::Kilogram),
            "milliliter" | "milliliters" | "ml" => Ok(Unit::Milliliter),
            "liter" | "liters" | "l" => Ok(Unit::Liter),
            _ => Err(Error::InvalidInput(format!("Unknown unit: {s}"))),
        }
    }
}

impl TryFrom<String> for Unit {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.as_str().to_string()
    }
}

/// Round `value` half-up to `places` decimal places
///
/// Values whose decimal form does not fit a 96-bit decimal fall back to
/// binary rounding. Past that range an `f64` carries no fractional digits,
/// so a value that would overflow the binary path is returned unchanged.
pub fn round_half_up(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let rounded = Decimal::from_str(&value.to_string())
        .ok()
        .map(|d| d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64());

    match rounded {
        Some(v) => v,
        None => {
            let factor = 10f64.powi(places as i32);
            let scaled = value * factor;
            if scaled.is_finite() {
                scaled.round() / factor
            } else {
                value
            }
        }
    }
}

/// Round a scaled quantity according to its unit
///
/// - discrete: whole items when `|value| >= 1`, otherwise one decimal place
/// - continuous: `precision` decimal places (whole units when 0)
pub fn round_quantity(value: f64, unit: Unit, precision: u32) -> f64 {
    match unit.kind() {
        MeasureKind::Discrete => {
            if value.abs() >= 1.0 {
                round_half_up(value, 0)
            } else {
                round_half_up(value, 1)
            }
        }
        MeasureKind::Continuous => round_half_up(value, precision),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_rounding_examples() {
        assert_eq!(round_quantity(1.4, Unit::Piece, 3), 1.0);
        assert_eq!(round_quantity(1.5, Unit::Piece, 3), 2.0);
        assert_eq!(round_quantity(0.14, Unit::Piece, 3), 0.1);
        assert_eq!(round_quantity(0.15, Unit::Piece, 3), 0.2);
        assert_eq!(round_quantity(2.5, Unit::Piece, 0), 3.0);
    }

    #[test]
    fn test_discrete_ignores_precision() {
        assert_eq!(round_quantity(4.1667, Unit::Piece, 5), 4.0);
        assert_eq!(round_quantity(0.04, Unit::Piece, 5), 0.0);
    }

    #[test]
    fn test_continuous_rounding() {
        assert_eq!(round_quantity(2083.333333333, Unit::Gram, 3), 2083.333);
        assert_eq!(round_quantity(2083.333333333, Unit::Gram, 0), 2083.0);
        assert_eq!(round_quantity(2.675, Unit::Liter, 2), 2.68);
        assert_eq!(round_quantity(0.0005, Unit::Kilogram, 3), 0.001);
    }

    #[test]
    fn test_rounding_is_idempotent() {
        let samples = [0.15, 1.5, 2083.3333, 0.04999, 12.3456789, 999.9995];
        for unit in Unit::all() {
            for precision in [0, 1, 3, 6] {
                for value in samples {
                    let once = round_quantity(value, unit, precision);
                    let twice = round_quantity(once, unit, precision);
                    assert_eq!(once, twice, "{value} {unit} p={precision}");
                }
            }
        }
    }

    #[test]
    fn test_huge_values_stay_finite() {
        let rounded = round_quantity(1e300, Unit::Gram, 10);
        assert!(rounded.is_finite());
        assert_eq!(rounded, 1e300);

        assert_eq!(round_quantity(-1e300, Unit::Milliliter, 10), -1e300);
        assert_eq!(round_quantity(1e300, Unit::Piece, 3), 1e300);
        assert_eq!(round_half_up(f64::MAX, 28), f64::MAX);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("piece".parse::<Unit>().unwrap(), Unit::Piece);
        assert_eq!("PCS".parse::<Unit>().unwrap(), Unit::Piece);
        assert_eq!(" g ".parse::<Unit>().unwrap(), Unit::Gram);
        assert_eq!("kg".parse::<Unit>().unwrap(), Unit::Kilogram);
        assert_eq!("ml".parse::<Unit>().unwrap(), Unit::Milliliter);
        assert_eq!("Liter".parse::<Unit>().unwrap(), Unit::Liter);
        assert!("cup".parse::<Unit>().is_err());
    }

    #[test]
    fn test_unit_kind() {
        assert!(Unit::Piece.is_discrete());
        assert!(!Unit::Gram.is_discrete());
        assert_eq!(Unit::Milliliter.kind(), MeasureKind::Continuous);
    }

    #[test]
    fn test_unit_serde_uses_canonical_names() {
        let json = serde_json::to_string(&Unit::Kilogram).unwrap();
        assert_eq!(json, "\"kilogram\"");
        let unit: Unit = serde_json::from_str("\"g\"").unwrap();
        assert_eq!(unit, Unit::Gram);
        assert!(serde_json::from_str::<Unit>("\"cup\"").is_err());
    }
}
