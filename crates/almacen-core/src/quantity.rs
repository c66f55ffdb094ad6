//! # Quantity Module
//!
//! Fixed-point stock quantities.
//!
//! Stock is counted in the product's base unit, but a sale can be made in a
//! different unit (half-litre bottles, boxes of 12). Quantities are therefore
//! fractional, and comparing fractional floats against a stock row is exactly
//! how `available 3.0000000001 < requested 3` bugs are born. `Quantity` stores
//! thousandths of a base unit in an `i64` so every stock check and mutation is
//! integer arithmetic, the same way [`Money`](crate::money::Money) stores cents.
//!
//! ```text
//! 1      unit  → Quantity(1_000)
//! 0.5    unit  → Quantity(500)
//! 12.125 units → Quantity(12_125)
//! ```
//!
//! On the wire a quantity is a plain JSON number (`2.5`), rounded to the
//! nearest thousandth when deserialized.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Number of stored steps per whole unit.
pub const MILLI_PER_UNIT: i64 = 1_000;

/// A quantity with three decimal places, stored as thousandths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from thousandths of a unit.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from whole units.
    ///
    /// ```rust
    /// use almacen_core::quantity::Quantity;
    ///
    /// assert_eq!(Quantity::from_units(3).milli(), 3_000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    /// Converts a decimal number, rounding to the nearest thousandth.
    ///
    /// Only used at the serialization boundary.
    pub fn from_decimal(value: f64) -> Self {
        Quantity((value * MILLI_PER_UNIT as f64).round() as i64)
    }

    /// Returns the raw number of thousandths.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal number (display and serialization only).
    #[inline]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / MILLI_PER_UNIT as f64
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Converts a quantity expressed in some unit into base units.
    ///
    /// `factor` is how many base units one of the selling unit holds.
    /// The product is rounded half up to the nearest thousandth; `None`
    /// when it does not fit in an `i64`.
    ///
    /// ```rust
    /// use almacen_core::quantity::Quantity;
    ///
    /// // 3 half-litre bottles = 1.5 litres
    /// let base = Quantity::from_units(3).scale_by(Quantity::from_milli(500));
    /// assert_eq!(base, Some(Quantity::from_milli(1_500)));
    /// ```
    pub fn scale_by(&self, factor: Quantity) -> Option<Quantity> {
        let scale = i128::from(MILLI_PER_UNIT);
        let raw = i128::from(self.0) * i128::from(factor.0);
        let half = scale / 2;
        let rounded = if raw >= 0 {
            (raw + half) / scale
        } else {
            (raw - half) / scale
        };
        i64::try_from(rounded).ok().map(Quantity)
    }

    #[inline]
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / MILLI_PER_UNIT;
        let frac = abs % MILLI_PER_UNIT;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:03}", frac);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom("quantity must be a finite number"));
        }
        Ok(Quantity::from_decimal(value))
    }
}
