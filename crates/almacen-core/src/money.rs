//! # Money
//!
//! Amounts are whole minor units (centavos) in an `i64`. Totals, balances,
//! debt and cash never touch floating point, so `balance == total - paid`
//! holds exactly and ledger sums compare with `==`.
//!
//! ```text
//! unit_price × quantity ─► line subtotal ─► Σ − discount ─► document total
//!                                                             │
//!                          CASH  ─► CashMovement.amount ◄─────┤
//!                          CREDIT ─► CreditAccount.total ◄────┘
//!                                         └─► Customer.current_debt (CXC)
//! ```
//!
//! ```rust
//! use almacen_core::money::Money;
//! use almacen_core::quantity::Quantity;
//!
//! let line = Money::from_cents(1_850).multiply_quantity(Quantity::from_units(3));
//! assert_eq!(line, Some(Money::from_cents(5_550)));
//! ```

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::quantity::{Quantity, MILLI_PER_UNIT};

/// Signed, so debt adjustments and compensating entries can be negative
/// deltas.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
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

    /// Price × (possibly fractional) quantity, rounded half away from zero
    /// to the centavo. Computed in i128; `None` when the result does not
    /// fit back into an `i64`.
    ///
    /// ```rust
    /// use almacen_core::money::Money;
    /// use almacen_core::quantity::Quantity;
    ///
    /// // 2.5 L at 39.90
    /// let line = Money::from_cents(3_990).multiply_quantity(Quantity::from_milli(2_500));
    /// assert_eq!(line, Some(Money::from_cents(9_975)));
    /// ```
    pub fn multiply_quantity(&self, qty: Quantity) -> Option<Money> {
        let scale = i128::from(MILLI_PER_UNIT);
        let raw = i128::from(self.0) * i128::from(qty.milli());
        let half = scale / 2;
        let rounded = if raw >= 0 {
            (raw + half) / scale
        } else {
            (raw - half) / scale
        };
        i64::try_from(rounded).ok().map(Money)
    }

    #[inline]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

/// `$1234.50` style, for logs and error messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}
