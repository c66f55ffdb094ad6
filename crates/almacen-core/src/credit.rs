//! # Credit Rules
//!
//! Pure rules for receivables (CXC) and payables (CPP).
//!
//! ## Status Machine
//! ```text
//!   paid == 0            0 < paid < total          paid == total
//! ┌───────────┐  pay   ┌────────────────┐  pay   ┌──────────┐
//! │ PENDIENTE │ ─────► │ PAGADO_PARCIAL │ ─────► │  PAGADO  │
//! └───────────┘        └────────────────┘        └──────────┘
//!       └──────────────── pay full balance ─────────────►
//! ```
//!
//! The status is never stored independently of the amounts:
//! [`CreditStatus::from_amounts`] is the one function that derives it and every
//! mutation goes through [`CreditAccount::apply_payment`].

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{CreditAccount, CreditStatus};

impl CreditStatus {
    /// Derives the status from the account's total and paid amounts.
    ///
    /// ```rust
    /// use almacen_core::types::CreditStatus;
    ///
    /// assert_eq!(CreditStatus::from_amounts(1000, 0), CreditStatus::Pendiente);
    /// assert_eq!(CreditStatus::from_amounts(1000, 400), CreditStatus::PagadoParcial);
    /// assert_eq!(CreditStatus::from_amounts(1000, 1000), CreditStatus::Pagado);
    /// ```
    pub fn from_amounts(total_cents: i64, paid_cents: i64) -> CreditStatus {
        if paid_cents <= 0 {
            CreditStatus::Pendiente
        } else if paid_cents >= total_cents {
            CreditStatus::Pagado
        } else {
            CreditStatus::PagadoParcial
        }
    }
}

impl CreditAccount {
    /// Applies a payment to the account in memory.
    ///
    /// On error the account is left untouched.
    pub fn apply_payment(&mut self, amount_cents: i64) -> CoreResult<()> {
        if amount_cents <= 0 {
            return Err(ValidationError::must_be_positive("amount").into());
        }
        if self.status == CreditStatus::Pagado {
            return Err(CoreError::AccountAlreadyPaid(self.id.clone()));
        }
        if amount_cents > self.balance_cents {
            return Err(CoreError::PaymentExceedsBalance {
                account_id: self.id.clone(),
                amount_cents,
                balance_cents: self.balance_cents,
            });
        }

        self.paid_cents += amount_cents;
        self.balance_cents = self.total_cents - self.paid_cents;
        self.status = CreditStatus::from_amounts(self.total_cents, self.paid_cents);
        Ok(())
    }

    /// Fails with `AccountHasPayments` once any payment was applied.
    pub fn ensure_no_payments(&self) -> CoreResult<()> {
        if self.paid_cents > 0 {
            return Err(CoreError::AccountHasPayments(self.id.clone()));
        }
        Ok(())
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != CreditStatus::Pagado && self.due_date < now
    }
}

/// Due date for a new account: `now + credit_days`, falling back to the
/// configured default when the counterparty has no terms of its own.
pub fn due_date(
    now: DateTime<Utc>,
    credit_days: Option<i64>,
    default_days: i64,
) -> CoreResult<DateTime<Utc>> {
    Duration::try_days(credit_days.unwrap_or(default_days))
        .and_then(|term| now.checked_add_signed(term))
        .ok_or_else(|| ValidationError::out_of_range("credit_days").into())
}
