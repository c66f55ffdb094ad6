//! # Business Rules
//!
//! Calculations and checks the sale and purchase workflows run before they
//! write anything.
//!
//! ```text
//! NewSaleItem ──base_quantity──► Quantity (base unit)
//!      │                              │
//!      │                              ▼
//!      │                    requirements_by_product ──► check_available
//!      ▼
//! line_subtotal ──► document_totals ──► check_credit_limit (CREDIT only)
//! ```

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Customer, ProductUnit};

// =============================================================================
// Quantities
// =============================================================================

/// Converts a line quantity into base units.
///
/// With no unit the quantity is already in base units. A unit that belongs
/// to another product is a validation error.
pub fn base_quantity(
    product_id: &str,
    quantity: Quantity,
    unit: Option<&ProductUnit>,
) -> CoreResult<Quantity> {
    match unit {
        None => Ok(quantity),
        Some(unit) if unit.product_id != product_id => Err(ValidationError::Inconsistent(
            format!("unit {} does not belong to product {}", unit.id, product_id),
        )
        .into()),
        Some(unit) => quantity
            .scale_by(unit.factor)
            .ok_or_else(|| ValidationError::out_of_range("quantity").into()),
    }
}

/// Sums base quantities per product, keeping first-seen order.
///
/// Two lines of the same product must be checked against stock together.
pub fn requirements_by_product<'a, I>(lines: I) -> CoreResult<Vec<(String, Quantity)>>
where
    I: IntoIterator<Item = (&'a str, Quantity)>,
{
    let mut totals: Vec<(String, Quantity)> = Vec::new();
    for (product_id, qty) in lines {
        match totals.iter_mut().find(|(id, _)| id == product_id) {
            Some((_, total)) => {
                *total = total
                    .checked_add(qty)
                    .ok_or_else(|| ValidationError::out_of_range("quantity"))?;
            }
            None => totals.push((product_id.to_string(), qty)),
        }
    }
    Ok(totals)
}

/// Fails with `InsufficientStock` when `available < requested`.
pub fn check_available(
    product_id: &str,
    branch_id: &str,
    available: Quantity,
    requested: Quantity,
) -> CoreResult<()> {
    if available < requested {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            branch_id: branch_id.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Money
// =============================================================================

/// `unit_price × quantity`, rounded to the minor unit.
pub fn line_subtotal(unit_price_cents: i64, quantity: Quantity) -> CoreResult<Money> {
    Money::from_cents(unit_price_cents)
        .multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::out_of_range("subtotal").into())
}

/// Document subtotal and total after discount.
///
/// The discount cannot exceed the subtotal.
pub fn document_totals<I>(line_subtotals: I, discount: Money) -> CoreResult<(Money, Money)>
where
    I: IntoIterator<Item = Money>,
{
    let subtotal = line_subtotals
        .into_iter()
        .try_fold(Money::zero(), Money::checked_add)
        .ok_or_else(|| ValidationError::out_of_range("subtotal"))?;
    if discount.is_negative() {
        return Err(ValidationError::must_not_be_negative("discount").into());
    }
    if discount > subtotal {
        return Err(ValidationError::Inconsistent(format!(
            "discount {} exceeds subtotal {}",
            discount, subtotal
        ))
        .into());
    }
    Ok((subtotal, subtotal - discount))
}

/// Rejects a credit sale that would take the customer past their limit.
///
/// ## Example
/// ```text
/// limit 5000, debt 4500 ─► available 500
///   sale 600 ─► CreditLimitExceeded
///   sale 500 ─► ok (debt becomes exactly the limit)
/// ```
pub fn check_credit_limit(customer: &Customer, total: Money) -> CoreResult<()> {
    let available = customer.available_credit();
    if total > available {
        return Err(CoreError::CreditLimitExceeded {
            customer_id: customer.id.clone(),
            available_cents: available.cents(),
            requested_cents: total.cents(),
        });
    }
    Ok(())
}

// =============================================================================
// Dates
// =============================================================================

/// True when both instants fall on the same calendar day in `tz`.
pub fn is_same_business_day(created_at: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> bool {
    created_at.with_timezone(&tz).date_naive() == now.with_timezone(&tz).date_naive()
}

/// True while `now` is within `window_days` of `created_at`.
pub fn within_edit_window(created_at: DateTime<Utc>, now: DateTime<Utc>, window_days: i64) -> bool {
    now - created_at <= Duration::days(window_days)
}

// =============================================================================
// Unit Tests
// =============================================================================
