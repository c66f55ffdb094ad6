//! # Validation Module
//!
//! Input validation for every payload the engine accepts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Boundary (external)                                           │
//! │  └── Deserialization into the payloads in `input`                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Shape checks (non-empty, positive, lengths, formats)               │
//! │  └── Runs before a workflow touches the store                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Workflow preconditions (existence, stock, credit)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (CHECK quantity >= 0, UNIQUE, foreign keys)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use almacen_core::validation::{validate_sku, validate_payment_amount};
//!
//! validate_sku("COKE-330").unwrap();
//! assert!(validate_payment_amount(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::input::{
    NewCashMovement, NewCustomer, NewProduct, NewProductUnit, NewPurchase, NewSale, NewStock,
    NewSupplier, NewTransfer,
};
use crate::quantity::Quantity;
use crate::{
    MAX_CREDIT_DAYS, MAX_DOCUMENT_ITEMS, MAX_NAME_LENGTH, MAX_NOTES_LENGTH, MAX_SKU_LENGTH,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use almacen_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > MAX_SKU_LENGTH {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LENGTH,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (branch, product, customer, supplier, unit).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates an optional free-text field such as notes.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(text) if text.chars().count() > MAX_NOTES_LENGTH => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LENGTH,
        }),
        _ => Ok(()),
    }
}

/// Validates the reason attached to a manual stock adjustment.
///
/// Whitespace-only reasons are rejected; the trimmed reason is returned.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::required("reason"));
    }
    if reason.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_NOTES_LENGTH,
        });
    }
    Ok(reason.to_string())
}

fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantities moved by a document line must be strictly positive.
pub fn validate_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }
    Ok(())
}

/// Stock levels and thresholds may be zero but never negative.
pub fn validate_stock_level(field: &str, qty: Quantity) -> ValidationResult<()> {
    if qty.is_negative() {
        return Err(ValidationError::must_not_be_negative(field));
    }
    Ok(())
}

/// Validates a min/max threshold pair.
pub fn validate_thresholds(min_stock: Quantity, max_stock: Quantity) -> ValidationResult<()> {
    validate_stock_level("min_stock", min_stock)?;
    validate_stock_level("max_stock", max_stock)?;
    if max_stock < min_stock {
        return Err(ValidationError::Inconsistent(
            "max_stock must be greater than or equal to min_stock".to_string(),
        ));
    }
    Ok(())
}

/// Validates a price or cost in cents. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use almacen_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("unit_price", 1099).is_ok());
/// assert!(validate_price_cents("unit_price", 0).is_ok());
/// assert!(validate_price_cents("unit_price", -100).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::must_not_be_negative(field));
    }
    Ok(())
}

/// Payments and cash movements must move a positive amount.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::must_be_positive("amount"));
    }
    Ok(())
}

/// Credit terms run from zero to [`MAX_CREDIT_DAYS`].
pub fn validate_credit_days(days: Option<i64>) -> ValidationResult<()> {
    match days {
        Some(d) if d < 0 => Err(ValidationError::must_not_be_negative("credit_days")),
        Some(d) if d > MAX_CREDIT_DAYS => Err(ValidationError::out_of_range("credit_days")),
        _ => Ok(()),
    }
}

fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required("items"));
    }
    if count > MAX_DOCUMENT_ITEMS {
        return Err(ValidationError::Inconsistent(format!(
            "a document cannot have more than {} items",
            MAX_DOCUMENT_ITEMS
        )));
    }
    Ok(())
}

// =============================================================================
// Payload Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_sku(&product.sku)?;
    validate_name("name", &product.name)?;
    validate_price_cents("cost_price", product.cost_price_cents)?;
    validate_price_cents("retail_price", product.retail_price_cents)?;
    validate_price_cents("wholesale_price", product.wholesale_price_cents)?;
    Ok(())
}

pub fn validate_new_product_unit(unit: &NewProductUnit) -> ValidationResult<()> {
    validate_id("product_id", &unit.product_id)?;
    validate_name("name", &unit.name)?;
    validate_quantity("factor", unit.factor)
}

pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_name("name", &customer.name)?;
    validate_price_cents("credit_limit", customer.credit_limit_cents)?;
    validate_credit_days(customer.credit_days)
}

pub fn validate_new_supplier(supplier: &NewSupplier) -> ValidationResult<()> {
    validate_name("name", &supplier.name)?;
    validate_credit_days(supplier.credit_days)
}

pub fn validate_new_stock(stock: &NewStock) -> ValidationResult<()> {
    validate_id("product_id", &stock.product_id)?;
    validate_id("branch_id", &stock.branch_id)?;
    validate_stock_level("quantity", stock.quantity)?;
    validate_thresholds(stock.min_stock, stock.max_stock)
}

/// Validates a sale payload.
///
/// Checks only what the payload itself can tell; whether the discount fits
/// the computed subtotal is checked by [`crate::rules::document_totals`].
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    validate_id("branch_id", &sale.branch_id)?;
    validate_item_count(sale.items.len())?;
    for item in &sale.items {
        validate_id("product_id", &item.product_id)?;
        validate_quantity("quantity", item.quantity)?;
        validate_price_cents("unit_price", item.unit_price_cents)?;
    }
    validate_price_cents("discount", sale.discount_cents)?;
    validate_notes(sale.notes.as_deref())
}

pub fn validate_new_purchase(purchase: &NewPurchase) -> ValidationResult<()> {
    validate_id("branch_id", &purchase.branch_id)?;
    validate_id("supplier_id", &purchase.supplier_id)?;
    validate_item_count(purchase.items.len())?;
    for item in &purchase.items {
        validate_id("product_id", &item.product_id)?;
        validate_quantity("quantity", item.quantity)?;
        validate_price_cents("unit_cost", item.unit_cost_cents)?;
    }
    validate_notes(purchase.notes.as_deref())
}

pub fn validate_new_transfer(transfer: &NewTransfer) -> ValidationResult<()> {
    validate_id("from_branch_id", &transfer.from_branch_id)?;
    validate_id("to_branch_id", &transfer.to_branch_id)?;
    if transfer.from_branch_id == transfer.to_branch_id {
        return Err(ValidationError::Inconsistent(
            "source and destination branch must be different".to_string(),
        ));
    }
    validate_item_count(transfer.items.len())?;
    for item in &transfer.items {
        validate_id("product_id", &item.product_id)?;
        validate_quantity("quantity", item.quantity)?;
    }
    validate_notes(transfer.notes.as_deref())
}

pub fn validate_cash_movement(movement: &NewCashMovement) -> ValidationResult<()> {
    validate_id("branch_id", &movement.branch_id)?;
    validate_payment_amount(movement.amount_cents)?;
    if movement.description.trim().is_empty() {
        return Err(ValidationError::required("description"));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
