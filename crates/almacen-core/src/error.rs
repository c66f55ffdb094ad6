//! # Error Types
//!
//! Domain-specific error types for almacen-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  almacen-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                        │
//! │  ├── ValidationError  - Malformed input caught before side effects      │
//! │  └── ErrorKind        - Stable taxonomy shown to callers                │
//! │                                                                         │
//! │  almacen-db errors                                                      │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  almacen-ledger errors                                                  │
//! │  └── LedgerError      - Core + Db + Config, rendered as {kind, message} │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, account, amounts)
//! 3. Every variant maps to exactly one [`ErrorKind`]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::quantity::Quantity;
use crate::types::TransferStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledger engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entity id does not resolve.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Requested quantity exceeds what the branch holds.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 5 × COKE at branch A
    ///      │
    ///      ▼
    /// stock(COKE, A) = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "COKE", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for product {product_id} at branch {branch_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        branch_id: String,
        available: Quantity,
        requested: Quantity,
    },

    /// A credit sale would push the customer past their limit.
    #[error("Credit limit exceeded for customer {customer_id}: available credit {available_cents}, sale total {requested_cents}")]
    CreditLimitExceeded {
        customer_id: String,
        available_cents: i64,
        requested_cents: i64,
    },

    /// A credit sale was attempted without a customer.
    #[error("A customer is required for credit sales")]
    CreditCustomerRequired,

    /// A payment larger than the outstanding balance.
    #[error("Payment of {amount_cents} exceeds the outstanding balance of {balance_cents} on account {account_id}")]
    PaymentExceedsBalance {
        account_id: String,
        amount_cents: i64,
        balance_cents: i64,
    },

    /// The account is already settled.
    #[error("Credit account {0} is already paid")]
    AccountAlreadyPaid(String),

    /// The account has payments and can no longer be removed.
    #[error("Credit account {0} has registered payments and cannot be cancelled")]
    AccountHasPayments(String),

    /// Sales can only be cancelled on the business day they were made.
    #[error("Sale {0} was not made today and can no longer be cancelled")]
    SaleNotFromToday(String),

    #[error("Sale {0} is already cancelled")]
    SaleAlreadyCancelled(String),

    #[error("Purchase {0} is already cancelled")]
    PurchaseAlreadyCancelled(String),

    /// Purchase notes/invoice can only be edited inside the edit window.
    #[error("Purchase {purchase_id} is older than {window_days} days and can no longer be edited")]
    PurchaseTooOldToEdit { purchase_id: String, window_days: i64 },

    /// The actor's branch/role does not allow this transfer step.
    #[error("User {actor_id} is not authorized to {action} transfer {transfer_id}")]
    NotAuthorizedForTransfer {
        transfer_id: String,
        actor_id: String,
        action: String,
    },

    /// The transfer is not in a state that allows the requested step.
    #[error("Transfer {transfer_id} is {current}, cannot {action}")]
    InvalidTransferState {
        transfer_id: String,
        current: TransferStatus,
        action: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the stable kind used by the boundary layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::CreditLimitExceeded { .. } => ErrorKind::CreditLimitExceeded,
            CoreError::CreditCustomerRequired => ErrorKind::CreditCustomerRequired,
            CoreError::PaymentExceedsBalance { .. } => ErrorKind::PaymentExceedsBalance,
            CoreError::AccountAlreadyPaid(_) => ErrorKind::AccountAlreadyPaid,
            CoreError::AccountHasPayments(_) => ErrorKind::AccountHasPayments,
            CoreError::SaleNotFromToday(_) => ErrorKind::SaleNotFromToday,
            CoreError::SaleAlreadyCancelled(_) => ErrorKind::SaleAlreadyCancelled,
            CoreError::PurchaseAlreadyCancelled(_) => ErrorKind::PurchaseAlreadyCancelled,
            CoreError::PurchaseTooOldToEdit { .. } => ErrorKind::PurchaseTooOldToEdit,
            CoreError::NotAuthorizedForTransfer { .. } => ErrorKind::NotAuthorizedForTransfer,
            CoreError::InvalidTransferState { .. } => ErrorKind::InvalidTransferState,
            CoreError::Validation(_) => ErrorKind::ValidationError,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any workflow touches the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Too large to book, or arithmetic on it would overflow.
    #[error("{field} is out of range")]
    OutOfRange { field: String },

    /// Invalid format (e.g., bad SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields that must differ (or relate) do not.
    #[error("{0}")]
    Inconsistent(String),
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required { field: field.into() }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive { field: field.into() }
    }

    pub fn must_not_be_negative(field: impl Into<String>) -> Self {
        ValidationError::MustNotBeNegative { field: field.into() }
    }

    pub fn out_of_range(field: impl Into<String>) -> Self {
        ValidationError::OutOfRange { field: field.into() }
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// The error taxonomy surfaced to callers as `{kind, message}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ErrorKind {
    NotFound,
    InsufficientStock,
    CreditLimitExceeded,
    CreditCustomerRequired,
    PaymentExceedsBalance,
    AccountAlreadyPaid,
    AccountHasPayments,
    SaleNotFromToday,
    SaleAlreadyCancelled,
    PurchaseAlreadyCancelled,
    PurchaseTooOldToEdit,
    NotAuthorizedForTransfer,
    InvalidTransferState,
    ValidationError,
    /// Storage, transaction or configuration failure.
    Internal,
}

impl ErrorKind {
    /// Transport status the boundary layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::ValidationError | ErrorKind::CreditCustomerRequired => 400,
            ErrorKind::NotAuthorizedForTransfer => 403,
            ErrorKind::InsufficientStock
            | ErrorKind::AccountAlreadyPaid
            | ErrorKind::AccountHasPayments
            | ErrorKind::SaleAlreadyCancelled
            | ErrorKind::PurchaseAlreadyCancelled
            | ErrorKind::InvalidTransferState => 409,
            ErrorKind::CreditLimitExceeded
            | ErrorKind::PaymentExceedsBalance
            | ErrorKind::SaleNotFromToday
            | ErrorKind::PurchaseTooOldToEdit => 422,
            ErrorKind::Internal => 500,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "PRD-1".to_string(),
            branch_id: "BR-A".to_string(),
            available: Quantity::from_units(3),
            requested: Quantity::from_units(5),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product PRD-1 at branch BR-A: available 3, requested 5"
        );

        let err = CoreError::AccountHasPayments("CRD-1".to_string());
        assert_eq!(
            err.to_string(),
            "Credit account CRD-1 has registered payments and cannot be cancelled"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("reason").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::ValidationError);
        assert_eq!(core_err.to_string(), "Validation error: reason is required");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(CoreError::not_found("Sale", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::CreditCustomerRequired.kind(),
            ErrorKind::CreditCustomerRequired
        );
        assert_eq!(
            CoreError::InvalidTransferState {
                transfer_id: "TRF-1".into(),
                current: TransferStatus::Completed,
                action: "ship".into(),
            }
            .kind(),
            ErrorKind::InvalidTransferState
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::InsufficientStock.http_status(), 409);
        assert_eq!(ErrorKind::NotAuthorizedForTransfer.http_status(), 403);
        assert_eq!(ErrorKind::CreditLimitExceeded.http_status(), 422);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
    }
}
