//! # almacen-core: Pure Business Logic for Almacen
//!
//! Domain types and business rules of the multi-branch ledger engine, as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Almacen Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Boundary (HTTP / auth, external)                   │   │
//! │  │        Actor + validated payload ──►  ◄── {kind, message}       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        almacen-ledger (Stock/Cash/Credit ledgers, workflows)    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ almacen-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │  money   │ │  credit  │ │ transfer │          │   │
//! │  │   │  input   │ │ quantity │ │  status  │ │  states  │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐                        │   │
//! │  │   │  rules   │ │validation│ │   ids    │                        │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘                        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 almacen-db (SQLite repositories)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities and enums (Stock, Sale, CreditAccount, Transfer, ...)
//! - [`input`] - Payloads accepted by the engine (NewSale, PaymentInput, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`quantity`] - Fixed-point stock quantities
//! - [`credit`] - Credit status derivation and payment application
//! - [`transfer`] - Transfer state machine and branch authorization
//! - [`rules`] - Unit conversion, totals, credit limit, business-day checks
//! - [`validation`] - Payload validation
//! - [`ids`] - `{PREFIX}-{millis}-{random}` identifiers
//! - [`error`] - Domain error types and the error taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use almacen_core::money::Money;
//! use almacen_core::quantity::Quantity;
//! use almacen_core::types::CreditStatus;
//!
//! // 2.5 units at $4.00
//! let line = Money::from_cents(400).multiply_quantity(Quantity::from_milli(2_500));
//! assert_eq!(line.map(|m| m.cents()), Some(1000));
//!
//! assert_eq!(CreditStatus::from_amounts(1000, 250), CreditStatus::PagadoParcial);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credit;
pub mod error;
pub mod ids;
pub mod input;
pub mod money;
pub mod quantity;
pub mod rules;
pub mod transfer;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use input::*;
pub use money::Money;
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single sale, purchase or transfer.
pub const MAX_DOCUMENT_ITEMS: usize = 200;

pub const MAX_SKU_LENGTH: usize = 50;

pub const MAX_NAME_LENGTH: usize = 200;

/// Notes, reasons and descriptions.
pub const MAX_NOTES_LENGTH: usize = 500;

/// Longest credit term a customer, supplier or the config may grant.
pub const MAX_CREDIT_DAYS: i64 = 3_650;
