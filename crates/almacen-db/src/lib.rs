//! # almacen-db: Database Layer for Almacen
//!
//! SQLite persistence for the ledger engine, with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Almacen Data Flow                                │
//! │                                                                         │
//! │  almacen-ledger workflow (create_sale, ship_transfer, ...)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    almacen-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ StockRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_initial_ │  │   │
//! │  │   │ begin/acquire │    │ CreditRepo    │    │ schema.sql   │  │   │
//! │  │   │               │    │ ...           │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table group
//!
//! ## Usage
//!
//! ```rust,ignore
//! use almacen_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("almacen.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let stock = db.stock().find_by_product_and_branch(&mut tx, "PRD-1", "BR-A").await?;
//! db.commit(tx).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    BranchRepository, CashRepository, CreditRepository, CustomerRepository, ProductRepository,
    PurchaseRepository, SaleRepository, StockRepository, SupplierRepository, TransferRepository,
};

/// Connection type every repository method runs on.
pub use sqlx::SqliteConnection;
