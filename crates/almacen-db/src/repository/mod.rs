//! # Repository Module
//!
//! Database repository implementations for Almacen.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and connections                         │
//! │                                                                         │
//! │  Workflow (almacen-ledger)                                              │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                                │
//! │       │  db.stock().decrement(&mut tx, id, qty)                         │
//! │       │  db.cash().insert(&mut tx, &movement)                           │
//! │       ▼                                                                 │
//! │  XxxRepository (stateless)                                              │
//! │  └── every method takes `&mut SqliteConnection`                         │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  The caller decides the transaction boundary; a repository never        │
//! │  opens one itself.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`BranchRepository`] - Branches
//! - [`ProductRepository`] - Products and product units
//! - [`CustomerRepository`] - Customers and their running debt
//! - [`SupplierRepository`] - Suppliers
//! - [`StockRepository`] - Stock rows, conditional decrements, adjustment audit
//! - [`SaleRepository`] - Sales and sale items
//! - [`PurchaseRepository`] - Purchases and purchase items
//! - [`CreditRepository`] - Credit accounts and payments
//! - [`CashRepository`] - Cash journal
//! - [`TransferRepository`] - Transfers and transfer items

pub mod branch;
pub mod cash;
pub mod credit;
pub mod customer;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod stock;
pub mod supplier;
pub mod transfer;

pub use branch::BranchRepository;
pub use cash::CashRepository;
pub use credit::CreditRepository;
pub use customer::CustomerRepository;
pub use product::ProductRepository;
pub use purchase::PurchaseRepository;
pub use sale::SaleRepository;
pub use stock::StockRepository;
pub use supplier::SupplierRepository;
pub use transfer::TransferRepository;
