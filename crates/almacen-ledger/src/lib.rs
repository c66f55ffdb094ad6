//! # almacen-ledger: Ledger Consistency Engine
//!
//! Applies business events (sales, purchases, credit payments, transfers)
//! so that per-branch stock, credit accounts, customer debt and the cash
//! journal stay consistent with each other.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Ledger                                        │
//! │                                                                         │
//! │   sales()          purchases()          transfers()                     │
//! │  ┌─────────────┐  ┌────────────────┐  ┌──────────────────┐              │
//! │  │SaleWorkflow │  │PurchaseWorkflow│  │ TransferWorkflow │              │
//! │  └──────┬──────┘  └───────┬────────┘  └────────┬─────────┘              │
//! │         │   one transaction per operation      │                        │
//! │  ┌──────▼─────────────────▼────────────────────▼─────────┐              │
//! │  │ StockLedger  CashLedger  CreditLedger  DebtTracker    │              │
//! │  └──────────────────────────┬────────────────────────────┘              │
//! │                             │                                           │
//! │                     Database (almacen-db)                               │
//! │                                                                         │
//! │  catalog(): branches, products, units, customers, suppliers             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use almacen_ledger::{Ledger, LedgerConfig};
//!
//! let ledger = Ledger::open(LedgerConfig::load_or_default(None)).await?;
//! let sale = ledger.sales().create_sale(&actor, new_sale).await?;
//! ```
//!
//! Failures are `LedgerError`s; convert them into [`ErrorResponse`] to hand
//! a `{kind, message}` pair to a caller.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cash;
pub mod catalog;
pub mod config;
pub mod credit;
pub mod debt;
pub mod error;
pub mod purchase;
pub mod sale;
pub mod stock;
pub mod telemetry;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use cash::CashLedger;
pub use catalog::Catalog;
pub use config::LedgerConfig;
pub use credit::{CreditLedger, RegisteredPayment};
pub use debt::DebtTracker;
pub use error::{ErrorResponse, LedgerError, LedgerResult};
pub use purchase::PurchaseWorkflow;
pub use sale::SaleWorkflow;
pub use stock::StockLedger;
pub use transfer::TransferWorkflow;

use std::sync::Arc;

use tracing::info;

use almacen_db::Database;

/// Entry point to the engine: one database, one configuration, and the
/// services that run on them.
///
/// Cloning is cheap; every service shares the same pool.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    config: Arc<LedgerConfig>,
}

impl Ledger {
    /// Validates `config`, opens its database and runs migrations.
    pub async fn open(config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;

        info!(
            business = %config.business.name,
            timezone = %config.timezone(),
            "Ledger ready"
        );
        Ok(Ledger::new(db, config))
    }

    /// Wraps an already opened database.
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        Ledger {
            db,
            config: Arc::new(config),
        }
    }

    pub fn stock(&self) -> StockLedger {
        StockLedger::new(self.db.clone(), self.config.clone())
    }

    pub fn cash(&self) -> CashLedger {
        CashLedger::new(self.db.clone())
    }

    pub fn credit(&self) -> CreditLedger {
        CreditLedger::new(self.db.clone(), self.config.clone())
    }

    pub fn debt(&self) -> DebtTracker {
        DebtTracker::new(self.db.clone())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.db.clone())
    }

    pub fn sales(&self) -> SaleWorkflow {
        SaleWorkflow::new(self.db.clone(), self.config.clone())
    }

    pub fn purchases(&self) -> PurchaseWorkflow {
        PurchaseWorkflow::new(self.db.clone(), self.config.clone())
    }

    pub fn transfers(&self) -> TransferWorkflow {
        TransferWorkflow::new(self.db.clone(), self.config.clone())
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}
