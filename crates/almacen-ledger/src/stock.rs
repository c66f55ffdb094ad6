//! # Stock Ledger
//!
//! Per (product, branch) quantities.
//!
//! ## Movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Stock Movements                                 │
//! │                                                                         │
//! │  OUTGOING (sale, transfer ship, purchase cancel)         take_in()      │
//! │    read row ─► check_available ─► UPDATE ... WHERE quantity >= delta    │
//! │                     │                         │                         │
//! │                     ▼                         ▼ 0 rows                  │
//! │              InsufficientStock          InsufficientStock               │
//! │                                                                         │
//! │  INCOMING (purchase, transfer receive, sale cancel)      receive_in()   │
//! │    row exists? ─► increment                                             │
//! │         └─ no ──► create with default thresholds                        │
//! │                                                                         │
//! │  MANUAL (adjust_stock)                                                  │
//! │    absolute quantity + StockAdjustment audit row                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `quantity >= 0` always holds: the decrement is conditional and the
//! table carries a CHECK constraint as well.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use almacen_core::ids::{self, generate_id};
use almacen_core::{rules, validation, Actor, CoreError, NewStock, Quantity, Stock, StockAdjustment};
use almacen_db::{Database, SqliteConnection};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
    config: Arc<LedgerConfig>,
}

impl StockLedger {
    pub fn new(db: Database, config: Arc<LedgerConfig>) -> Self {
        StockLedger { db, config }
    }

    pub async fn get(&self, id: &str) -> LedgerResult<Stock> {
        let mut conn = self.db.acquire().await?;
        self.get_in(&mut conn, id).await
    }

    pub async fn find_by_product_and_branch(
        &self,
        product_id: &str,
        branch_id: &str,
    ) -> LedgerResult<Option<Stock>> {
        let mut conn = self.db.acquire().await?;
        Ok(self
            .db
            .stock()
            .find_by_product_and_branch(&mut conn, product_id, branch_id)
            .await?)
    }

    pub async fn list_by_branch(&self, branch_id: &str) -> LedgerResult<Vec<Stock>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.stock().list_by_branch(&mut conn, branch_id).await?)
    }

    /// Rows whose quantity is at or below `min_stock`.
    pub async fn list_low_stock(&self, branch_id: &str) -> LedgerResult<Vec<Stock>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.stock().list_low_stock(&mut conn, branch_id).await?)
    }

    /// Audit trail of manual adjustments, oldest first.
    pub async fn adjustments(&self, stock_id: &str) -> LedgerResult<Vec<StockAdjustment>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.stock().adjustments(&mut conn, stock_id).await?)
    }

    /// Creates a stock row explicitly.
    ///
    /// ## Errors
    /// * `ValidationError` - negative quantity, bad thresholds, or the
    ///   (product, branch) row already exists
    /// * `NotFound` - unknown product or branch
    pub async fn create(&self, new: NewStock) -> LedgerResult<Stock> {
        validation::validate_new_stock(&new)?;

        let mut tx = self.db.begin().await?;
        ensure_product(&self.db, &mut tx, &new.product_id).await?;
        ensure_branch(&self.db, &mut tx, &new.branch_id).await?;

        let stock = Stock {
            id: generate_id(ids::STOCK),
            product_id: new.product_id,
            branch_id: new.branch_id,
            quantity: new.quantity,
            min_stock: new.min_stock,
            max_stock: new.max_stock,
            updated_at: Utc::now(),
        };
        self.db.stock().insert(&mut tx, &stock).await?;
        self.db.commit(tx).await?;

        info!(stock_id = %stock.id, product_id = %stock.product_id, branch_id = %stock.branch_id, "Stock row created");
        Ok(stock)
    }

    /// Adds `delta` to a row.
    pub async fn increment(&self, id: &str, delta: Quantity) -> LedgerResult<Stock> {
        validation::validate_quantity("delta", delta)?;

        let mut tx = self.db.begin().await?;
        self.db.stock().increment(&mut tx, id, delta).await?;
        let stock = self.get_in(&mut tx, id).await?;
        self.db.commit(tx).await?;

        Ok(stock)
    }

    /// Removes `delta` from a row if that much is there.
    pub async fn decrement(&self, id: &str, delta: Quantity) -> LedgerResult<Stock> {
        validation::validate_quantity("delta", delta)?;

        let mut tx = self.db.begin().await?;
        let stock = self.get_in(&mut tx, id).await?;
        self.decrement_row_in(&mut tx, &stock, delta).await?;
        let stock = self.get_in(&mut tx, id).await?;
        self.db.commit(tx).await?;

        Ok(stock)
    }

    /// Overwrites a row's quantity without an audit row.
    ///
    /// Business code goes through [`StockLedger::adjust_stock`]; this is the
    /// raw primitive it is built on.
    pub async fn set_quantity(&self, id: &str, quantity: Quantity) -> LedgerResult<Stock> {
        validation::validate_stock_level("quantity", quantity)?;

        let mut tx = self.db.begin().await?;
        self.db.stock().set_quantity(&mut tx, id, quantity).await?;
        let stock = self.get_in(&mut tx, id).await?;
        self.db.commit(tx).await?;

        Ok(stock)
    }

    pub async fn set_thresholds(
        &self,
        id: &str,
        min_stock: Quantity,
        max_stock: Quantity,
    ) -> LedgerResult<Stock> {
        validation::validate_thresholds(min_stock, max_stock)?;

        let mut tx = self.db.begin().await?;
        self.db
            .stock()
            .set_thresholds(&mut tx, id, min_stock, max_stock)
            .await?;
        let stock = self.get_in(&mut tx, id).await?;
        self.db.commit(tx).await?;

        Ok(stock)
    }

    /// Sets an absolute quantity after a physical count.
    ///
    /// ## Steps
    /// 1. Trimmed reason must be non-empty, target must not be negative
    /// 2. Product and branch must exist
    /// 3. Row is overwritten, or created at the target quantity
    /// 4. A `StockAdjustment` records previous/new quantity, reason and actor
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        branch_id: &str,
        new_quantity: Quantity,
        reason: &str,
        actor: &Actor,
    ) -> LedgerResult<StockAdjustment> {
        let reason = validation::validate_reason(reason)?;
        validation::validate_stock_level("new_quantity", new_quantity)?;

        let mut tx = self.db.begin().await?;
        ensure_product(&self.db, &mut tx, product_id).await?;
        ensure_branch(&self.db, &mut tx, branch_id).await?;

        let existing = self
            .db
            .stock()
            .find_by_product_and_branch(&mut tx, product_id, branch_id)
            .await?;

        let (stock_id, previous_quantity) = match existing {
            Some(stock) => {
                self.db
                    .stock()
                    .set_quantity(&mut tx, &stock.id, new_quantity)
                    .await?;
                (stock.id, stock.quantity)
            }
            None => {
                let stock = self
                    .insert_default_row(&mut tx, product_id, branch_id, new_quantity)
                    .await?;
                (stock.id, Quantity::zero())
            }
        };

        let adjustment = StockAdjustment {
            id: generate_id(ids::STOCK_ADJUSTMENT),
            stock_id,
            product_id: product_id.to_string(),
            branch_id: branch_id.to_string(),
            previous_quantity,
            new_quantity,
            reason,
            created_by: actor.id.clone(),
            created_at: Utc::now(),
        };
        self.db.stock().insert_adjustment(&mut tx, &adjustment).await?;
        self.db.commit(tx).await?;

        info!(
            product_id = %product_id,
            branch_id = %branch_id,
            previous = %previous_quantity,
            new = %new_quantity,
            actor = %actor.id,
            "Stock adjusted"
        );
        Ok(adjustment)
    }

    // =========================================================================
    // In-transaction helpers for the workflows
    // =========================================================================

    async fn get_in(&self, conn: &mut SqliteConnection, id: &str) -> LedgerResult<Stock> {
        self.db
            .stock()
            .get(conn, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Stock", id))
    }

    /// Fails with `InsufficientStock` unless the branch holds `required`.
    /// Writes nothing.
    pub(crate) async fn check_in(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        branch_id: &str,
        required: Quantity,
    ) -> LedgerResult<()> {
        let available = self
            .db
            .stock()
            .find_by_product_and_branch(conn, product_id, branch_id)
            .await?
            .map(|s| s.quantity)
            .unwrap_or_else(Quantity::zero);

        rules::check_available(product_id, branch_id, available, required)?;
        Ok(())
    }

    /// Outgoing movement: removes `quantity` from the branch.
    pub(crate) async fn take_in(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        branch_id: &str,
        quantity: Quantity,
    ) -> LedgerResult<()> {
        let stock = self
            .db
            .stock()
            .find_by_product_and_branch(conn, product_id, branch_id)
            .await?
            .ok_or_else(|| CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                branch_id: branch_id.to_string(),
                available: Quantity::zero(),
                requested: quantity,
            })?;

        self.decrement_row_in(conn, &stock, quantity).await
    }

    async fn decrement_row_in(
        &self,
        conn: &mut SqliteConnection,
        stock: &Stock,
        quantity: Quantity,
    ) -> LedgerResult<()> {
        rules::check_available(&stock.product_id, &stock.branch_id, stock.quantity, quantity)?;

        if !self.db.stock().decrement(conn, &stock.id, quantity).await? {
            // Someone else took stock between the read and the update.
            let current = self.get_in(conn, &stock.id).await?;
            return Err(CoreError::InsufficientStock {
                product_id: stock.product_id.clone(),
                branch_id: stock.branch_id.clone(),
                available: current.quantity,
                requested: quantity,
            }
            .into());
        }

        Ok(())
    }

    /// Incoming movement: adds `quantity` to the branch, creating the row
    /// with the configured thresholds if the branch never held the product.
    pub(crate) async fn receive_in(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        branch_id: &str,
        quantity: Quantity,
    ) -> LedgerResult<()> {
        let existing = self
            .db
            .stock()
            .find_by_product_and_branch(conn, product_id, branch_id)
            .await?;

        match existing {
            Some(stock) => self.db.stock().increment(conn, &stock.id, quantity).await?,
            None => {
                self.insert_default_row(conn, product_id, branch_id, quantity)
                    .await?;
            }
        }

        Ok(())
    }

    async fn insert_default_row(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        branch_id: &str,
        quantity: Quantity,
    ) -> LedgerResult<Stock> {
        debug!(product_id = %product_id, branch_id = %branch_id, "Creating stock row on first movement");

        let stock = Stock {
            id: generate_id(ids::STOCK),
            product_id: product_id.to_string(),
            branch_id: branch_id.to_string(),
            quantity,
            min_stock: self.config.default_min_stock(),
            max_stock: self.config.default_max_stock(),
            updated_at: Utc::now(),
        };
        self.db.stock().insert(conn, &stock).await?;
        Ok(stock)
    }
}

// =============================================================================
// Existence checks shared by the workflows
// =============================================================================

pub(crate) async fn ensure_branch(
    db: &Database,
    conn: &mut SqliteConnection,
    branch_id: &str,
) -> LedgerResult<()> {
    match db.branches().get(conn, branch_id).await? {
        Some(_) => Ok(()),
        None => Err(LedgerError::not_found("Branch", branch_id)),
    }
}

pub(crate) async fn ensure_product(
    db: &Database,
    conn: &mut SqliteConnection,
    product_id: &str,
) -> LedgerResult<()> {
    match db.products().get(conn, product_id).await? {
        Some(_) => Ok(()),
        None => Err(LedgerError::not_found("Product", product_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, seed_basics, test_ledger};
    use almacen_core::ErrorKind;

    #[tokio::test]
    async fn test_adjust_creates_missing_row_and_audits() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let stock = ledger.stock();

        let adj = stock
            .adjust_stock("PRD-1", "BR-B", Quantity::from_units(40), "  conteo físico ", &admin())
            .await
            .unwrap();
        assert_eq!(adj.previous_quantity, Quantity::zero());
        assert_eq!(adj.new_quantity, Quantity::from_units(40));
        assert_eq!(adj.reason, "conteo físico");

        let row = stock
            .find_by_product_and_branch("PRD-1", "BR-B")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.quantity, Quantity::from_units(40));
        assert_eq!(row.min_stock, Quantity::from_units(10));
        assert_eq!(stock.adjustments(&row.id).await.unwrap().len(), 1);

        let adj = stock
            .adjust_stock("PRD-1", "BR-B", Quantity::from_units(35), "merma", &admin())
            .await
            .unwrap();
        assert_eq!(adj.previous_quantity, Quantity::from_units(40));
        assert_eq!(stock.adjustments(&row.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_adjust_requires_reason_and_non_negative() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;

        let err = ledger
            .stock()
            .adjust_stock("PRD-1", "BR-A", Quantity::from_units(5), "   ", &admin())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = ledger
            .stock()
            .adjust_stock("PRD-1", "BR-A", Quantity::from_units(-1), "conteo", &admin())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = ledger
            .stock()
            .adjust_stock("PRD-404", "BR-A", Quantity::from_units(1), "conteo", &admin())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_decrement_never_goes_negative() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let row = ledger
            .stock()
            .find_by_product_and_branch("PRD-1", "BR-A")
            .await
            .unwrap()
            .unwrap();

        let after = ledger
            .stock()
            .decrement(&row.id, Quantity::from_units(30))
            .await
            .unwrap();
        assert_eq!(after.quantity, Quantity::from_units(20));

        let err = ledger
            .stock()
            .decrement(&row.id, Quantity::from_units(21))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product PRD-1 at branch BR-A: available 20, requested 21"
        );

        let unchanged = ledger.stock().get(&row.id).await.unwrap();
        assert_eq!(unchanged.quantity, Quantity::from_units(20));
    }

    #[tokio::test]
    async fn test_create_validates_thresholds_and_uniqueness() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;

        let bad = NewStock {
            product_id: "PRD-2".into(),
            branch_id: "BR-B".into(),
            quantity: Quantity::from_units(1),
            min_stock: Quantity::from_units(20),
            max_stock: Quantity::from_units(5),
        };
        assert_eq!(
            ledger.stock().create(bad).await.unwrap_err().kind(),
            ErrorKind::ValidationError
        );

        let dup = NewStock {
            product_id: "PRD-1".into(),
            branch_id: "BR-A".into(),
            quantity: Quantity::from_units(1),
            min_stock: Quantity::zero(),
            max_stock: Quantity::from_units(5),
        };
        assert_eq!(
            ledger.stock().create(dup).await.unwrap_err().kind(),
            ErrorKind::ValidationError
        );
    }

    #[tokio::test]
    async fn test_low_stock_and_thresholds() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let row = ledger
            .stock()
            .find_by_product_and_branch("PRD-1", "BR-A")
            .await
            .unwrap()
            .unwrap();

        assert!(ledger.stock().list_low_stock("BR-A").await.unwrap().is_empty());

        ledger
            .stock()
            .set_thresholds(&row.id, Quantity::from_units(60), Quantity::from_units(500))
            .await
            .unwrap();
        let low = ledger.stock().list_low_stock("BR-A").await.unwrap();
        assert_eq!(low.len(), 1);
        assert!(low[0].is_low());
    }
}
