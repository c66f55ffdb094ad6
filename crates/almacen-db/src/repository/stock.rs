//! # Stock Repository
//!
//! Per (product, branch) quantities and the manual-adjustment audit trail.
//!
//! ## Outgoing movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two cashiers sell the last 3 units at the same time                    │
//! │                                                                         │
//! │  read-then-write (lost update):      conditional decrement:             │
//! │    A reads 3, B reads 3                A: UPDATE ... AND quantity >= 3  │
//! │    A writes 0, B writes 0              → 1 row, quantity = 0            │
//! │    6 units sold, stock says 0          B: UPDATE ... AND quantity >= 3  │
//! │                                        → 0 rows → InsufficientStock     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! [`StockRepository::decrement`] is the only statement that lowers a
//! quantity through a movement. The `CHECK (quantity >= 0)` on the table
//! backs it up.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use almacen_core::{Quantity, Stock, StockAdjustment};

const SELECT_STOCK: &str = r#"
    SELECT id, product_id, branch_id, quantity, min_stock, max_stock, updated_at
    FROM stock
"#;

const SELECT_ADJUSTMENT: &str = r#"
    SELECT id, stock_id, product_id, branch_id, previous_quantity, new_quantity,
           reason, created_by, created_at
    FROM stock_adjustments
"#;

/// Repository for stock rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockRepository;

impl StockRepository {
    pub fn new() -> Self {
        StockRepository
    }

    pub async fn get(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Stock>> {
        let stock = sqlx::query_as::<_, Stock>(&format!("{} WHERE id = ?1", SELECT_STOCK))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(stock)
    }

    pub async fn find_by_product_and_branch(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        branch_id: &str,
    ) -> DbResult<Option<Stock>> {
        let stock = sqlx::query_as::<_, Stock>(&format!(
            "{} WHERE product_id = ?1 AND branch_id = ?2",
            SELECT_STOCK
        ))
        .bind(product_id)
        .bind(branch_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(stock)
    }

    /// Inserts a stock row.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - the (product, branch) row already exists
    pub async fn insert(&self, conn: &mut SqliteConnection, stock: &Stock) -> DbResult<()> {
        debug!(
            id = %stock.id,
            product_id = %stock.product_id,
            branch_id = %stock.branch_id,
            quantity = %stock.quantity,
            "Inserting stock row"
        );

        sqlx::query(
            r#"
            INSERT INTO stock (id, product_id, branch_id, quantity, min_stock, max_stock, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&stock.id)
        .bind(&stock.product_id)
        .bind(&stock.branch_id)
        .bind(stock.quantity)
        .bind(stock.min_stock)
        .bind(stock.max_stock)
        .bind(stock.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Adds `delta` to the quantity.
    pub async fn increment(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: Quantity,
    ) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Incrementing stock");

        let result = sqlx::query(
            "UPDATE stock SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Stock", id));
        }

        Ok(())
    }

    /// Subtracts `delta` only if at least `delta` is available.
    ///
    /// ## Returns
    /// * `true` - the quantity was lowered
    /// * `false` - not enough stock (or no such row); nothing changed
    pub async fn decrement(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: Quantity,
    ) -> DbResult<bool> {
        debug!(id = %id, delta = %delta, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE stock
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Overwrites the quantity (manual adjustments only).
    pub async fn set_quantity(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        quantity: Quantity,
    ) -> DbResult<()> {
        debug!(id = %id, quantity = %quantity, "Setting stock quantity");

        let result = sqlx::query("UPDATE stock SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(quantity)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Stock", id));
        }

        Ok(())
    }

    pub async fn set_thresholds(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        min_stock: Quantity,
        max_stock: Quantity,
    ) -> DbResult<()> {
        debug!(id = %id, min = %min_stock, max = %max_stock, "Setting stock thresholds");

        let result = sqlx::query(
            "UPDATE stock SET min_stock = ?2, max_stock = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(min_stock)
        .bind(max_stock)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Stock", id));
        }

        Ok(())
    }

    pub async fn list_by_branch(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
    ) -> DbResult<Vec<Stock>> {
        let rows = sqlx::query_as::<_, Stock>(&format!(
            "{} WHERE branch_id = ?1 ORDER BY product_id",
            SELECT_STOCK
        ))
        .bind(branch_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    /// Rows at or below their reorder threshold.
    pub async fn list_low_stock(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
    ) -> DbResult<Vec<Stock>> {
        let rows = sqlx::query_as::<_, Stock>(&format!(
            "{} WHERE branch_id = ?1 AND quantity <= min_stock ORDER BY quantity",
            SELECT_STOCK
        ))
        .bind(branch_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    pub async fn insert_adjustment(
        &self,
        conn: &mut SqliteConnection,
        adjustment: &StockAdjustment,
    ) -> DbResult<()> {
        debug!(
            id = %adjustment.id,
            stock_id = %adjustment.stock_id,
            previous = %adjustment.previous_quantity,
            new = %adjustment.new_quantity,
            "Recording stock adjustment"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_adjustments (
                id, stock_id, product_id, branch_id,
                previous_quantity, new_quantity, reason, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&adjustment.id)
        .bind(&adjustment.stock_id)
        .bind(&adjustment.product_id)
        .bind(&adjustment.branch_id)
        .bind(adjustment.previous_quantity)
        .bind(adjustment.new_quantity)
        .bind(&adjustment.reason)
        .bind(&adjustment.created_by)
        .bind(adjustment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Adjustment history of a stock row, oldest first.
    pub async fn adjustments(
        &self,
        conn: &mut SqliteConnection,
        stock_id: &str,
    ) -> DbResult<Vec<StockAdjustment>> {
        let rows = sqlx::query_as::<_, StockAdjustment>(&format!(
            "{} WHERE stock_id = ?1 ORDER BY created_at, id",
            SELECT_ADJUSTMENT
        ))
        .bind(stock_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_branch, seed_product, seed_stock, test_db};

    #[tokio::test]
    async fn test_conditional_decrement() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_branch(&mut conn, "BR-A").await;
        seed_product(&mut conn, "PRD-1", "COKE").await;
        let stock = seed_stock(&mut conn, "PRD-1", "BR-A", Quantity::from_units(3)).await;
        let repo = db.stock();

        assert!(!repo.decrement(&mut conn, &stock.id, Quantity::from_units(5)).await.unwrap());
        assert_eq!(
            repo.get(&mut conn, &stock.id).await.unwrap().unwrap().quantity,
            Quantity::from_units(3)
        );

        assert!(repo.decrement(&mut conn, &stock.id, Quantity::from_units(3)).await.unwrap());
        assert_eq!(
            repo.get(&mut conn, &stock.id).await.unwrap().unwrap().quantity,
            Quantity::zero()
        );

        assert!(!repo.decrement(&mut conn, &stock.id, Quantity::from_milli(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_negative_quantity_rejected_by_schema() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_branch(&mut conn, "BR-A").await;
        seed_product(&mut conn, "PRD-1", "COKE").await;
        let stock = seed_stock(&mut conn, "PRD-1", "BR-A", Quantity::from_units(1)).await;

        let err = db
            .stock()
            .set_quantity(&mut conn, &stock.id, Quantity::from_units(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_one_row_per_product_and_branch() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_branch(&mut conn, "BR-A").await;
        seed_product(&mut conn, "PRD-1", "COKE").await;
        let stock = seed_stock(&mut conn, "PRD-1", "BR-A", Quantity::from_units(1)).await;

        let mut dup = stock.clone();
        dup.id = "STK-dup".to_string();
        assert!(matches!(
            db.stock().insert(&mut conn, &dup).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_branch(&mut conn, "BR-A").await;
        seed_product(&mut conn, "PRD-1", "COKE").await;
        seed_product(&mut conn, "PRD-2", "PEPSI").await;
        // seed_stock uses min 10 / max 1000
        seed_stock(&mut conn, "PRD-1", "BR-A", Quantity::from_units(4)).await;
        seed_stock(&mut conn, "PRD-2", "BR-A", Quantity::from_units(40)).await;

        let low = db.stock().list_low_stock(&mut conn, "BR-A").await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, "PRD-1");
        assert_eq!(db.stock().list_by_branch(&mut conn, "BR-A").await.unwrap().len(), 2);
    }
}
