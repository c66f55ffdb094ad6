//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one transaction, see almacen-ledger)                        │
//! │     └── insert_sale() → Sale { status: Active }                         │
//! │     └── insert_item() × N                                               │
//! │                                                                         │
//! │  2. (OPTIONAL, same business day) CANCEL                                │
//! │     └── mark_cancelled() → Sale { status: Cancelled }                   │
//! │                                                                         │
//! │  Header and items are otherwise immutable.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use almacen_core::{DateRange, Sale, SaleItem};

const SELECT_SALE: &str = r#"
    SELECT id, branch_id, customer_id, sale_type, payment_method,
           subtotal_cents, discount_cents, total_cents, status, notes,
           created_by, created_at, cancelled_by, cancelled_at
    FROM sales
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, sale_id, product_id, quantity, unit_price_cents, subtotal_cents,
           unit_id, unit_name, unit_factor, base_quantity
    FROM sale_items
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaleRepository;

impl SaleRepository {
    pub fn new() -> Self {
        SaleRepository
    }

    /// Gets a sale header by ID.
    pub async fn get(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{} WHERE id = ?1", SELECT_SALE))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(sale)
    }

    pub async fn insert_sale(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, branch_id = %sale.branch_id, total_cents = sale.total_cents, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, branch_id, customer_id, sale_type, payment_method,
                subtotal_cents, discount_cents, total_cents, status, notes,
                created_by, created_at, cancelled_by, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.branch_id)
        .bind(&sale.customer_id)
        .bind(sale.sale_type)
        .bind(sale.payment_method)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.status)
        .bind(&sale.notes)
        .bind(&sale.created_by)
        .bind(sale.created_at)
        .bind(&sale.cancelled_by)
        .bind(sale.cancelled_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Adds an item to a sale.
    ///
    /// ## Snapshot Pattern
    /// Unit name and factor are copied onto the item so a later catalog
    /// change does not alter what the sale moved.
    pub async fn insert_item(&self, conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, base_quantity = %item.base_quantity, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity, unit_price_cents, subtotal_cents,
                unit_id, unit_name, unit_factor, base_quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .bind(&item.unit_id)
        .bind(&item.unit_name)
        .bind(item.unit_factor)
        .bind(item.base_quantity)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn items(&self, conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "{} WHERE sale_id = ?1 ORDER BY rowid",
            SELECT_ITEM
        ))
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Sales of a branch inside `range`, newest first.
    pub async fn list_by_branch(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
        range: DateRange,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"{}
            WHERE branch_id = ?1
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            ORDER BY created_at DESC
            "#,
            SELECT_SALE
        ))
        .bind(branch_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *conn)
        .await?;

        Ok(sales)
    }

    /// Flips an ACTIVE sale to CANCELLED.
    ///
    /// ## Returns
    /// `false` when the sale was not ACTIVE (already cancelled or missing).
    pub async fn mark_cancelled(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        cancelled_by: &str,
        cancelled_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, cancelled_by = %cancelled_by, "Cancelling sale");

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = 'CANCELLED', cancelled_by = ?2, cancelled_at = ?3
            WHERE id = ?1 AND status = 'ACTIVE'
            "#,
        )
        .bind(id)
        .bind(cancelled_by)
        .bind(cancelled_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
