//! # Purchase Repository
//!
//! Purchases and purchase items. Items and totals never change after
//! insertion; notes and invoice number can be edited, and the header can be
//! cancelled.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use almacen_core::{DateRange, Purchase, PurchaseItem};

const SELECT_PURCHASE: &str = r#"
    SELECT id, branch_id, supplier_id, purchase_type, payment_method, subtotal_cents, total_cents,
           invoice_number, notes, status, created_by, created_at, updated_at,
           cancelled_by, cancelled_at
    FROM purchases
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, purchase_id, product_id, quantity, unit_cost_cents, subtotal_cents,
           unit_id, unit_name, unit_factor, base_quantity
    FROM purchase_items
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseRepository;

impl PurchaseRepository {
    pub fn new() -> Self {
        PurchaseRepository
    }

    pub async fn get(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!("{} WHERE id = ?1", SELECT_PURCHASE))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(purchase)
    }

    pub async fn insert_purchase(
        &self,
        conn: &mut SqliteConnection,
        purchase: &Purchase,
    ) -> DbResult<()> {
        debug!(
            id = %purchase.id,
            branch_id = %purchase.branch_id,
            supplier_id = %purchase.supplier_id,
            total_cents = purchase.total_cents,
            "Inserting purchase"
        );

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, branch_id, supplier_id, purchase_type, payment_method, subtotal_cents,
                total_cents, invoice_number, notes, status, created_by, created_at,
                updated_at, cancelled_by, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.branch_id)
        .bind(&purchase.supplier_id)
        .bind(purchase.purchase_type)
        .bind(purchase.payment_method)
        .bind(purchase.subtotal_cents)
        .bind(purchase.total_cents)
        .bind(&purchase.invoice_number)
        .bind(&purchase.notes)
        .bind(purchase.status)
        .bind(&purchase.created_by)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .bind(&purchase.cancelled_by)
        .bind(purchase.cancelled_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_item(
        &self,
        conn: &mut SqliteConnection,
        item: &PurchaseItem,
    ) -> DbResult<()> {
        debug!(purchase_id = %item.purchase_id, product_id = %item.product_id, base_quantity = %item.base_quantity, "Adding purchase item");

        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, product_id, quantity, unit_cost_cents, subtotal_cents,
                unit_id, unit_name, unit_factor, base_quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.purchase_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_cost_cents)
        .bind(item.subtotal_cents)
        .bind(&item.unit_id)
        .bind(&item.unit_name)
        .bind(item.unit_factor)
        .bind(item.base_quantity)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn items(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
    ) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(&format!(
            "{} WHERE purchase_id = ?1 ORDER BY rowid",
            SELECT_ITEM
        ))
        .bind(purchase_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    pub async fn list_by_branch(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
        range: DateRange,
    ) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            r#"{}
            WHERE branch_id = ?1
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            ORDER BY created_at DESC
            "#,
            SELECT_PURCHASE
        ))
        .bind(branch_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *conn)
        .await?;

        Ok(purchases)
    }

    /// Writes the editable header fields.
    pub async fn update_details(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        notes: Option<&str>,
        invoice_number: Option<&str>,
    ) -> DbResult<()> {
        debug!(id = %id, "Updating purchase details");

        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET notes = ?2, invoice_number = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(notes)
        .bind(invoice_number)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        Ok(())
    }

    /// Flips an ACTIVE purchase to CANCELLED; `false` if it was not ACTIVE.
    pub async fn mark_cancelled(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        cancelled_by: &str,
        cancelled_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, cancelled_by = %cancelled_by, "Cancelling purchase");

        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET status = 'CANCELLED', cancelled_by = ?2, cancelled_at = ?3, updated_at = ?3
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
