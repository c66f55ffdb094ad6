//! # Cash Repository
//!
//! The append-only cash journal. There is no update or delete: a mistake is
//! corrected by recording a compensating movement.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use almacen_core::{CashMovement, CashSummary, DateRange};

const SELECT_MOVEMENT: &str = r#"
    SELECT id, branch_id, movement_type, category, amount_cents, payment_method,
           description, sale_id, purchase_id, credit_account_id, created_by, created_at
    FROM cash_movements
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct CashRepository;

impl CashRepository {
    pub fn new() -> Self {
        CashRepository
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, movement: &CashMovement) -> DbResult<()> {
        debug!(
            id = %movement.id,
            branch_id = %movement.branch_id,
            movement_type = ?movement.movement_type,
            category = ?movement.category,
            amount_cents = movement.amount_cents,
            "Recording cash movement"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_movements (
                id, branch_id, movement_type, category, amount_cents, payment_method,
                description, sale_id, purchase_id, credit_account_id, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.branch_id)
        .bind(movement.movement_type)
        .bind(movement.category)
        .bind(movement.amount_cents)
        .bind(movement.payment_method)
        .bind(&movement.description)
        .bind(&movement.sale_id)
        .bind(&movement.purchase_id)
        .bind(&movement.credit_account_id)
        .bind(&movement.created_by)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Movements of a branch inside `range`, oldest first.
    pub async fn list_by_branch(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
        range: DateRange,
    ) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(&format!(
            r#"{}
            WHERE branch_id = ?1
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            ORDER BY created_at, rowid
            "#,
            SELECT_MOVEMENT
        ))
        .bind(branch_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *conn)
        .await?;

        Ok(movements)
    }

    /// Income, expense, balance and count of a branch's movements in `range`.
    pub async fn summary(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
        range: DateRange,
    ) -> DbResult<CashSummary> {
        let (income_cents, expense_cents, movement_count): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN movement_type = 'INCOME' THEN amount_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN movement_type = 'EXPENSE' THEN amount_cents ELSE 0 END), 0),
                COUNT(*)
            FROM cash_movements
            WHERE branch_id = ?1
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            "#,
        )
        .bind(branch_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&mut *conn)
        .await?;

        Ok(CashSummary {
            income_cents,
            expense_cents,
            balance_cents: income_cents - expense_cents,
            movement_count,
        })
    }
}
