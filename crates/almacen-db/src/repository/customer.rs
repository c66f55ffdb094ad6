//! # Customer Repository
//!
//! Customers and their running receivable balance (`current_debt_cents`).
//! The balance is adjusted by deltas only; it is never recomputed from the
//! credit accounts.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use almacen_core::Customer;

const SELECT_CUSTOMER: &str = r#"
    SELECT id, name, credit_limit_cents, current_debt_cents, credit_days, is_active, created_at
    FROM customers
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerRepository;

impl CustomerRepository {
    pub fn new() -> Self {
        CustomerRepository
    }

    pub async fn get(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!("{} WHERE id = ?1", SELECT_CUSTOMER))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(customer)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, credit_limit_cents, current_debt_cents, credit_days, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(customer.credit_limit_cents)
        .bind(customer.current_debt_cents)
        .bind(customer.credit_days)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Adds `delta_cents` (positive or negative) to the customer's debt.
    ///
    /// ## Returns
    /// The new debt.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such customer
    pub async fn adjust_debt(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta_cents: i64,
    ) -> DbResult<i64> {
        debug!(customer_id = %id, delta_cents, "Adjusting customer debt");

        let new_debt: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE customers
            SET current_debt_cents = current_debt_cents + ?2
            WHERE id = ?1
            RETURNING current_debt_cents
            "#,
        )
        .bind(id)
        .bind(delta_cents)
        .fetch_optional(&mut *conn)
        .await?;

        new_debt.ok_or_else(|| DbError::not_found("Customer", id))
    }
}
