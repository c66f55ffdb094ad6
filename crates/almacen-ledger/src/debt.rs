//! # Customer Debt Tracker
//!
//! Running `current_debt_cents` per customer, maintained incrementally by
//! the credit flows (CXC created: `+total`, CXC payment: `-amount`,
//! CXC removed: `-total`). It is never recomputed from the accounts.

use tracing::debug;

use almacen_core::Money;
use almacen_db::{Database, DbError, SqliteConnection};

use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone)]
pub struct DebtTracker {
    db: Database,
}

impl DebtTracker {
    pub fn new(db: Database) -> Self {
        DebtTracker { db }
    }

    pub async fn current(&self, customer_id: &str) -> LedgerResult<Money> {
        let mut conn = self.db.acquire().await?;
        let customer = self
            .db
            .customers()
            .get(&mut conn, customer_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Customer", customer_id))?;

        Ok(Money::from_cents(customer.current_debt_cents))
    }

    /// Adds `delta_cents` (may be negative) and returns the new debt.
    pub async fn adjust(&self, customer_id: &str, delta_cents: i64) -> LedgerResult<Money> {
        let mut tx = self.db.begin().await?;
        let debt = self.adjust_in(&mut tx, customer_id, delta_cents).await?;
        self.db.commit(tx).await?;
        Ok(debt)
    }

    pub(crate) async fn adjust_in(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &str,
        delta_cents: i64,
    ) -> LedgerResult<Money> {
        match self.db.customers().adjust_debt(conn, customer_id, delta_cents).await {
            Ok(debt) => {
                debug!(customer_id = %customer_id, delta_cents, debt_cents = debt, "Customer debt adjusted");
                Ok(Money::from_cents(debt))
            }
            Err(DbError::NotFound { .. }) => Err(LedgerError::not_found("Customer", customer_id)),
            Err(e) => Err(e.into()),
        }
    }
}
