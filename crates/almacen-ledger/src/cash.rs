//! # Cash Ledger
//!
//! Append-only INCOME/EXPENSE journal per branch. Each cash-affecting event
//! appends exactly one movement; a cancellation appends a compensating
//! movement of the opposite type under `ADJUSTMENT`.

use chrono::Utc;
use tracing::info;

use almacen_core::ids::{self, generate_id};
use almacen_core::{
    validation, Actor, CashCategory, CashMovement, CashMovementType, CashSummary, DateRange, Money,
    NewCashMovement, PaymentMethod,
};
use almacen_db::{Database, SqliteConnection};

use crate::error::LedgerResult;
use crate::stock::ensure_branch;

#[derive(Debug, Clone)]
pub struct CashLedger {
    db: Database,
}

impl CashLedger {
    pub fn new(db: Database) -> Self {
        CashLedger { db }
    }

    /// Appends a movement on behalf of `actor`.
    ///
    /// ## Errors
    /// * `ValidationError` - `amount_cents <= 0` or empty description
    /// * `NotFound` - unknown branch
    pub async fn record(&self, actor: &Actor, movement: NewCashMovement) -> LedgerResult<CashMovement> {
        validation::validate_cash_movement(&movement)?;

        let mut tx = self.db.begin().await?;
        ensure_branch(&self.db, &mut tx, &movement.branch_id).await?;
        let recorded = self.record_in(&mut tx, &actor.id, movement).await?;
        self.db.commit(tx).await?;

        Ok(recorded)
    }

    /// Manual outflow (rent, fuel, wages) under the `EXPENSE` category.
    pub async fn record_expense(
        &self,
        actor: &Actor,
        branch_id: &str,
        amount_cents: i64,
        payment_method: PaymentMethod,
        description: &str,
    ) -> LedgerResult<CashMovement> {
        let movement = NewCashMovement::new(
            branch_id,
            CashMovementType::Expense,
            CashCategory::Expense,
            amount_cents,
            payment_method,
            description,
        );
        let recorded = self.record(actor, movement).await?;

        info!(branch_id = %branch_id, amount_cents, "Expense recorded");
        Ok(recorded)
    }

    /// Movements of a branch inside `range`, oldest first.
    pub async fn find_by_branch(
        &self,
        branch_id: &str,
        range: DateRange,
    ) -> LedgerResult<Vec<CashMovement>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.cash().list_by_branch(&mut conn, branch_id, range).await?)
    }

    /// Σ INCOME − Σ EXPENSE over `range`.
    pub async fn balance(&self, branch_id: &str, range: DateRange) -> LedgerResult<Money> {
        let summary = self.summary(branch_id, range).await?;
        Ok(Money::from_cents(summary.balance_cents))
    }

    pub async fn summary(&self, branch_id: &str, range: DateRange) -> LedgerResult<CashSummary> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.cash().summary(&mut conn, branch_id, range).await?)
    }

    pub(crate) async fn record_in(
        &self,
        conn: &mut SqliteConnection,
        actor_id: &str,
        movement: NewCashMovement,
    ) -> LedgerResult<CashMovement> {
        validation::validate_cash_movement(&movement)?;

        let recorded = CashMovement {
            id: generate_id(ids::CASH_MOVEMENT),
            branch_id: movement.branch_id,
            movement_type: movement.movement_type,
            category: movement.category,
            amount_cents: movement.amount_cents,
            payment_method: movement.payment_method,
            description: movement.description,
            sale_id: movement.sale_id,
            purchase_id: movement.purchase_id,
            credit_account_id: movement.credit_account_id,
            created_by: actor_id.to_string(),
            created_at: Utc::now(),
        };
        self.db.cash().insert(conn, &recorded).await?;

        Ok(recorded)
    }
}
