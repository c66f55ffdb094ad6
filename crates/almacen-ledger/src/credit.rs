//! # Credit Ledger
//!
//! Receivables (CXC, a customer owes the business) and payables (CPP, the
//! business owes a supplier), their payments, and the debt and cash side
//! effects each change carries.
//!
//! ## Payment Flow
//! ```text
//! register_payment(account, amount)
//!      │
//!      ├── apply_payment (in memory) ── PaymentExceedsBalance / AccountAlreadyPaid
//!      ├── save_payment_state (only if paid_cents unchanged)
//!      ├── insert CreditPayment
//!      ├── CXC: customer debt -= amount
//!      └── cash movement: CXC → INCOME, CPP → EXPENSE  (CREDIT_PAYMENT)
//! ```
//!
//! All of it runs in a single transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use almacen_core::ids::{self, generate_id};
use almacen_core::{
    validation, Actor, CashCategory, CashMovementType, CoreError, CreditAccount,
    CreditAccountFilter, CreditAccountUpdate, CreditPayment, CreditStatus, CreditType,
    NewCashMovement, NewCreditAccount, PaymentInput, ValidationError,
};
use almacen_db::{Database, DbError, SqliteConnection};

use crate::cash::CashLedger;
use crate::config::LedgerConfig;
use crate::debt::DebtTracker;
use crate::error::{LedgerError, LedgerResult};
use crate::stock::ensure_branch;

/// The account after a payment, together with the payment itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredPayment {
    pub account: CreditAccount,
    pub payment: CreditPayment,
}

#[derive(Debug, Clone)]
pub struct CreditLedger {
    db: Database,
    config: Arc<LedgerConfig>,
    cash: CashLedger,
    debt: DebtTracker,
}

impl CreditLedger {
    pub fn new(db: Database, config: Arc<LedgerConfig>) -> Self {
        CreditLedger {
            cash: CashLedger::new(db.clone()),
            debt: DebtTracker::new(db.clone()),
            db,
            config,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn find_by_id(&self, id: &str) -> LedgerResult<CreditAccount> {
        let mut conn = self.db.acquire().await?;
        self.get_in(&mut conn, id).await
    }

    pub async fn find_by_branch(
        &self,
        branch_id: &str,
        filter: CreditAccountFilter,
    ) -> LedgerResult<Vec<CreditAccount>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.credit().list_by_branch(&mut conn, branch_id, filter).await?)
    }

    /// Payments of an account, oldest first.
    pub async fn payments(&self, account_id: &str) -> LedgerResult<Vec<CreditPayment>> {
        let mut conn = self.db.acquire().await?;
        self.get_in(&mut conn, account_id).await?;
        Ok(self.db.credit().payments(&mut conn, account_id).await?)
    }

    pub async fn find_by_sale(&self, sale_id: &str) -> LedgerResult<Option<CreditAccount>> {
        let mut conn = self.db.acquire().await?;
        self.find_by_sale_in(&mut conn, sale_id).await
    }

    pub async fn find_by_purchase(&self, purchase_id: &str) -> LedgerResult<Option<CreditAccount>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.credit().find_by_purchase(&mut conn, purchase_id).await?)
    }

    /// Unpaid accounts of a branch past their due date at `now`.
    pub async fn list_overdue(
        &self,
        branch_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<CreditAccount>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.credit().list_overdue(&mut conn, branch_id, now).await?)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Opens a standalone account (not tied to a sale or purchase).
    ///
    /// ## Errors
    /// * `ValidationError` - `total_cents <= 0`, notes too long
    /// * `NotFound` - unknown branch or counterparty
    pub async fn create(&self, actor: &Actor, new: NewCreditAccount) -> LedgerResult<CreditAccount> {
        let mut tx = self.db.begin().await?;
        let account = self.create_in(&mut tx, &actor.id, new).await?;
        self.db.commit(tx).await?;

        info!(
            account_id = %account.id,
            account_type = ?account.account_type,
            total_cents = account.total_cents,
            "Credit account opened"
        );
        Ok(account)
    }

    /// Changes due date and notes. Amounts and status are never editable.
    pub async fn update(&self, id: &str, update: CreditAccountUpdate) -> LedgerResult<CreditAccount> {
        validation::validate_notes(update.notes.as_deref())?;

        let mut tx = self.db.begin().await?;
        let current = self.get_in(&mut tx, id).await?;
        let due_date = update.due_date.unwrap_or(current.due_date);
        let notes = update.notes.or(current.notes);

        self.db
            .credit()
            .update_details(&mut tx, id, due_date, notes.as_deref())
            .await?;
        let updated = self.get_in(&mut tx, id).await?;
        self.db.commit(tx).await?;

        Ok(updated)
    }

    /// Deletes an account that never received a payment.
    ///
    /// Customer debt is left as it is; use [`CreditLedger::cancel_account`]
    /// to also release the debt.
    pub async fn delete(&self, id: &str) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;
        let account = self.get_in(&mut tx, id).await?;
        account.ensure_no_payments()?;

        if !self.db.credit().delete_unpaid(&mut tx, id).await? {
            return Err(CoreError::AccountHasPayments(id.to_string()).into());
        }
        self.db.commit(tx).await?;

        info!(account_id = %id, "Credit account deleted");
        Ok(())
    }

    /// Removes an unpaid account and, for a CXC, the debt it added.
    pub async fn cancel_account(&self, id: &str) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;
        let account = self.get_in(&mut tx, id).await?;
        self.remove_in(&mut tx, &account).await?;
        self.db.commit(tx).await?;

        info!(account_id = %id, account_type = ?account.account_type, "Credit account cancelled");
        Ok(())
    }

    /// Applies a payment to an account.
    ///
    /// ## Errors
    /// * `ValidationError` - `amount_cents <= 0`
    /// * `NotFound` - unknown account
    /// * `AccountAlreadyPaid` - the account is already `PAGADO`
    /// * `PaymentExceedsBalance` - `amount > balance`; nothing is written
    pub async fn register_payment(
        &self,
        actor: &Actor,
        account_id: &str,
        input: PaymentInput,
    ) -> LedgerResult<RegisteredPayment> {
        validation::validate_payment_amount(input.amount_cents)?;
        validation::validate_notes(input.notes.as_deref())?;

        let mut tx = self.db.begin().await?;

        let mut account = self.get_in(&mut tx, account_id).await?;
        let previous_paid = account.paid_cents;
        account.apply_payment(input.amount_cents)?;
        account.updated_at = Utc::now();

        if !self
            .db
            .credit()
            .save_payment_state(&mut tx, &account, previous_paid)
            .await?
        {
            warn!(account_id = %account_id, "Credit account changed during payment");
            return Err(DbError::TransactionFailed(format!(
                "credit account {} modified concurrently",
                account_id
            ))
            .into());
        }

        let payment = CreditPayment {
            id: generate_id(ids::CREDIT_PAYMENT),
            credit_account_id: account.id.clone(),
            amount_cents: input.amount_cents,
            payment_method: input.payment_method,
            reference: input.reference,
            notes: input.notes,
            created_by: actor.id.clone(),
            created_at: account.updated_at,
        };
        self.db.credit().insert_payment(&mut tx, &payment).await?;

        let (movement_type, description) = match account.account_type {
            CreditType::Cxc => {
                self.debt
                    .adjust_in(&mut tx, &account.counterparty_id, -input.amount_cents)
                    .await?;
                (CashMovementType::Income, format!("Abono a cuenta por cobrar {}", account.id))
            }
            CreditType::Cpp => (
                CashMovementType::Expense,
                format!("Pago a cuenta por pagar {}", account.id),
            ),
        };
        let movement = NewCashMovement::new(
            &account.branch_id,
            movement_type,
            CashCategory::CreditPayment,
            input.amount_cents,
            input.payment_method,
            description,
        )
        .for_credit_account(&account.id);
        self.cash.record_in(&mut tx, &actor.id, movement).await?;

        self.db.commit(tx).await?;

        info!(
            account_id = %account.id,
            amount_cents = payment.amount_cents,
            balance_cents = account.balance_cents,
            status = ?account.status,
            "Credit payment registered"
        );
        Ok(RegisteredPayment { account, payment })
    }

    // =========================================================================
    // Transaction Helpers
    // =========================================================================

    pub(crate) async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        actor_id: &str,
        new: NewCreditAccount,
    ) -> LedgerResult<CreditAccount> {
        if new.total_cents <= 0 {
            return Err(ValidationError::must_be_positive("total").into());
        }
        validation::validate_notes(new.notes.as_deref())?;
        ensure_branch(&self.db, conn, &new.branch_id).await?;

        match new.account_type {
            CreditType::Cxc => {
                if self.db.customers().get(conn, &new.counterparty_id).await?.is_none() {
                    return Err(LedgerError::not_found("Customer", &new.counterparty_id));
                }
            }
            CreditType::Cpp => {
                if self.db.suppliers().get(conn, &new.counterparty_id).await?.is_none() {
                    return Err(LedgerError::not_found("Supplier", &new.counterparty_id));
                }
            }
        }

        let now = Utc::now();
        let account = CreditAccount {
            id: generate_id(ids::CREDIT_ACCOUNT),
            account_type: new.account_type,
            branch_id: new.branch_id,
            counterparty_id: new.counterparty_id,
            sale_id: new.sale_id,
            purchase_id: new.purchase_id,
            total_cents: new.total_cents,
            paid_cents: 0,
            balance_cents: new.total_cents,
            status: CreditStatus::Pendiente,
            due_date: new.due_date,
            notes: new.notes,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.credit().insert(conn, &account).await?;

        if account.account_type == CreditType::Cxc {
            self.debt
                .adjust_in(conn, &account.counterparty_id, account.total_cents)
                .await?;
        }

        Ok(account)
    }

    pub(crate) async fn find_by_sale_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> LedgerResult<Option<CreditAccount>> {
        Ok(self.db.credit().find_by_sale(conn, sale_id).await?)
    }

    pub(crate) async fn find_by_purchase_in(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
    ) -> LedgerResult<Option<CreditAccount>> {
        Ok(self.db.credit().find_by_purchase(conn, purchase_id).await?)
    }

    /// Deletes an unpaid account, releasing CXC debt first.
    pub(crate) async fn remove_in(
        &self,
        conn: &mut SqliteConnection,
        account: &CreditAccount,
    ) -> LedgerResult<()> {
        account.ensure_no_payments()?;

        if account.account_type == CreditType::Cxc {
            self.debt
                .adjust_in(conn, &account.counterparty_id, -account.total_cents)
                .await?;
        }

        if !self.db.credit().delete_unpaid(conn, &account.id).await? {
            return Err(CoreError::AccountHasPayments(account.id.clone()).into());
        }
        Ok(())
    }

    /// Default credit terms when a counterparty has none of its own.
    pub(crate) fn default_credit_days(&self) -> i64 {
        self.config.default_credit_days()
    }

    async fn get_in(&self, conn: &mut SqliteConnection, id: &str) -> LedgerResult<CreditAccount> {
        self.db
            .credit()
            .get(conn, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("CreditAccount", id))
    }
}
