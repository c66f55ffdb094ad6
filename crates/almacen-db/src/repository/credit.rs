//! # Credit Repository
//!
//! Credit accounts (CXC receivables, CPP payables) and their payments.
//!
//! Amounts and status are written together by
//! [`CreditRepository::save_payment_state`], which only succeeds if nobody
//! else paid in between.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use almacen_core::{CreditAccount, CreditAccountFilter, CreditPayment};

const SELECT_ACCOUNT: &str = r#"
    SELECT id, account_type, branch_id, counterparty_id, sale_id, purchase_id,
           total_cents, paid_cents, balance_cents, status, due_date, notes,
           created_by, created_at, updated_at
    FROM credit_accounts
"#;

const SELECT_PAYMENT: &str = r#"
    SELECT id, credit_account_id, amount_cents, payment_method, reference, notes,
           created_by, created_at
    FROM credit_payments
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct CreditRepository;

impl CreditRepository {
    pub fn new() -> Self {
        CreditRepository
    }

    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<CreditAccount>> {
        let account = sqlx::query_as::<_, CreditAccount>(&format!("{} WHERE id = ?1", SELECT_ACCOUNT))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(account)
    }

    pub async fn find_by_sale(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Option<CreditAccount>> {
        let account =
            sqlx::query_as::<_, CreditAccount>(&format!("{} WHERE sale_id = ?1", SELECT_ACCOUNT))
                .bind(sale_id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(account)
    }

    pub async fn find_by_purchase(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
    ) -> DbResult<Option<CreditAccount>> {
        let account = sqlx::query_as::<_, CreditAccount>(&format!(
            "{} WHERE purchase_id = ?1",
            SELECT_ACCOUNT
        ))
        .bind(purchase_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(account)
    }

    /// Accounts of a branch, optionally filtered by type and status, by due date.
    pub async fn list_by_branch(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
        filter: CreditAccountFilter,
    ) -> DbResult<Vec<CreditAccount>> {
        let accounts = sqlx::query_as::<_, CreditAccount>(&format!(
            r#"{}
            WHERE branch_id = ?1
              AND (?2 IS NULL OR account_type = ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY due_date, id
            "#,
            SELECT_ACCOUNT
        ))
        .bind(branch_id)
        .bind(filter.account_type)
        .bind(filter.status)
        .fetch_all(&mut *conn)
        .await?;

        Ok(accounts)
    }

    /// Unpaid accounts of a branch whose due date is before `now`.
    pub async fn list_overdue(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<CreditAccount>> {
        let accounts = sqlx::query_as::<_, CreditAccount>(&format!(
            r#"{}
            WHERE branch_id = ?1 AND status <> 'PAGADO' AND due_date < ?2
            ORDER BY due_date, id
            "#,
            SELECT_ACCOUNT
        ))
        .bind(branch_id)
        .bind(now)
        .fetch_all(&mut *conn)
        .await?;

        Ok(accounts)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, account: &CreditAccount) -> DbResult<()> {
        debug!(
            id = %account.id,
            account_type = ?account.account_type,
            counterparty_id = %account.counterparty_id,
            total_cents = account.total_cents,
            "Inserting credit account"
        );

        sqlx::query(
            r#"
            INSERT INTO credit_accounts (
                id, account_type, branch_id, counterparty_id, sale_id, purchase_id,
                total_cents, paid_cents, balance_cents, status, due_date, notes,
                created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&account.id)
        .bind(account.account_type)
        .bind(&account.branch_id)
        .bind(&account.counterparty_id)
        .bind(&account.sale_id)
        .bind(&account.purchase_id)
        .bind(account.total_cents)
        .bind(account.paid_cents)
        .bind(account.balance_cents)
        .bind(account.status)
        .bind(account.due_date)
        .bind(&account.notes)
        .bind(&account.created_by)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes due date and notes.
    pub async fn update_details(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        due_date: DateTime<Utc>,
        notes: Option<&str>,
    ) -> DbResult<()> {
        debug!(id = %id, "Updating credit account details");

        let result = sqlx::query(
            "UPDATE credit_accounts SET due_date = ?2, notes = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(due_date)
        .bind(notes)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CreditAccount", id));
        }

        Ok(())
    }

    /// Persists paid/balance/status of `account` if the stored paid amount
    /// is still `previous_paid_cents`.
    ///
    /// ## Returns
    /// `false` when the row changed underneath (a concurrent payment).
    pub async fn save_payment_state(
        &self,
        conn: &mut SqliteConnection,
        account: &CreditAccount,
        previous_paid_cents: i64,
    ) -> DbResult<bool> {
        debug!(
            id = %account.id,
            paid_cents = account.paid_cents,
            balance_cents = account.balance_cents,
            status = ?account.status,
            "Saving credit account payment state"
        );

        let result = sqlx::query(
            r#"
            UPDATE credit_accounts
            SET paid_cents = ?2, balance_cents = ?3, status = ?4, updated_at = ?5
            WHERE id = ?1 AND paid_cents = ?6
            "#,
        )
        .bind(&account.id)
        .bind(account.paid_cents)
        .bind(account.balance_cents)
        .bind(account.status)
        .bind(account.updated_at)
        .bind(previous_paid_cents)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes an account that has no payments.
    ///
    /// ## Returns
    /// `false` when no unpaid account with that id exists.
    pub async fn delete_unpaid(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting credit account");

        let result = sqlx::query("DELETE FROM credit_accounts WHERE id = ?1 AND paid_cents = 0")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn insert_payment(
        &self,
        conn: &mut SqliteConnection,
        payment: &CreditPayment,
    ) -> DbResult<()> {
        debug!(
            id = %payment.id,
            credit_account_id = %payment.credit_account_id,
            amount_cents = payment.amount_cents,
            "Inserting credit payment"
        );

        sqlx::query(
            r#"
            INSERT INTO credit_payments (
                id, credit_account_id, amount_cents, payment_method, reference, notes,
                created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.credit_account_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_method)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(&payment.created_by)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Payments of an account, oldest first.
    pub async fn payments(
        &self,
        conn: &mut SqliteConnection,
        account_id: &str,
    ) -> DbResult<Vec<CreditPayment>> {
        let payments = sqlx::query_as::<_, CreditPayment>(&format!(
            "{} WHERE credit_account_id = ?1 ORDER BY created_at, id",
            SELECT_PAYMENT
        ))
        .bind(account_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_branch, seed_customer, test_db};
    use almacen_core::{CreditStatus, CreditType, PaymentMethod};
    use chrono::Duration;

    fn receivable(id: &str, total: i64, due_in_days: i64) -> CreditAccount {
        let now = Utc::now();
        CreditAccount {
            id: id.to_string(),
            account_type: CreditType::Cxc,
            branch_id: "BR-A".to_string(),
            counterparty_id: "CUS-1".to_string(),
            sale_id: None,
            purchase_id: None,
            total_cents: total,
            paid_cents: 0,
            balance_cents: total,
            status: CreditStatus::Pendiente,
            due_date: now + Duration::days(due_in_days),
            notes: None,
            created_by: "u1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_payment_state_is_compare_and_set() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_branch(&mut conn, "BR-A").await;
        seed_customer(&mut conn, "CUS-1", 10_000).await;
        let repo = db.credit();

        let mut account = receivable("CRD-1", 1_000, 30);
        repo.insert(&mut conn, &account).await.unwrap();

        account.apply_payment(400).unwrap();
        assert!(repo.save_payment_state(&mut conn, &account, 0).await.unwrap());

        // A writer that still believes paid == 0 loses.
        assert!(!repo.save_payment_state(&mut conn, &account, 0).await.unwrap());

        let stored = repo.get(&mut conn, "CRD-1").await.unwrap().unwrap();
        assert_eq!(stored.paid_cents, 400);
        assert_eq!(stored.balance_cents, 600);
        assert_eq!(stored.status, CreditStatus::PagadoParcial);
    }

    #[tokio::test]
    async fn test_delete_only_unpaid() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_branch(&mut conn, "BR-A").await;
        seed_customer(&mut conn, "CUS-1", 10_000).await;
        let repo = db.credit();

        let mut account = receivable("CRD-1", 1_000, 30);
        repo.insert(&mut conn, &account).await.unwrap();
        account.apply_payment(100).unwrap();
        repo.save_payment_state(&mut conn, &account, 0).await.unwrap();
        repo.insert_payment(
            &mut conn,
            &CreditPayment {
                id: "PAY-1".to_string(),
                credit_account_id: "CRD-1".to_string(),
                amount_cents: 100,
                payment_method: PaymentMethod::Cash,
                reference: None,
                notes: None,
                created_by: "u1".to_string(),
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        assert!(!repo.delete_unpaid(&mut conn, "CRD-1").await.unwrap());
        assert_eq!(repo.payments(&mut conn, "CRD-1").await.unwrap().len(), 1);

        repo.insert(&mut conn, &receivable("CRD-2", 500, 30)).await.unwrap();
        assert!(repo.delete_unpaid(&mut conn, "CRD-2").await.unwrap());
        assert!(repo.get(&mut conn, "CRD-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filters_and_overdue() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_branch(&mut conn, "BR-A").await;
        seed_customer(&mut conn, "CUS-1", 10_000).await;
        let repo = db.credit();

        repo.insert(&mut conn, &receivable("CRD-1", 1_000, -2)).await.unwrap();
        repo.insert(&mut conn, &receivable("CRD-2", 1_000, 10)).await.unwrap();

        let overdue = repo.list_overdue(&mut conn, "BR-A", Utc::now()).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, "CRD-1");

        let cpp_only = CreditAccountFilter {
            account_type: Some(CreditType::Cpp),
            status: None,
        };
        assert!(repo.list_by_branch(&mut conn, "BR-A", cpp_only).await.unwrap().is_empty());

        let pending = CreditAccountFilter {
            account_type: Some(CreditType::Cxc),
            status: Some(CreditStatus::Pendiente),
        };
        assert_eq!(repo.list_by_branch(&mut conn, "BR-A", pending).await.unwrap().len(), 2);
    }
}
