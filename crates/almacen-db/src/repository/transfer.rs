//! # Transfer Repository
//!
//! Transfer headers and items. A transition is persisted with
//! [`TransferRepository::save_transition`], which matches on the state the
//! caller read so two users cannot both move the same transfer.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use almacen_core::{Transfer, TransferItem, TransferStatus};

const SELECT_TRANSFER: &str = r#"
    SELECT id, from_branch_id, to_branch_id, transfer_type, status, notes,
           created_by, created_at, approved_by, approved_at, shipped_by, shipped_at,
           completed_by, completed_at, cancelled_by, cancelled_at
    FROM transfers
"#;

const SELECT_ITEM: &str = "SELECT id, transfer_id, product_id, quantity FROM transfer_items";

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferRepository;

impl TransferRepository {
    pub fn new() -> Self {
        TransferRepository
    }

    pub async fn get(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Transfer>> {
        let transfer = sqlx::query_as::<_, Transfer>(&format!("{} WHERE id = ?1", SELECT_TRANSFER))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(transfer)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, transfer: &Transfer) -> DbResult<()> {
        debug!(
            id = %transfer.id,
            from = %transfer.from_branch_id,
            to = %transfer.to_branch_id,
            transfer_type = ?transfer.transfer_type,
            "Inserting transfer"
        );

        sqlx::query(
            r#"
            INSERT INTO transfers (
                id, from_branch_id, to_branch_id, transfer_type, status, notes,
                created_by, created_at, approved_by, approved_at, shipped_by, shipped_at,
                completed_by, completed_at, cancelled_by, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.from_branch_id)
        .bind(&transfer.to_branch_id)
        .bind(transfer.transfer_type)
        .bind(transfer.status)
        .bind(&transfer.notes)
        .bind(&transfer.created_by)
        .bind(transfer.created_at)
        .bind(&transfer.approved_by)
        .bind(transfer.approved_at)
        .bind(&transfer.shipped_by)
        .bind(transfer.shipped_at)
        .bind(&transfer.completed_by)
        .bind(transfer.completed_at)
        .bind(&transfer.cancelled_by)
        .bind(transfer.cancelled_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_item(&self, conn: &mut SqliteConnection, item: &TransferItem) -> DbResult<()> {
        debug!(transfer_id = %item.transfer_id, product_id = %item.product_id, quantity = %item.quantity, "Adding transfer item");

        sqlx::query(
            "INSERT INTO transfer_items (id, transfer_id, product_id, quantity) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&item.id)
        .bind(&item.transfer_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn items(
        &self,
        conn: &mut SqliteConnection,
        transfer_id: &str,
    ) -> DbResult<Vec<TransferItem>> {
        let items = sqlx::query_as::<_, TransferItem>(&format!(
            "{} WHERE transfer_id = ?1 ORDER BY rowid",
            SELECT_ITEM
        ))
        .bind(transfer_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Transfers where the branch is source or destination, newest first.
    pub async fn list_for_branch(
        &self,
        conn: &mut SqliteConnection,
        branch_id: &str,
    ) -> DbResult<Vec<Transfer>> {
        let transfers = sqlx::query_as::<_, Transfer>(&format!(
            "{} WHERE from_branch_id = ?1 OR to_branch_id = ?1 ORDER BY created_at DESC",
            SELECT_TRANSFER
        ))
        .bind(branch_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(transfers)
    }

    /// Writes status and step stamps if the stored status is still `expected`.
    ///
    /// ## Returns
    /// `false` when another step already moved the transfer.
    pub async fn save_transition(
        &self,
        conn: &mut SqliteConnection,
        transfer: &Transfer,
        expected: TransferStatus,
    ) -> DbResult<bool> {
        debug!(id = %transfer.id, from = %expected, to = %transfer.status, "Saving transfer transition");

        let result = sqlx::query(
            r#"
            UPDATE transfers
            SET status = ?2,
                approved_by = ?3, approved_at = ?4,
                shipped_by = ?5, shipped_at = ?6,
                completed_by = ?7, completed_at = ?8,
                cancelled_by = ?9, cancelled_at = ?10
            WHERE id = ?1 AND status = ?11
            "#,
        )
        .bind(&transfer.id)
        .bind(transfer.status)
        .bind(&transfer.approved_by)
        .bind(transfer.approved_at)
        .bind(&transfer.shipped_by)
        .bind(transfer.shipped_at)
        .bind(&transfer.completed_by)
        .bind(transfer.completed_at)
        .bind(&transfer.cancelled_by)
        .bind(transfer.cancelled_at)
        .bind(expected)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_branch, test_db};
    use almacen_core::TransferType;
    use chrono::Utc;

    #[tokio::test]
    async fn test_transition_matches_expected_state() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_branch(&mut conn, "BR-A").await;
        seed_branch(&mut conn, "BR-B").await;

        let mut transfer = Transfer {
            id: "TRF-1".to_string(),
            from_branch_id: "BR-A".to_string(),
            to_branch_id: "BR-B".to_string(),
            transfer_type: TransferType::Send,
            status: TransferStatus::Pending,
            notes: None,
            created_by: "u1".to_string(),
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            shipped_by: None,
            shipped_at: None,
            completed_by: None,
            completed_at: None,
            cancelled_by: None,
            cancelled_at: None,
        };
        let repo = db.transfers();
        repo.insert(&mut conn, &transfer).await.unwrap();

        transfer.status = TransferStatus::InTransit;
        transfer.shipped_by = Some("u1".to_string());
        transfer.shipped_at = Some(Utc::now());
        assert!(repo.save_transition(&mut conn, &transfer, TransferStatus::Pending).await.unwrap());
        assert!(!repo.save_transition(&mut conn, &transfer, TransferStatus::Pending).await.unwrap());

        let stored = repo.get(&mut conn, "TRF-1").await.unwrap().unwrap();
        assert_eq!(stored.status, TransferStatus::InTransit);
        assert_eq!(stored.shipped_by.as_deref(), Some("u1"));

        assert_eq!(repo.list_for_branch(&mut conn, "BR-B").await.unwrap().len(), 1);
        assert!(repo.list_for_branch(&mut conn, "BR-Z").await.unwrap().is_empty());
    }
}
