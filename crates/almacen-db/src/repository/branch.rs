//! # Branch Repository

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use almacen_core::Branch;

const SELECT_BRANCH: &str = "SELECT id, name, address, is_active, created_at FROM branches";

#[derive(Debug, Clone, Copy, Default)]
pub struct BranchRepository;

impl BranchRepository {
    pub fn new() -> Self {
        BranchRepository
    }

    pub async fn get(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(&format!("{} WHERE id = ?1", SELECT_BRANCH))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(branch)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, branch: &Branch) -> DbResult<()> {
        debug!(id = %branch.id, name = %branch.name, "Inserting branch");

        sqlx::query(
            r#"
            INSERT INTO branches (id, name, address, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&branch.id)
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(branch.is_active)
        .bind(branch.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn list_active(&self, conn: &mut SqliteConnection) -> DbResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(&format!(
            "{} WHERE is_active = 1 ORDER BY name",
            SELECT_BRANCH
        ))
        .fetch_all(&mut *conn)
        .await?;

        Ok(branches)
    }
}
