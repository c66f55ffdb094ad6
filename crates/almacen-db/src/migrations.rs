//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` at the workspace root is compiled
//! into the binary and applied by [`Database::new`](crate::Database::new).
//! sqlx records each applied file in `_sqlx_migrations` and refuses to
//! start if an applied file was edited afterwards, so schema changes
//! always go into a new `NNN_description.sql`.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever has not been applied yet. Safe to call repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;

    let (known, applied) = migration_status(pool).await?;
    info!(known, applied, "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), usize::try_from(applied).unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;

    #[tokio::test]
    async fn test_all_migrations_applied() {
        let db = test_db().await;
        let (known, applied) = migration_status(db.pool()).await.unwrap();
        assert!(known >= 1);
        assert_eq!(known, applied);

        run_migrations(db.pool()).await.unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap(), (known, applied));
    }
}
