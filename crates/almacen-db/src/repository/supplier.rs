//! # Supplier Repository

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use almacen_core::Supplier;

const SELECT_SUPPLIER: &str =
    "SELECT id, name, credit_days, is_active, created_at FROM suppliers";

#[derive(Debug, Clone, Copy, Default)]
pub struct SupplierRepository;

impl SupplierRepository {
    pub fn new() -> Self {
        SupplierRepository
    }

    pub async fn get(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!("{} WHERE id = ?1", SELECT_SUPPLIER))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(supplier)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, supplier: &Supplier) -> DbResult<()> {
        debug!(id = %supplier.id, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, credit_days, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(supplier.credit_days)
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
