//! # Product Repository
//!
//! Catalog products and their alternative units of measure.
//!
//! ## Units
//! ```text
//! Product "Aceite" (unit = "L")
//!   ├── ProductUnit "botella 500ml"  factor 0.5
//!   └── ProductUnit "caja 12L"       factor 12
//! ```
//! Stock is always counted in the product's own unit; a sale or purchase
//! line in another unit is converted with the factor before touching stock.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use almacen_core::{Product, ProductUnit};

const SELECT_PRODUCT: &str = r#"
    SELECT id, sku, name, unit, cost_price_cents, retail_price_cents,
           wholesale_price_cents, is_active, created_at, updated_at
    FROM products
"#;

const SELECT_UNIT: &str = "SELECT id, product_id, name, factor FROM product_units";

/// Repository for product database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductRepository;

impl ProductRepository {
    pub fn new() -> Self {
        ProductRepository
    }

    /// Gets a product by ID, active or not.
    pub async fn get(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{} WHERE id = ?1", SELECT_PRODUCT))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Gets a product by SKU.
    pub async fn get_by_sku(
        &self,
        conn: &mut SqliteConnection,
        sku: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{} WHERE sku = ?1", SELECT_PRODUCT))
            .bind(sku)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - SKU already exists
    pub async fn insert(&self, conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, unit,
                cost_price_cents, retail_price_cents, wholesale_price_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.unit)
        .bind(product.cost_price_cents)
        .bind(product.retail_price_cents)
        .bind(product.wholesale_price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.sku),
            other => other,
        })?;

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical sales and stock rows still reference the product.
    pub async fn soft_delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    pub async fn get_unit(
        &self,
        conn: &mut SqliteConnection,
        unit_id: &str,
    ) -> DbResult<Option<ProductUnit>> {
        let unit = sqlx::query_as::<_, ProductUnit>(&format!("{} WHERE id = ?1", SELECT_UNIT))
            .bind(unit_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(unit)
    }

    pub async fn insert_unit(&self, conn: &mut SqliteConnection, unit: &ProductUnit) -> DbResult<()> {
        debug!(id = %unit.id, product_id = %unit.product_id, factor = %unit.factor, "Inserting product unit");

        sqlx::query(
            "INSERT INTO product_units (id, product_id, name, factor) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&unit.id)
        .bind(&unit.product_id)
        .bind(&unit.name)
        .bind(unit.factor)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn units_for_product(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<Vec<ProductUnit>> {
        let units = sqlx::query_as::<_, ProductUnit>(&format!(
            "{} WHERE product_id = ?1 ORDER BY name",
            SELECT_UNIT
        ))
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_product, test_db};
    use almacen_core::Quantity;

    #[tokio::test]
    async fn test_duplicate_sku_is_unique_violation() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        let product = seed_product(&mut conn, "PRD-1", "COKE-330").await;

        let mut copy = product.clone();
        copy.id = "PRD-2".to_string();
        let err = db.products().insert(&mut conn, &copy).await.unwrap_err();
        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "COKE-330"),
            other => panic!("unexpected error: {other:?}"),
        }

        let by_sku = db.products().get_by_sku(&mut conn, "COKE-330").await.unwrap();
        assert_eq!(by_sku.unwrap().id, "PRD-1");
    }

    #[tokio::test]
    async fn test_units_round_trip_fractional_factor() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_product(&mut conn, "PRD-1", "OIL").await;

        let unit = ProductUnit {
            id: "UNIT-1".to_string(),
            product_id: "PRD-1".to_string(),
            name: "botella 500ml".to_string(),
            factor: Quantity::from_milli(500),
        };
        db.products().insert_unit(&mut conn, &unit).await.unwrap();

        let loaded = db.products().get_unit(&mut conn, "UNIT-1").await.unwrap().unwrap();
        assert_eq!(loaded.factor, Quantity::from_milli(500));
        assert_eq!(db.products().units_for_product(&mut conn, "PRD-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        seed_product(&mut conn, "PRD-1", "COKE-330").await;

        db.products().soft_delete(&mut conn, "PRD-1").await.unwrap();
        assert!(!db.products().get(&mut conn, "PRD-1").await.unwrap().unwrap().is_active);
        assert!(matches!(
            db.products().soft_delete(&mut conn, "PRD-X").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
