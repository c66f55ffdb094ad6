//! # Catalog
//!
//! Master data the ledgers refer to: branches, products with their
//! alternative units, customers and suppliers.

use chrono::Utc;
use tracing::info;

use almacen_core::ids::{self, generate_id};
use almacen_core::{
    validation, Branch, Customer, NewBranch, NewCustomer, NewProduct, NewProductUnit, NewSupplier,
    Product, ProductUnit, Supplier,
};
use almacen_db::Database;

use crate::error::{LedgerError, LedgerResult};
use crate::stock::ensure_product;

/// Base unit label when a product is created without one.
const DEFAULT_UNIT: &str = "pz";

#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    // =========================================================================
    // Branches
    // =========================================================================

    pub async fn create_branch(&self, new: NewBranch) -> LedgerResult<Branch> {
        validation::validate_name("name", &new.name)?;
        validation::validate_notes(new.address.as_deref())?;

        let branch = Branch {
            id: generate_id(ids::BRANCH),
            name: new.name.trim().to_string(),
            address: new.address,
            is_active: true,
            created_at: Utc::now(),
        };
        let mut conn = self.db.acquire().await?;
        self.db.branches().insert(&mut conn, &branch).await?;

        info!(branch_id = %branch.id, name = %branch.name, "Branch created");
        Ok(branch)
    }

    pub async fn get_branch(&self, id: &str) -> LedgerResult<Branch> {
        let mut conn = self.db.acquire().await?;
        self.db
            .branches()
            .get(&mut conn, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Branch", id))
    }

    pub async fn list_branches(&self) -> LedgerResult<Vec<Branch>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.branches().list_active(&mut conn).await?)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// ## Errors
    /// * `ValidationError` - bad SKU/name/prices, or the SKU is taken
    pub async fn create_product(&self, new: NewProduct) -> LedgerResult<Product> {
        validation::validate_new_product(&new)?;

        let unit = match new.unit.trim() {
            "" => DEFAULT_UNIT.to_string(),
            unit => unit.to_string(),
        };
        let now = Utc::now();
        let product = Product {
            id: generate_id(ids::PRODUCT),
            sku: new.sku.trim().to_string(),
            name: new.name.trim().to_string(),
            unit,
            cost_price_cents: new.cost_price_cents,
            retail_price_cents: new.retail_price_cents,
            wholesale_price_cents: new.wholesale_price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut conn = self.db.acquire().await?;
        self.db.products().insert(&mut conn, &product).await?;

        info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> LedgerResult<Product> {
        let mut conn = self.db.acquire().await?;
        self.db
            .products()
            .get(&mut conn, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", id))
    }

    pub async fn get_product_by_sku(&self, sku: &str) -> LedgerResult<Product> {
        let mut conn = self.db.acquire().await?;
        self.db
            .products()
            .get_by_sku(&mut conn, sku)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", sku))
    }

    /// Soft delete. The product stays readable but can no longer be sold
    /// or bought.
    pub async fn deactivate_product(&self, id: &str) -> LedgerResult<()> {
        let mut conn = self.db.acquire().await?;
        self.db.products().soft_delete(&mut conn, id).await?;

        info!(product_id = %id, "Product deactivated");
        Ok(())
    }

    pub async fn add_product_unit(&self, new: NewProductUnit) -> LedgerResult<ProductUnit> {
        validation::validate_new_product_unit(&new)?;

        let mut conn = self.db.acquire().await?;
        ensure_product(&self.db, &mut conn, &new.product_id).await?;

        let unit = ProductUnit {
            id: generate_id(ids::PRODUCT_UNIT),
            product_id: new.product_id,
            name: new.name.trim().to_string(),
            factor: new.factor,
        };
        self.db.products().insert_unit(&mut conn, &unit).await?;

        Ok(unit)
    }

    pub async fn list_product_units(&self, product_id: &str) -> LedgerResult<Vec<ProductUnit>> {
        let mut conn = self.db.acquire().await?;
        ensure_product(&self.db, &mut conn, product_id).await?;
        Ok(self.db.products().units_for_product(&mut conn, product_id).await?)
    }

    // =========================================================================
    // Counterparties
    // =========================================================================

    pub async fn create_customer(&self, new: NewCustomer) -> LedgerResult<Customer> {
        validation::validate_new_customer(&new)?;

        let customer = Customer {
            id: generate_id(ids::CUSTOMER),
            name: new.name.trim().to_string(),
            credit_limit_cents: new.credit_limit_cents,
            current_debt_cents: 0,
            credit_days: new.credit_days,
            is_active: true,
            created_at: Utc::now(),
        };
        let mut conn = self.db.acquire().await?;
        self.db.customers().insert(&mut conn, &customer).await?;

        info!(customer_id = %customer.id, credit_limit_cents = customer.credit_limit_cents, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, id: &str) -> LedgerResult<Customer> {
        let mut conn = self.db.acquire().await?;
        self.db
            .customers()
            .get(&mut conn, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Customer", id))
    }

    pub async fn create_supplier(&self, new: NewSupplier) -> LedgerResult<Supplier> {
        validation::validate_new_supplier(&new)?;

        let supplier = Supplier {
            id: generate_id(ids::SUPPLIER),
            name: new.name.trim().to_string(),
            credit_days: new.credit_days,
            is_active: true,
            created_at: Utc::now(),
        };
        let mut conn = self.db.acquire().await?;
        self.db.suppliers().insert(&mut conn, &supplier).await?;

        info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: &str) -> LedgerResult<Supplier> {
        let mut conn = self.db.acquire().await?;
        self.db
            .suppliers()
            .get(&mut conn, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Supplier", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_ledger;
    use almacen_core::{ErrorKind, Quantity};

    fn product(sku: &str) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: "Aceite 1L".to_string(),
            unit: String::new(),
            cost_price_cents: 3_000,
            retail_price_cents: 4_200,
            wholesale_price_cents: 3_800,
        }
    }

    #[tokio::test]
    async fn test_product_with_units() {
        let ledger = test_ledger().await;
        let catalog = ledger.catalog();

        let created = catalog.create_product(product("ACE-1")).await.unwrap();
        assert_eq!(created.unit, "pz");
        assert!(created.id.starts_with("PRD-"));

        let by_sku = catalog.get_product_by_sku("ACE-1").await.unwrap();
        assert_eq!(by_sku.id, created.id);

        let caja = catalog
            .add_product_unit(NewProductUnit {
                product_id: created.id.clone(),
                name: "caja".to_string(),
                factor: Quantity::from_units(12),
            })
            .await
            .unwrap();
        let units = catalog.list_product_units(&created.id).await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].id, caja.id);
        assert_eq!(units[0].factor, Quantity::from_units(12));
    }

    #[tokio::test]
    async fn test_duplicate_sku_and_bad_unit() {
        let ledger = test_ledger().await;
        let catalog = ledger.catalog();
        catalog.create_product(product("ACE-1")).await.unwrap();

        let err = catalog.create_product(product("ACE-1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = catalog
            .add_product_unit(NewProductUnit {
                product_id: "PRD-404".to_string(),
                name: "caja".to_string(),
                factor: Quantity::from_units(6),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_deactivate_keeps_product_readable() {
        let ledger = test_ledger().await;
        let catalog = ledger.catalog();
        let created = catalog.create_product(product("ACE-2")).await.unwrap();

        catalog.deactivate_product(&created.id).await.unwrap();
        assert!(!catalog.get_product(&created.id).await.unwrap().is_active);

        let err = catalog.deactivate_product("PRD-404").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_branches_and_counterparties() {
        let ledger = test_ledger().await;
        let catalog = ledger.catalog();

        let branch = catalog
            .create_branch(NewBranch {
                name: "Centro".to_string(),
                address: None,
            })
            .await
            .unwrap();
        assert_eq!(catalog.get_branch(&branch.id).await.unwrap().name, "Centro");
        assert_eq!(catalog.list_branches().await.unwrap().len(), 1);

        let customer = catalog
            .create_customer(NewCustomer {
                name: "Tienda Don Pepe".to_string(),
                credit_limit_cents: 5_000,
                credit_days: Some(15),
            })
            .await
            .unwrap();
        assert_eq!(catalog.get_customer(&customer.id).await.unwrap().current_debt_cents, 0);

        let supplier = catalog
            .create_supplier(NewSupplier {
                name: "Distribuidora del Norte".to_string(),
                credit_days: None,
            })
            .await
            .unwrap();
        assert!(catalog.get_supplier(&supplier.id).await.is_ok());

        let err = catalog
            .create_customer(NewCustomer {
                name: "x".to_string(),
                credit_limit_cents: -1,
                credit_days: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = catalog
            .create_customer(NewCustomer {
                name: "Plazo eterno".to_string(),
                credit_limit_cents: 5_000,
                credit_days: Some(100_000_000),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("credit_days"));
    }
}
