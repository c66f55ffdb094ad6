//! Fixtures for repository tests.

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::pool::{Database, DbConfig};
use crate::repository::{
    BranchRepository, CustomerRepository, ProductRepository, StockRepository, SupplierRepository,
};
use almacen_core::{Branch, Customer, Product, Quantity, Stock, Supplier};

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

pub async fn seed_branch(conn: &mut SqliteConnection, id: &str) -> Branch {
    let branch = Branch {
        id: id.to_string(),
        name: format!("Sucursal {}", id),
        address: None,
        is_active: true,
        created_at: Utc::now(),
    };
    BranchRepository::new().insert(conn, &branch).await.expect("insert branch");
    branch
}

pub async fn seed_product(conn: &mut SqliteConnection, id: &str, sku: &str) -> Product {
    let now = Utc::now();
    let product = Product {
        id: id.to_string(),
        sku: sku.to_string(),
        name: format!("Producto {}", sku),
        unit: "pz".to_string(),
        cost_price_cents: 700,
        retail_price_cents: 1_000,
        wholesale_price_cents: 900,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    ProductRepository::new().insert(conn, &product).await.expect("insert product");
    product
}

pub async fn seed_customer(conn: &mut SqliteConnection, id: &str, credit_limit_cents: i64) -> Customer {
    let customer = Customer {
        id: id.to_string(),
        name: format!("Cliente {}", id),
        credit_limit_cents,
        current_debt_cents: 0,
        credit_days: None,
        is_active: true,
        created_at: Utc::now(),
    };
    CustomerRepository::new().insert(conn, &customer).await.expect("insert customer");
    customer
}

pub async fn seed_supplier(conn: &mut SqliteConnection, id: &str) -> Supplier {
    let supplier = Supplier {
        id: id.to_string(),
        name: format!("Proveedor {}", id),
        credit_days: Some(15),
        is_active: true,
        created_at: Utc::now(),
    };
    SupplierRepository::new().insert(conn, &supplier).await.expect("insert supplier");
    supplier
}

/// Stock row with min 10 / max 1000.
pub async fn seed_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    quantity: Quantity,
) -> Stock {
    let stock = Stock {
        id: format!("STK-{}-{}", product_id, branch_id),
        product_id: product_id.to_string(),
        branch_id: branch_id.to_string(),
        quantity,
        min_stock: Quantity::from_units(10),
        max_stock: Quantity::from_units(1000),
        updated_at: Utc::now(),
    };
    StockRepository::new().insert(conn, &stock).await.expect("insert stock");
    stock
}
