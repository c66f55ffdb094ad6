//! Fixtures for engine tests.
//!
//! `seed_basics` lays down a small fixed world:
//!
//! ```text
//! branches   BR-A, BR-B
//! products   PRD-1 (COKE), PRD-2 (SABRITAS)
//! stock      PRD-1 @ BR-A = 50   (min 10, max 1000)
//! customer   CUS-1  credit limit 5000, no debt, default terms
//! supplier   SUP-1  15 days
//! ```

use chrono::Utc;

use almacen_core::{Actor, Branch, Customer, Product, Quantity, Role, Stock, Supplier};
use almacen_db::Database;

use crate::{Ledger, LedgerConfig};

pub async fn test_ledger() -> Ledger {
    let config = LedgerConfig::default();
    let db = Database::new(almacen_db::DbConfig::in_memory())
        .await
        .expect("in-memory database");
    Ledger::new(db, config)
}

pub async fn seed_basics(ledger: &Ledger) {
    let db = ledger.db();
    let mut conn = db.acquire().await.expect("connection");
    let now = Utc::now();

    for id in ["BR-A", "BR-B"] {
        let branch = Branch {
            id: id.to_string(),
            name: format!("Sucursal {}", id),
            address: None,
            is_active: true,
            created_at: now,
        };
        db.branches().insert(&mut conn, &branch).await.expect("insert branch");
    }

    for (id, sku) in [("PRD-1", "COKE"), ("PRD-2", "SABRITAS")] {
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
        db.products().insert(&mut conn, &product).await.expect("insert product");
    }

    let stock = Stock {
        id: "STK-PRD-1-BR-A".to_string(),
        product_id: "PRD-1".to_string(),
        branch_id: "BR-A".to_string(),
        quantity: Quantity::from_units(50),
        min_stock: Quantity::from_units(10),
        max_stock: Quantity::from_units(1000),
        updated_at: now,
    };
    db.stock().insert(&mut conn, &stock).await.expect("insert stock");

    let customer = Customer {
        id: "CUS-1".to_string(),
        name: "Abarrotes Lupita".to_string(),
        credit_limit_cents: 5_000,
        current_debt_cents: 0,
        credit_days: None,
        is_active: true,
        created_at: now,
    };
    db.customers().insert(&mut conn, &customer).await.expect("insert customer");

    let supplier = Supplier {
        id: "SUP-1".to_string(),
        name: "Distribuidora del Golfo".to_string(),
        credit_days: Some(15),
        is_active: true,
        created_at: now,
    };
    db.suppliers().insert(&mut conn, &supplier).await.expect("insert supplier");
}

pub fn admin() -> Actor {
    Actor::new("u-admin", Role::Admin, None)
}

pub fn cashier_a() -> Actor {
    Actor::new("u-a", Role::Cashier, Some("BR-A"))
}

pub fn cashier_b() -> Actor {
    Actor::new("u-b", Role::Cashier, Some("BR-B"))
}
