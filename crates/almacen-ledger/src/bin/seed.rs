//! # Sample Data Seeder
//!
//! Fills an empty Almacen database with a small working business: two
//! branches, a product catalog with box units, customers with credit
//! limits, suppliers, and an opening purchase per branch so there is stock
//! to sell.
//!
//! ## Usage
//! ```bash
//! cargo run -p almacen-ledger --bin seed
//! cargo run -p almacen-ledger --bin seed -- --db ./almacen_dev.db
//! cargo run -p almacen-ledger --bin seed -- --config ./almacen.toml --units 48
//! ```

use std::env;
use std::path::PathBuf;

use almacen_core::{
    Actor, NewBranch, NewCustomer, NewProduct, NewProductUnit, NewPurchase, NewPurchaseItem,
    NewSupplier, PaymentMethod, Quantity, Role, TradeType,
};
use almacen_ledger::{telemetry, Ledger, LedgerConfig};

/// (name, address)
const BRANCHES: &[(&str, &str)] = &[
    ("Matriz", "Av. Juárez 120, Centro"),
    ("Sucursal Norte", "Blvd. Colosio 455"),
];

/// (sku, name, cost, retail, wholesale, units per box)
const PRODUCTS: &[(&str, &str, i64, i64, i64, i64)] = &[
    ("ARR-1KG", "Arroz 1 kg", 1_850, 2_600, 2_300, 20),
    ("FRI-1KG", "Frijol negro 1 kg", 2_900, 3_900, 3_500, 20),
    ("ACE-1L", "Aceite vegetal 1 L", 3_200, 4_500, 4_100, 12),
    ("AZU-1KG", "Azúcar estándar 1 kg", 2_400, 3_300, 3_000, 20),
    ("HAR-1KG", "Harina de trigo 1 kg", 1_700, 2_400, 2_150, 20),
    ("ATU-140", "Atún en agua 140 g", 1_350, 2_000, 1_800, 48),
    ("JAB-400", "Jabón de lavandería 400 g", 1_900, 2_800, 2_500, 25),
    ("REF-600", "Refresco cola 600 ml", 1_150, 1_800, 1_550, 24),
];

/// (name, credit limit, credit days)
const CUSTOMERS: &[(&str, i64, Option<i64>)] = &[
    ("Abarrotes Lupita", 500_000, None),
    ("Tienda Don Chuy", 250_000, Some(15)),
    ("Cocina Económica La Güera", 150_000, Some(7)),
];

/// (name, credit days)
const SUPPLIERS: &[(&str, Option<i64>)] = &[
    ("Distribuidora del Golfo", Some(30)),
    ("Abastos La Central", None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut opening_units: i64 = 24;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--units" | "-u" => {
                if i + 1 < args.len() {
                    opening_units = args[i + 1].parse().unwrap_or(opening_units);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Almacen Sample Data Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (overrides the config)");
                println!("  -c, --config <PATH>    Config file (default: platform config dir)");
                println!("  -u, --units <N>        Opening stock per product and branch (default: 24)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    telemetry::init_tracing();

    let mut config = LedgerConfig::load_or_default(config_path);
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("Almacen Sample Data Seeder");
    println!("==========================");
    println!("Database: {}", config.database.path.display());
    println!("Time zone: {}", config.timezone());
    println!();

    let ledger = Ledger::open(config).await?;
    let catalog = ledger.catalog();

    let existing = catalog.list_branches().await?;
    if !existing.is_empty() {
        println!("Database already has {} branches", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut branches = Vec::with_capacity(BRANCHES.len());
    for (name, address) in BRANCHES {
        let branch = catalog
            .create_branch(NewBranch {
                name: name.to_string(),
                address: Some(address.to_string()),
            })
            .await?;
        println!("  Branch   {}  {}", branch.id, branch.name);
        branches.push(branch);
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (sku, name, cost, retail, wholesale, per_box) in PRODUCTS {
        let product = catalog
            .create_product(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                unit: String::new(),
                cost_price_cents: *cost,
                retail_price_cents: *retail,
                wholesale_price_cents: *wholesale,
            })
            .await?;
        catalog
            .add_product_unit(NewProductUnit {
                product_id: product.id.clone(),
                name: "caja".to_string(),
                factor: Quantity::from_units(*per_box),
            })
            .await?;
        println!("  Product  {}  {} (caja = {} {})", product.id, product.name, per_box, product.unit);
        products.push(product);
    }

    for (name, limit, days) in CUSTOMERS {
        let customer = catalog
            .create_customer(NewCustomer {
                name: name.to_string(),
                credit_limit_cents: *limit,
                credit_days: *days,
            })
            .await?;
        println!("  Customer {}  {}", customer.id, customer.name);
    }

    let mut suppliers = Vec::with_capacity(SUPPLIERS.len());
    for (name, days) in SUPPLIERS {
        let supplier = catalog
            .create_supplier(NewSupplier {
                name: name.to_string(),
                credit_days: *days,
            })
            .await?;
        println!("  Supplier {}  {}", supplier.id, supplier.name);
        suppliers.push(supplier);
    }

    if opening_units > 0 {
        let seeder = Actor::new("seed", Role::Admin, None);
        // First branch buys on credit so the payables list is not empty.
        for (idx, branch) in branches.iter().enumerate() {
            let supplier = &suppliers[idx % suppliers.len()];
            let purchase_type = if idx == 0 {
                TradeType::Credit
            } else {
                TradeType::Cash
            };
            let items = products
                .iter()
                .map(|product| NewPurchaseItem {
                    product_id: product.id.clone(),
                    quantity: Quantity::from_units(opening_units),
                    unit_cost_cents: product.cost_price_cents,
                    unit_id: None,
                })
                .collect();

            let detail = ledger
                .purchases()
                .create_purchase(
                    &seeder,
                    NewPurchase {
                        branch_id: branch.id.clone(),
                        supplier_id: supplier.id.clone(),
                        purchase_type,
                        payment_method: Some(PaymentMethod::Transfer),
                        invoice_number: Some(format!("INV-APERTURA-{}", idx + 1)),
                        notes: Some("Inventario inicial".to_string()),
                        items,
                    },
                )
                .await?;
            println!(
                "  Purchase {}  {} {:?} total {}",
                detail.purchase.id, branch.name, purchase_type, detail.purchase.total_cents
            );
        }
    }

    println!();
    println!("Seed complete!");

    Ok(())
}
