//! # Seed Data
//!
//! Stocks a database with a small café catalog and a few loyalty customers,
//! enough to ring up sales against locally.
//!
//! ```bash
//! cargo run -p meridian-db --bin seed
//! cargo run -p meridian-db --bin seed -- --db ./data/meridian.db --tenant t-demo
//! ```
//!
//! Opening stock is written through the Stock Ledger, so every level has an
//! `adjustment` movement behind it. Re-running against a seeded tenant is a
//! no-op.

use chrono::Utc;
use meridian_core::{Customer, Money, Product, DEFAULT_LOCATION, DEFAULT_TENANT_ID};
use meridian_db::{Database, DbConfig};
use uuid::Uuid;

/// `(sku, name, price in cents, tax bps, opening stock)`
const CATALOG: &[(&str, &str, i64, u32, i64)] = &[
    ("ESP-SGL", "Espresso", 250, 700, 400),
    ("ESP-DBL", "Double Espresso", 350, 700, 400),
    ("FLT-WHT", "Flat White", 420, 700, 250),
    ("CAP-REG", "Cappuccino", 400, 700, 250),
    ("TEA-GRN", "Green Tea", 300, 700, 120),
    ("CRS-BTR", "Butter Croissant", 325, 0, 36),
    ("CRS-ALM", "Almond Croissant", 395, 0, 18),
    ("MUF-BLU", "Blueberry Muffin", 350, 0, 24),
    ("SND-HAM", "Ham & Cheese Toastie", 725, 0, 12),
    ("SND-VEG", "Halloumi Wrap", 795, 0, 8),
    ("BNS-1KG", "House Blend Beans 1kg", 2_400, 0, 15),
    ("BNS-250", "Single Origin Beans 250g", 1_150, 0, 6),
    ("MUG-CER", "Ceramic Mug", 1_800, 2_000, 10),
    ("CUP-KPT", "KeepCup 12oz", 2_200, 2_000, 4),
    ("WTR-STL", "Still Water", 180, 700, 60),
    ("WTR-SPK", "Sparkling Water", 200, 700, 0),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ayesha Khan", "ayesha@example.com"),
    ("Bilal Ahmed", "bilal@example.com"),
    ("Sara Malik", "sara@example.com"),
];

struct Args {
    db_path: String,
    tenant_id: String,
}

impl Args {
    /// `None` when `--help` was requested.
    fn parse() -> Option<Self> {
        let mut args = Args {
            db_path: "./meridian_dev.db".to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
        };

        let mut argv = std::env::args().skip(1);
        while let Some(flag) = argv.next() {
            match flag.as_str() {
                "--db" | "-d" => {
                    if let Some(path) = argv.next() {
                        args.db_path = path;
                    }
                }
                "--tenant" | "-t" => {
                    if let Some(tenant) = argv.next() {
                        args.tenant_id = tenant;
                    }
                }
                "--help" | "-h" => {
                    println!("Usage: seed [--db <PATH>] [--tenant <ID>]");
                    println!();
                    println!("  -d, --db <PATH>     SQLite file (default: ./meridian_dev.db)");
                    println!("  -t, --tenant <ID>   Tenant to seed (default: {DEFAULT_TENANT_ID})");
                    return None;
                }
                other => eprintln!("Ignoring unknown argument '{other}'"),
            }
        }
        Some(args)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = Args::parse() else {
        return Ok(());
    };

    let db = Database::new(DbConfig::new(&args.db_path)).await?;
    println!("Seeding {} for tenant {}", args.db_path, args.tenant_id);

    if db.products().count(&args.tenant_id).await? > 0 {
        println!("Tenant already has products; nothing to do.");
        return Ok(());
    }

    let now = Utc::now();
    let mut units = 0;
    for (sku, name, price, tax_bps, stock) in CATALOG {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: args.tenant_id.clone(),
            sku: sku.to_string(),
            barcode: None,
            name: name.to_string(),
            category_id: sku.split('-').next().map(str::to_string),
            cost_price: Money::from_cents(price * 45 / 100),
            selling_price: Money::from_cents(*price),
            tax_rate_bps: *tax_bps,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;
        db.ledger()
            .set_absolute(&product.id, &args.tenant_id, DEFAULT_LOCATION, *stock)
            .await?;
        units += stock;
    }

    for (name, email) in CUSTOMERS {
        db.customers()
            .insert(&Customer {
                id: Uuid::new_v4().to_string(),
                tenant_id: args.tenant_id.clone(),
                name: name.to_string(),
                email: Some(email.to_string()),
                loyalty_points: 0,
                total_spent: Money::zero(),
                last_visit: None,
                created_at: now,
            })
            .await?;
    }

    println!(
        "{} products ({} units at '{}'), {} customers",
        CATALOG.len(),
        units,
        DEFAULT_LOCATION,
        CUSTOMERS.len()
    );

    let low = db.ledger().low_stock(&args.tenant_id, 10).await?;
    if !low.is_empty() {
        println!("Low stock:");
        for record in low {
            println!("  {:<38} {:>4}", record.product_id, record.quantity);
        }
    }

    db.close().await;
    Ok(())
}
