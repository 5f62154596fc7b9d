//! # Seed Data Generator
//!
//! Populates the database with development data: an admin, a worker
//! sub-user, a handful of buyers, and a stocked inventory.
//!
//! ## Usage
//! ```bash
//! # Default: 200 inventory items into ./mana_dev.db
//! cargo run -p mana-db --bin seed
//!
//! # Custom amount
//! cargo run -p mana-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p mana-db --bin seed -- --db ./data/mana.db
//! ```

use chrono::Utc;
use std::env;
use uuid::Uuid;

use mana_core::{Buyer, InventoryItem, Role, User};
use mana_db::{BuyerRepo, Database, DbConfig, InventoryRepo, UserRepo};

/// Category codes with product name pools.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "flower",
        &[
            "Northern Lights", "Blue Dream", "Sour Diesel", "OG Kush",
            "Granddaddy Purple", "White Widow", "Jack Herer", "Pineapple Express",
            "Gelato", "Wedding Cake", "Gorilla Glue", "Durban Poison",
        ],
    ),
    (
        "concentrate",
        &[
            "Live Resin", "Shatter", "Budder", "Crumble", "Distillate",
            "Rosin", "Sauce", "Diamonds",
        ],
    ),
    (
        "edible",
        &[
            "Gummy Pack", "Chocolate Bar", "Cookie Bites", "Hard Candy",
            "Caramel Chews", "Mints",
        ],
    ),
];

/// Unit variants with a price bump in cents.
const UNITS: &[(&str, i64)] = &[
    ("gram", 0),
    ("eighth", 2500),
    ("quarter", 5500),
    ("half", 10000),
    ("ounce", 18000),
];

const BUYER_NAMES: &[(&str, &str)] = &[
    ("Marcus", "Webb"),
    ("Elena", "Vasquez"),
    ("Derek", "Holt"),
    ("Priya", "Nair"),
    ("Tomas", "Lindgren"),
    ("Aisha", "Okafor"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./mana_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MANA Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of inventory items (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./mana_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 MANA Ledger Seed Data Generator");
    println!("==================================");
    println!("Database:  {}", db_path);
    println!("Inventory: {} items", count);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
        .fetch_one(db.pool())
        .await?;
    if existing > 0 {
        println!("⚠ Database already has {} inventory items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let start = std::time::Instant::now();

    let mut tx = db.begin().await?;

    // Admin user who owns the books, plus one worker sub-user.
    let admin_id = Uuid::new_v4().to_string();
    UserRepo::new(&mut tx)
        .insert(&User {
            id: admin_id.clone(),
            created_by: None,
            role: Role::Admin,
            name: "Dev Admin".into(),
            cash_balance_cents: 500_000,
            created_at: now,
            updated_at: now,
        })
        .await?;

    let worker_id = Uuid::new_v4().to_string();
    UserRepo::new(&mut tx)
        .insert(&User {
            id: worker_id.clone(),
            created_by: Some(admin_id.clone()),
            role: Role::User,
            name: "Dev Worker".into(),
            cash_balance_cents: 0,
            created_at: now,
            updated_at: now,
        })
        .await?;

    println!("✓ Created admin {} and worker {}", admin_id, worker_id);

    // Buyers with a mix of starting balances.
    let mut buyer_count = 0;
    for (idx, (first, last)) in BUYER_NAMES.iter().enumerate() {
        let starting = (idx as i64 - 2) * 15_000; // some owe us, we owe some
        BuyerRepo::new(&mut tx)
            .insert(&Buyer {
                id: Uuid::new_v4().to_string(),
                user_id: admin_id.clone(),
                admin_id: None,
                first_name: (*first).into(),
                last_name: (*last).into(),
                email: Some(format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase())),
                phone: None,
                starting_balance_cents: starting,
                current_balance_cents: starting,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await?;
        buyer_count += 1;
    }

    println!("✓ Created {} buyers", buyer_count);

    // Inventory across categories and units.
    let mut generated = 0;
    'outer: for (category, names) in CATEGORIES {
        for (name_idx, name) in names.iter().enumerate() {
            for (unit, price_addon) in UNITS {
                if generated >= count {
                    break 'outer;
                }

                let seed = generated + name_idx;
                let price_cents = 800 + ((seed * 37) % 1200) as i64 + price_addon;
                let item = InventoryItem {
                    id: Uuid::new_v4().to_string(),
                    user_id: admin_id.clone(),
                    buyer_id: None,
                    category: (*category).into(),
                    name: format!("{} ({})", name, unit),
                    unit: (*unit).into(),
                    qty: (seed % 40) as f64,
                    price_cents,
                    shipping_cost_cents: ((seed * 13) % 300) as i64,
                    product_id: None,
                    reference_number: Some(format!("{}-{:04}", &category[..2].to_uppercase(), generated)),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                };

                InventoryRepo::new(&mut tx).insert(&item).await?;
                generated += 1;

                if generated % 100 == 0 {
                    println!("  Generated {} items...", generated);
                }
            }
        }
    }

    tx.commit().await?;

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} inventory items in {:?}", generated, elapsed);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
