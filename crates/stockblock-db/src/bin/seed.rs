//! # Seed Data Generator
//!
//! Populates the item ledger with test items for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 items (default)
//! cargo run -p stockblock-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p stockblock-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p stockblock-db --bin seed -- --db ./data/stockblock.db
//! ```
//!
//! The catalogue is cycled until `--count` items exist. Each item gets a
//! price between $1.99 and $13.49 and a starting quantity between 0 and 100.
//! No blocks are created.

use std::env;

use stockblock_core::NewItem;
use stockblock_db::{Database, DbConfig};
use tracing::{info, warn};

/// Item categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "beverages",
        &["Cola", "Sparkling Water", "Orange Juice", "Iced Tea", "Cold Brew"],
    ),
    (
        "snacks",
        &["Potato Chips", "Pretzels", "Trail Mix", "Granola Bar", "Popcorn"],
    ),
    (
        "hardware",
        &["Hex Bolt", "Wood Screw", "Wall Anchor", "Hinge", "Cable Tie"],
    ),
    (
        "apparel",
        &["T-Shirt", "Hoodie", "Cap", "Socks", "Rain Jacket"],
    ),
];

/// Size variants
const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 100), ("L", 200), ("XL", 350)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    stockblock_db::init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./stockblock_dev.db");

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
                println!("Stockblock Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of items to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockblock_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, count, "Seeding items");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.items().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has items, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut round = 0;

    // Cycle the catalogue until `count` items exist.
    while generated < count {
        let before = generated;

        'round: for (category_idx, (category, names)) in CATEGORIES.iter().enumerate() {
            for (name_idx, name) in names.iter().enumerate() {
                for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                    if generated >= count {
                        break 'round;
                    }

                    let seed = round * 7919 + category_idx * 1000 + name_idx * 20 + size_idx;
                    let new_item = generate_item(category, name, size, *price_addon, round, seed);

                    if let Err(e) = db.items().create(&new_item).await {
                        warn!(name = %new_item.name, error = %e, "Failed to insert item");
                        continue;
                    }

                    generated += 1;
                }
            }
        }

        if generated == before {
            break;
        }
        round += 1;
    }

    info!(generated, elapsed = ?start.elapsed(), "Seed complete");
    db.close().await;

    Ok(())
}

/// Generates a single item with deterministic pseudo-random data.
fn generate_item(
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    round: usize,
    seed: usize,
) -> NewItem {
    let base_price = 199 + ((seed * 17) % 800) as i64;
    let name = match round {
        0 => format!("{} {}", name, size),
        n => format!("{} {} #{}", name, size, n + 1),
    };

    NewItem {
        name,
        category: category.to_string(),
        price_cents: base_price + price_addon,
        quantity: (seed % 101) as i64,
    }
}
