//! # Seed Data Generator
//!
//! Populates the database with a small catalog and two coupons for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./till_dev.db with 8 products per category (default)
//! cargo run -p till-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p till-db --bin seed -- --count 20 --db ./data/till.db
//! ```
//!
//! ## Generated Data
//! - Categories: Beverages, Snacks, Dairy, Grocery
//! - Products: `{name} {size}`, price $0.99 - $9.99, stock 0 - 50
//! - Coupons: `WELCOME10` (10%, valid for a year) and `EXPIRED20`
//!   (20%, expired yesterday)

use chrono::{Duration, Local};
use std::env;
use till_core::Percentage;
use till_db::{Database, DbConfig};

/// Catalog for realistic test data
const CATALOG: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &[
            "Cola", "Lemon Soda", "Orange Juice", "Apple Juice", "Iced Tea", "Mineral Water",
            "Energy Drink", "Cold Brew",
        ],
    ),
    (
        "Snacks",
        &[
            "Salted Chips", "Tortilla Chips", "Pretzels", "Popcorn", "Chocolate Bar",
            "Gummy Bears", "Peanuts", "Granola Bar",
        ],
    ),
    (
        "Dairy",
        &[
            "Whole Milk", "Skim Milk", "Greek Yogurt", "Cheddar", "Butter", "Cream Cheese",
            "Mozzarella", "Kefir",
        ],
    ),
    (
        "Grocery",
        &[
            "Spaghetti", "Basmati Rice", "Tomato Sauce", "Canned Beans", "Olive Oil", "Oat Flakes",
            "Sea Salt", "Honey",
        ],
    ),
];

const SIZES: &[&str] = &["Small", "Regular", "Large"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 8;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(8);
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
                println!("Till POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Products per category (default: 8)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till POS Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products per category: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    for (category_idx, (category_name, names)) in CATALOG.iter().enumerate() {
        let category = db.categories().create(category_name).await?;

        let variants = names
            .iter()
            .flat_map(|name| SIZES.iter().map(move |size| (*name, *size)))
            .take(count);

        for (variant_idx, (name, size)) in variants.enumerate() {
            let seed = category_idx * 100 + variant_idx;
            let price_cents = 99 + ((seed * 37) % 900) as i64;
            let inventory = ((seed * 13) % 51) as i64;

            let full_name = format!("{} {}", name, size);
            match db
                .products()
                .create(&full_name, price_cents, inventory, &category.id)
                .await
            {
                Ok(_) => generated += 1,
                Err(e) => eprintln!("Failed to insert {}: {}", full_name, e),
            }
        }

        println!("  {}: done", category_name);
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    // Coupons straddling today so both apply outcomes can be tried by hand
    let today = Local::now().date_naive();
    db.coupons()
        .create("WELCOME10", Percentage::new(10)?, today + Duration::days(365))
        .await?;
    db.coupons()
        .create("EXPIRED20", Percentage::new(20)?, today - Duration::days(1))
        .await?;
    println!("✓ Coupons: WELCOME10 (valid), EXPIRED20 (expired)");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
