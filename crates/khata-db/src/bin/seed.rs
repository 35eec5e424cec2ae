//! # Seed Data Generator
//!
//! Populates the database with development data: an auto-parts catalog, a
//! couple of B2B retailers, and a delivery directory.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults
//! cargo run -p khata-db --bin seed
//!
//! # Specify database path
//! cargo run -p khata-db --bin seed -- --db ./data/khata.db
//! ```

use chrono::Utc;
use std::env;
use uuid::Uuid;

use khata_core::{Item, DEFAULT_SHOP_ID};
use khata_db::{Database, DbConfig};

/// Catalog entries: (name, part number, selling price in paisa, stock)
const CATALOG: &[(&str, &str, i64, i64)] = &[
    ("Brake Pad Set", "BP-2210", 450_000, 40),
    ("Brake Disc", "BD-1180", 780_000, 25),
    ("Oil Filter", "OF-3301", 85_000, 120),
    ("Air Filter", "AF-3310", 95_000, 100),
    ("Fuel Filter", "FF-3320", 110_000, 80),
    ("Spark Plug", "SP-4405", 60_000, 200),
    ("Timing Belt", "TB-5501", 520_000, 30),
    ("Fan Belt", "FB-5510", 180_000, 60),
    ("Clutch Plate", "CP-6601", 1_250_000, 15),
    ("Pressure Plate", "PP-6610", 1_100_000, 12),
    ("Shock Absorber", "SA-7701", 950_000, 24),
    ("Ball Joint", "BJ-7710", 240_000, 50),
    ("Tie Rod End", "TR-7720", 190_000, 55),
    ("Wheel Bearing", "WB-7730", 320_000, 45),
    ("Radiator Hose", "RH-8801", 140_000, 70),
    ("Thermostat", "TH-8810", 160_000, 65),
    ("Water Pump", "WP-8820", 680_000, 20),
    ("Alternator", "AL-9901", 2_400_000, 8),
    ("Starter Motor", "SM-9910", 2_100_000, 10),
    ("Battery 12V", "BT-9920", 1_800_000, 18),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./khata_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Khata Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./khata_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Khata Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.items().count(DEFAULT_SHOP_ID).await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding catalog...");

    let now = Utc::now();
    for (name, part_number, selling_price_paisa, stock_quantity) in CATALOG {
        let item = Item {
            id: Uuid::new_v4().to_string(),
            shop_id: DEFAULT_SHOP_ID.to_string(),
            category_id: None,
            subcategory_id: None,
            location_id: None,
            name: (*name).to_string(),
            part_number: Some((*part_number).to_string()),
            // Rough 25% margin for seed data
            purchase_price_paisa: selling_price_paisa * 3 / 4,
            selling_price_paisa: *selling_price_paisa,
            stock_quantity: *stock_quantity,
            created_at: now,
            updated_at: now,
        };

        db.items().insert(&item).await?;
    }

    println!("✓ {} items", CATALOG.len());

    let retailers = [
        ("Bilal Autos", "0301-5550001", 5_000_000),
        ("City Motors", "0302-5550002", 10_000_000),
        ("Highway Parts Center", "0303-5550003", 2_500_000),
    ];
    for (name, phone, credit_limit_paisa) in retailers {
        db.customers()
            .create_retailer(DEFAULT_SHOP_ID, name, Some(phone), "changeme", credit_limit_paisa)
            .await?;
    }

    println!("✓ {} retailers", retailers.len());

    db.delivery()
        .create_partner(DEFAULT_SHOP_ID, "Swift Logistics", Some("0311-5550010"), Some("LEB-1234"))
        .await?;
    db.delivery().create_staff(DEFAULT_SHOP_ID, "Imran").await?;

    println!("✓ Delivery directory");
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
