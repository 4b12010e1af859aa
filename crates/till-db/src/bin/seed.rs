//! # Seed Data Generator
//!
//! Populates an empty database with an admin account, default categories
//! and a small sample catalog for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p till-db --bin seed
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! The admin signs in as `admin@till.local`. The password is taken from
//! `TILL_SEED_ADMIN_PASSWORD` and falls back to `change-me-now`.

use std::env;

use anyhow::Context;
use till_core::Role;
use till_db::password::hash_password;
use till_db::repository::category::NewCategory;
use till_db::repository::product::NewProduct;
use till_db::repository::user::NewUser;
use till_db::{Database, DbConfig};

const ADMIN_EMAIL: &str = "admin@till.local";
const DEFAULT_ADMIN_PASSWORD: &str = "change-me-now";

const CATEGORIES: &[(&str, &str)] = &[
    ("Beverages", "Soft drinks, water, juice and coffee"),
    ("Snacks", "Chips, candy and biscuits"),
    ("Dairy", "Milk, cheese and yogurt"),
    ("Grocery", "Canned goods, pasta and rice"),
    ("Household", "Cleaning and paper products"),
];

/// (category index, sku, name, price cents, stock, reorder level)
const PRODUCTS: &[(usize, &str, &str, i64, i64, i64)] = &[
    (0, "BEV-COLA-330", "Cola 330ml", 150, 120, 24),
    (0, "BEV-WATER-500", "Mineral Water 500ml", 90, 200, 48),
    (0, "BEV-OJ-1L", "Orange Juice 1L", 325, 40, 10),
    (0, "BEV-COFFEE-200", "Ground Coffee 200g", 899, 15, 5),
    (1, "SNK-CHIPS-150", "Potato Chips 150g", 275, 60, 12),
    (1, "SNK-CHOC-50", "Milk Chocolate Bar 50g", 120, 80, 20),
    (1, "SNK-COOKIE-300", "Butter Cookies 300g", 450, 4, 6),
    (2, "DRY-MILK-1L", "Fresh Milk 1L", 210, 30, 10),
    (2, "DRY-CHEESE-200", "Cheddar 200g", 560, 12, 4),
    (2, "DRY-YOG-125", "Strawberry Yogurt 125g", 95, 0, 12),
    (3, "GRC-RICE-5KG", "Jasmine Rice 5kg", 1450, 25, 5),
    (3, "GRC-PASTA-500", "Spaghetti 500g", 185, 70, 15),
    (4, "HSH-TISSUE-10", "Tissue Roll 10-pack", 699, 18, 6),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./till.db");

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
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./till.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Till Seed Data Generator");
    println!("========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.users().find_by_email(ADMIN_EMAIL).await?.is_some() {
        println!("⚠ {} already exists", ADMIN_EMAIL);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let password = env::var("TILL_SEED_ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());
    let admin = db
        .users()
        .insert(
            &NewUser {
                employee_id: "EMP-0001".to_string(),
                first_name: "System".to_string(),
                middle_name: None,
                last_name: "Administrator".to_string(),
                suffix: None,
                email: ADMIN_EMAIL.to_string(),
                role: Role::Admin,
                phone: None,
                address: None,
                birth_date: None,
                hire_date: None,
                salary_cents: None,
            },
            &hash_password(&password)?,
        )
        .await
        .context("creating admin user")?;
    println!("✓ Admin user {} (id {})", admin.email, admin.id);

    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        let category = db
            .categories()
            .insert(&NewCategory {
                name: name.to_string(),
                description: Some(description.to_string()),
            })
            .await
            .with_context(|| format!("creating category {name}"))?;
        category_ids.push(category.id);
    }
    println!("✓ {} categories", category_ids.len());

    let mut generated = 0;
    for (category_idx, sku, name, price_cents, stock, min_stock) in PRODUCTS {
        let product = NewProduct {
            name: name.to_string(),
            description: None,
            sku: sku.to_string(),
            barcode: None,
            price_cents: *price_cents,
            cost_price_cents: price_cents * 70 / 100,
            stock_quantity: *stock,
            min_stock_level: *min_stock,
            category_id: category_ids[*category_idx],
            brand: None,
            weight_grams: None,
        };

        if let Err(e) = db.products().insert(&product, admin.id).await {
            eprintln!("Failed to insert {}: {}", sku, e);
            continue;
        }
        generated += 1;
    }
    println!("✓ {} products with initial stock movements", generated);

    let low = db.products().low_stock().await?;
    println!("  Low stock: {} products", low.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
