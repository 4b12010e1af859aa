//! Shared fixtures for this crate's tests.

use std::path::PathBuf;
use std::{env, fs, process};

use chrono::Utc;
use till_core::checkout::{CartLine, CheckoutConfig, CheckoutRequest};
use till_core::{Category, DiscountKind, PaymentMethod, Product, Role, Transaction, User};

use crate::repository::category::NewCategory;
use crate::repository::discount::NewDiscount;
use crate::repository::product::NewProduct;
use crate::repository::user::NewUser;
use crate::{Database, DbConfig};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A database file under the temp dir, deleted (with its WAL files) on drop.
///
/// Unlike [`test_db`] the pool can hold several connections, so units of
/// work really run side by side.
pub(crate) struct TempDbFile(PathBuf);

impl TempDbFile {
    pub(crate) fn new(name: &str) -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        TempDbFile(env::temp_dir().join(format!("till-{name}-{}-{nanos}.db", process::id())))
    }

    pub(crate) fn config(&self) -> DbConfig {
        DbConfig::new(self.0.clone())
    }
}

impl Drop for TempDbFile {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = fs::remove_file(format!("{}{suffix}", self.0.display()));
        }
    }
}

pub(crate) fn new_user(employee_id: &str, email: &str, role: Role) -> NewUser {
    NewUser {
        employee_id: employee_id.to_string(),
        first_name: "Ana".to_string(),
        middle_name: None,
        last_name: "Reyes".to_string(),
        suffix: None,
        email: email.to_string(),
        role,
        phone: None,
        address: None,
        birth_date: None,
        hire_date: None,
        salary_cents: None,
    }
}

pub(crate) fn new_product(sku: &str, category_id: i64, price_cents: i64, stock: i64, min_stock: i64) -> NewProduct {
    NewProduct {
        name: format!("Product {sku}"),
        description: None,
        sku: sku.to_string(),
        barcode: None,
        price_cents,
        cost_price_cents: price_cents / 2,
        stock_quantity: stock,
        min_stock_level: min_stock,
        category_id,
        brand: None,
        weight_grams: None,
    }
}

/// 10% off orders of $50.00 or more.
pub(crate) fn save10() -> NewDiscount {
    NewDiscount {
        name: "Save 10".to_string(),
        description: None,
        code: Some("SAVE10".to_string()),
        discount_type: DiscountKind::Percentage,
        value: 1000,
        minimum_amount_cents: Some(5000),
        start_date: None,
        end_date: None,
        usage_limit: None,
    }
}

pub(crate) struct Fixture {
    pub admin: User,
    pub category: Category,
    /// "Cola 330ml": $10.00, stock 10, reorder at 5.
    pub product: Product,
}

pub(crate) async fn seed_catalog(db: &Database) -> Fixture {
    let admin = db
        .users()
        .insert(&new_user("EMP-0001", "admin@till.local", Role::Admin), "hash")
        .await
        .unwrap();

    let category = db
        .categories()
        .insert(&NewCategory {
            name: "Beverages".to_string(),
            description: None,
        })
        .await
        .unwrap();

    let product = db
        .products()
        .insert(
            &NewProduct {
                name: "Cola 330ml".to_string(),
                ..new_product("COLA-330", category.id, 1000, 10, 5)
            },
            admin.id,
        )
        .await
        .unwrap();

    Fixture {
        admin,
        category,
        product,
    }
}

/// Cart of `quantity` fixture products at list price, paid in cash.
pub(crate) fn cart(fx: &Fixture, quantity: i64) -> CheckoutRequest {
    CheckoutRequest {
        customer_id: None,
        items: vec![CartLine {
            product_id: fx.product.id,
            quantity,
            unit_price_cents: fx.product.price_cents,
            discount_amount_cents: 0,
        }],
        discount_code: None,
        payment_method: PaymentMethod::Cash,
        amount_paid_cents: 100_000,
        notes: None,
    }
}

/// Completes a sale through the checkout engine.
pub(crate) async fn record_sale(db: &Database, fx: &Fixture, quantity: i64) -> Transaction {
    db.checkout(CheckoutConfig::default())
        .checkout(fx.admin.id, &cart(fx, quantity))
        .await
        .unwrap()
        .transaction
}
