//! # Product Repository
//!
//! Catalog operations for products.
//!
//! ## Key Operations
//! - Filtered listing (search, category, low stock)
//! - CRUD, with soft delete
//! - Creation with an "Initial stock" ledger entry
//!
//! Catalog edits never touch `stock_quantity`; stock moves only through
//! [`crate::repository::inventory`].

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use till_core::inventory::{StockChange, INITIAL_STOCK_REASON};
use till_core::validation::{
    validate_non_negative, validate_optional, validate_product_name, validate_search_query, validate_sku,
    validate_stock_level,
};
use till_core::{MovementKind, Product, ValidationError};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::inventory::insert_movement;

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    id, name, description, sku, barcode, price_cents, cost_price_cents,
    stock_quantity, min_stock_level, category_id, brand, weight_grams,
    is_active, created_at, updated_at
"#;

/// Loads a product on an existing connection (inside a unit of work).
pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Catalog entry for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_price_cents: i64,
    /// Units on hand at creation, recorded as an `in` movement.
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
    pub category_id: i64,
    pub brand: Option<String>,
    pub weight_grams: Option<i64>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_product_name(&self.name)?;
        validate_sku(&self.sku)?;
        validate_optional("barcode", self.barcode.as_deref(), 100)?;
        validate_non_negative("price", self.price_cents)?;
        validate_non_negative("cost_price", self.cost_price_cents)?;
        validate_stock_level("stock_quantity", self.stock_quantity)?;
        validate_stock_level("min_stock_level", self.min_stock_level)?;
        validate_optional("brand", self.brand.as_deref(), 255)?;
        if let Some(weight) = self.weight_grams {
            validate_non_negative("weight", weight)?;
        }
        Ok(())
    }
}

/// Partial catalog edit. Stock is not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_price_cents: Option<i64>,
    pub min_stock_level: Option<i64>,
    pub category_id: Option<i64>,
    pub brand: Option<String>,
    pub weight_grams: Option<i64>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_product_name(name)?;
        }
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        for (field, value) in [
            ("price", self.price_cents),
            ("cost_price", self.cost_price_cents),
            ("weight", self.weight_grams),
        ] {
            if let Some(value) = value {
                validate_non_negative(field, value)?;
            }
        }
        if let Some(min_stock_level) = self.min_stock_level {
            validate_stock_level("min_stock_level", min_stock_level)?;
        }
        Ok(())
    }
}

/// Listing filters. All optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Matches name, SKU or barcode.
    pub search: Option<String>,
    pub category_id: Option<i64>,
    /// Only products at or below their reorder threshold.
    #[serde(default)]
    pub low_stock: bool,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let search = match filter.search.as_deref() {
            Some(q) => Some(validate_search_query(q)?).filter(|q| !q.is_empty()),
            None => None,
        };
        let pattern = search.map(|q| format!("%{}%", q));

        debug!(pattern = ?pattern, category_id = ?filter.category_id, low_stock = filter.low_stock, "Listing products");

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (?1 IS NULL OR name LIKE ?1 OR sku LIKE ?1 OR barcode LIKE ?1)
              AND (?2 IS NULL OR category_id = ?2)
              AND (?3 = 0 OR stock_quantity <= min_stock_level)
            ORDER BY name
            "#
        ))
        .bind(pattern)
        .bind(filter.category_id)
        .bind(filter.low_stock)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by id, active or not.
    pub async fn get(&self, id: i64) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Gets a product by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// When `stock_quantity > 0` an `in` movement "Initial stock" is
    /// recorded in the same transaction, so the ledger explains the
    /// opening level.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU or barcode already exists
    /// * `Err(DbError::ForeignKeyViolation)` - unknown category
    pub async fn insert(&self, new: &NewProduct, actor_id: i64) -> DbResult<Product> {
        new.validate()?;
        debug!(sku = %new.sku, "Inserting product");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (
                name, description, sku, barcode, price_cents, cost_price_cents,
                stock_quantity, min_stock_level, category_id, brand, weight_grams,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?12)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(new.sku.trim())
        .bind(new.barcode.as_deref().map(str::trim).filter(|b| !b.is_empty()))
        .bind(new.price_cents)
        .bind(new.cost_price_cents)
        .bind(new.stock_quantity)
        .bind(new.min_stock_level)
        .bind(new.category_id)
        .bind(&new.brand)
        .bind(new.weight_grams)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if product.stock_quantity > 0 {
            let opening = StockChange {
                kind: MovementKind::In,
                previous_stock: 0,
                new_stock: product.stock_quantity,
                quantity: product.stock_quantity,
            };
            insert_movement(&mut tx, product.id, actor_id, &opening, INITIAL_STOCK_REASON, None, now).await?;
        }

        tx.commit().await?;

        info!(id = product.id, sku = %product.sku, stock = product.stock_quantity, "Product created");
        Ok(product)
    }

    /// Applies a partial catalog edit.
    pub async fn update(&self, id: i64, update: &ProductUpdate) -> DbResult<Product> {
        update.validate()?;
        debug!(id, "Updating product");

        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                name             = COALESCE(?2, name),
                description      = COALESCE(?3, description),
                sku              = COALESCE(?4, sku),
                barcode          = COALESCE(?5, barcode),
                price_cents      = COALESCE(?6, price_cents),
                cost_price_cents = COALESCE(?7, cost_price_cents),
                min_stock_level  = COALESCE(?8, min_stock_level),
                category_id      = COALESCE(?9, category_id),
                brand            = COALESCE(?10, brand),
                weight_grams     = COALESCE(?11, weight_grams),
                is_active        = COALESCE(?12, is_active),
                updated_at       = ?13
            WHERE id = ?1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.description)
        .bind(update.sku.as_deref().map(str::trim))
        .bind(&update.barcode)
        .bind(update.price_cents)
        .bind(update.cost_price_cents)
        .bind(update.min_stock_level)
        .bind(update.category_id)
        .bind(&update.brand)
        .bind(update.weight_grams)
        .bind(update.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Past sales and movements keep referencing it.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Active products at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1 AND stock_quantity <= min_stock_level
            ORDER BY stock_quantity, name
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
