//! # Category Repository

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use till_core::validation::{validate_optional, validate_required};
use till_core::{Category, CategorySummary, Product, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::product::PRODUCT_COLUMNS;

const CATEGORY_COLUMNS: &str = "id, name, description, is_active, created_at, updated_at";

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("name", &self.name, 255)?;
        validate_optional("description", self.description.as_deref(), 1000)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Active categories with their active product counts, by name.
    pub async fn list_active(&self) -> DbResult<Vec<CategorySummary>> {
        let categories = sqlx::query_as::<_, CategorySummary>(
            r#"
            SELECT c.id, c.name, c.description, c.is_active,
                   (SELECT COUNT(*) FROM products p
                     WHERE p.category_id = c.id AND p.is_active = 1) AS products_count
            FROM categories c
            WHERE c.is_active = 1
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get(&self, id: i64) -> DbResult<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Active products of a category, by name.
    pub async fn products(&self, id: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category_id = ?1 AND is_active = 1 ORDER BY name"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn insert(&self, new: &NewCategory) -> DbResult<Category> {
        new.validate()?;
        debug!(name = %new.name, "Inserting category");

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (name, description, is_active, created_at, updated_at)
            VALUES (?1, ?2, 1, ?3, ?3)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    pub async fn update(&self, id: i64, update: &CategoryUpdate) -> DbResult<Category> {
        if let Some(name) = &update.name {
            validate_required("name", name, 255)?;
        }
        debug!(id, "Updating category");

        sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories SET
                name        = COALESCE(?2, name),
                description = COALESCE(?3, description),
                is_active   = COALESCE(?4, is_active),
                updated_at  = ?5
            WHERE id = ?1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.description)
        .bind(update.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Soft delete. Products keep their reference.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deactivating category");

        let result = sqlx::query("UPDATE categories SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }
}
