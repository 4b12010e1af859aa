//! # Inventory Ledger
//!
//! The only code path that changes `products.stock_quantity`.
//!
//! ## One Ledger Entry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_stock_change(conn, product, kind, qty, reason, actor)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load product ─────────────── missing ──► ProductNotFound               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_stock_change (till-core) ─ negative ──► InsufficientStock         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products                                                        │
//! │     SET stock_quantity = stock_quantity + Δ                             │
//! │   WHERE id = ? AND stock_quantity + Δ >= 0    ── no row ──► Insufficient│
//! │   RETURNING ...                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT inventory_movements (previous, new, |qty|, reason, actor)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guarded UPDATE makes check-and-write a single statement, so two
//! units of work racing on the same product can never drive stock below
//! zero. Both writes share the caller's connection: inside a checkout
//! they commit or roll back with the sale.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use till_core::inventory::{plan_stock_change, StockChange};
use till_core::validation::{validate_optional, validate_required};
use till_core::{CoreError, InventoryMovement, MovementKind, Product};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::product::{fetch_product, PRODUCT_COLUMNS};

const MOVEMENT_COLUMNS: &str = r#"
    id, product_id, user_id, movement_type, quantity,
    previous_stock, new_stock, reason, notes, created_at
"#;

/// A direct stock adjustment request.
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    /// Units moved for `in`/`out`, target level for `adjustment`.
    pub quantity: i64,
    #[serde(rename = "type")]
    pub kind: MovementKind,
    pub reason: String,
    pub notes: Option<String>,
}

/// Applies one ledger entry on `conn`.
///
/// Writes the new stock level and exactly one movement, or nothing.
/// Does not commit; the caller owns the unit of work.
#[allow(clippy::too_many_arguments)]
pub async fn apply_stock_change(
    conn: &mut SqliteConnection,
    product_id: i64,
    kind: MovementKind,
    quantity: i64,
    reason: &str,
    notes: Option<&str>,
    actor_id: i64,
    now: DateTime<Utc>,
) -> DbResult<(Product, InventoryMovement)> {
    let product = fetch_product(&mut *conn, product_id)
        .await?
        .ok_or(CoreError::ProductNotFound(product_id))?;

    let planned = plan_stock_change(&product, kind, quantity)?;

    let updated = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?2, updated_at = ?3
        WHERE id = ?1 AND stock_quantity + ?2 >= 0
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(product_id)
    .bind(planned.delta())
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(updated) = updated else {
        // Guard failed: report what is actually on hand now.
        let available = fetch_product(&mut *conn, product_id)
            .await?
            .map_or(0, |p| p.stock_quantity);
        return Err(CoreError::InsufficientStock {
            product: product.name,
            sku: product.sku,
            available,
            requested: quantity,
        }
        .into());
    };

    let applied = StockChange {
        previous_stock: updated.stock_quantity - planned.delta(),
        new_stock: updated.stock_quantity,
        ..planned
    };

    let movement = insert_movement(&mut *conn, product_id, actor_id, &applied, reason, notes, now).await?;

    debug!(
        product_id,
        kind = ?kind,
        previous = applied.previous_stock,
        new = applied.new_stock,
        "Stock changed"
    );

    Ok((updated, movement))
}

/// Appends a movement row. Movements are never updated or deleted.
pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    product_id: i64,
    actor_id: i64,
    change: &StockChange,
    reason: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<InventoryMovement> {
    let movement = sqlx::query_as::<_, InventoryMovement>(&format!(
        r#"
        INSERT INTO inventory_movements (
            product_id, user_id, movement_type, quantity,
            previous_stock, new_stock, reason, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING {MOVEMENT_COLUMNS}
        "#
    ))
    .bind(product_id)
    .bind(actor_id)
    .bind(change.kind)
    .bind(change.quantity)
    .bind(change.previous_stock)
    .bind(change.new_stock)
    .bind(reason)
    .bind(notes)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(movement)
}

/// Stock adjustments and the movement audit trail.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    /// Applies a direct stock adjustment as its own atomic unit.
    ///
    /// ## Returns
    /// * `Ok((product, movement))` - the product after the change
    /// * `Err(DbError::Domain(InsufficientStock))` - nothing written
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        adjustment: &StockAdjustment,
        actor_id: i64,
    ) -> DbResult<(Product, InventoryMovement)> {
        validate_required("reason", &adjustment.reason, 255)?;
        validate_optional("notes", adjustment.notes.as_deref(), 1000)?;

        let mut tx = begin_write(&self.pool).await?;

        let (product, movement) = apply_stock_change(
            &mut tx,
            product_id,
            adjustment.kind,
            adjustment.quantity,
            adjustment.reason.trim(),
            adjustment.notes.as_deref(),
            actor_id,
            Utc::now(),
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id,
            sku = %product.sku,
            kind = ?movement.movement_type,
            new_stock = movement.new_stock,
            actor_id,
            "Stock adjusted"
        );

        Ok((product, movement))
    }

    /// Movements of one product, newest first.
    pub async fn movements(&self, product_id: i64) -> DbResult<Vec<InventoryMovement>> {
        let mut conn = self.pool.acquire().await?;

        if fetch_product(&mut conn, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let movements = sqlx::query_as::<_, InventoryMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE product_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
