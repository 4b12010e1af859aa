//! # Transaction Repository
//!
//! Read side of completed sales plus the row writers the Checkout Engine
//! uses inside its unit of work.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use till_core::checkout::{CartLine, Totals};
use till_core::{PaymentMethod, Transaction, TransactionItem, TransactionStatus};

use crate::error::{DbError, DbResult};

pub(crate) const TRANSACTION_COLUMNS: &str = r#"
    id, transaction_number, user_id, customer_id, discount_id,
    subtotal_cents, discount_amount_cents, tax_amount_cents, total_amount_cents,
    amount_paid_cents, change_amount_cents, payment_method, status, notes,
    completed_at, created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, transaction_id, product_id, quantity, unit_price_cents,
    discount_amount_cents, total_price_cents, created_at
"#;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<TransactionStatus>,
}

/// Row values for a new sale header.
#[derive(Debug)]
pub(crate) struct NewSale<'a> {
    pub number: &'a str,
    pub user_id: i64,
    pub customer_id: Option<i64>,
    pub discount_id: Option<i64>,
    pub totals: &'a Totals,
    pub payment_method: PaymentMethod,
    pub notes: Option<&'a str>,
}

pub(crate) async fn insert_transaction(
    conn: &mut SqliteConnection,
    sale: &NewSale<'_>,
    now: DateTime<Utc>,
) -> DbResult<Transaction> {
    let transaction = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        INSERT INTO transactions (
            transaction_number, user_id, customer_id, discount_id,
            subtotal_cents, discount_amount_cents, tax_amount_cents, total_amount_cents,
            amount_paid_cents, change_amount_cents, payment_method, status, notes,
            completed_at, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14, ?14)
        RETURNING {TRANSACTION_COLUMNS}
        "#
    ))
    .bind(sale.number)
    .bind(sale.user_id)
    .bind(sale.customer_id)
    .bind(sale.discount_id)
    .bind(sale.totals.subtotal.cents())
    .bind(sale.totals.discount.cents())
    .bind(sale.totals.tax.cents())
    .bind(sale.totals.total.cents())
    .bind(sale.totals.amount_paid.cents())
    .bind(sale.totals.change.cents())
    .bind(sale.payment_method)
    .bind(TransactionStatus::Completed)
    .bind(sale.notes)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(transaction)
}

pub(crate) async fn insert_item(
    conn: &mut SqliteConnection,
    transaction_id: i64,
    line: &CartLine,
    now: DateTime<Utc>,
) -> DbResult<TransactionItem> {
    let item = sqlx::query_as::<_, TransactionItem>(&format!(
        r#"
        INSERT INTO transaction_items (
            transaction_id, product_id, quantity, unit_price_cents,
            discount_amount_cents, total_price_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(transaction_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.discount_amount_cents)
    .bind(line.total()?.cents())
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(item)
}

pub(crate) async fn transaction_number_of(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<String>> {
    let number = sqlx::query_scalar("SELECT transaction_number FROM transactions WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(number)
}

/// One line of the daily top-sellers table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductSales {
    pub product_id: i64,
    pub name: String,
    pub sku: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total_transactions: i64,
    pub total_sales_cents: i64,
    pub total_discounts_cents: i64,
    pub average_sale_cents: f64,
    pub top_products: Vec<ProductSales>,
}

#[derive(Debug, FromRow)]
struct DayTotals {
    total_transactions: i64,
    total_sales_cents: i64,
    total_discounts_cents: i64,
    average_sale_cents: f64,
}

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Transactions newest first. Date bounds are inclusive calendar days.
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE (?1 IS NULL OR substr(created_at, 1, 10) >= ?1)
              AND (?2 IS NULL OR substr(created_at, 1, 10) <= ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    pub async fn get(&self, id: i64) -> DbResult<Transaction> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Transaction", id))
    }

    /// Line items in cart order.
    pub async fn items(&self, transaction_id: i64) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ?1 ORDER BY id"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Completed-sale totals for one calendar day.
    pub async fn daily_sales(&self, date: NaiveDate) -> DbResult<DailySales> {
        let totals = sqlx::query_as::<_, DayTotals>(
            r#"
            SELECT COUNT(*) AS total_transactions,
                   CAST(COALESCE(SUM(total_amount_cents), 0) AS INTEGER) AS total_sales_cents,
                   CAST(COALESCE(SUM(discount_amount_cents), 0) AS INTEGER) AS total_discounts_cents,
                   COALESCE(AVG(total_amount_cents), 0.0) AS average_sale_cents
            FROM transactions
            WHERE status = 'completed' AND substr(created_at, 1, 10) = ?1
            "#,
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        let top_products = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT p.id AS product_id, p.name, p.sku,
                   CAST(SUM(ti.quantity) AS INTEGER) AS quantity_sold,
                   CAST(SUM(ti.total_price_cents) AS INTEGER) AS revenue_cents
            FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            JOIN products p ON p.id = ti.product_id
            WHERE t.status = 'completed' AND substr(t.created_at, 1, 10) = ?1
            GROUP BY p.id, p.name, p.sku
            ORDER BY quantity_sold DESC, revenue_cents DESC
            LIMIT 10
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(DailySales {
            date,
            total_transactions: totals.total_transactions,
            total_sales_cents: totals.total_sales_cents,
            total_discounts_cents: totals.total_discounts_cents,
            average_sale_cents: totals.average_sale_cents,
            top_products,
        })
    }
}
