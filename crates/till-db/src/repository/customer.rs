//! # Customer Repository
//!
//! Customer records plus the purchase aggregates maintained by checkout.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use till_core::validation::{validate_email, validate_optional, validate_required, validate_search_query};
use till_core::{CoreError, Customer, Gender, Transaction, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::transaction::TRANSACTION_COLUMNS;

const CUSTOMER_COLUMNS: &str = r#"
    id, first_name, last_name, email, phone, address, birth_date, gender,
    total_spent_cents, total_orders, last_purchase_at, is_active, created_at, updated_at
"#;

/// Fields a client may write. Aggregates are not among them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub is_active: Option<bool>,
}

impl CustomerInput {
    /// Create requires both name parts; update only checks what is present.
    pub fn validate(&self, creating: bool) -> Result<(), ValidationError> {
        match (&self.first_name, creating) {
            (Some(name), _) => validate_required("first_name", name, 255)?,
            (None, true) => return Err(ValidationError::required("first_name")),
            (None, false) => {}
        }
        match (&self.last_name, creating) {
            (Some(name), _) => validate_required("last_name", name, 255)?,
            (None, true) => return Err(ValidationError::required("last_name")),
            (None, false) => {}
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        validate_optional("phone", self.phone.as_deref(), 20)?;
        validate_optional("address", self.address.as_deref(), 1000)
    }
}

/// Adds one completed sale to a customer's aggregates.
///
/// Runs on the checkout's connection so the increments commit with the
/// sale.
pub(crate) async fn record_purchase(
    conn: &mut SqliteConnection,
    customer_id: i64,
    total_amount_cents: i64,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers SET
            total_orders      = total_orders + 1,
            total_spent_cents = total_spent_cents + ?2,
            last_purchase_at  = ?3,
            updated_at        = ?3
        WHERE id = ?1
        "#,
    )
    .bind(customer_id)
    .bind(total_amount_cents)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::CustomerNotFound(customer_id).into());
    }

    Ok(())
}

pub(crate) async fn customer_exists(conn: &mut SqliteConnection, customer_id: i64) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE id = ?1")
        .bind(customer_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Active customers by last name; `search` matches names, email, phone.
    pub async fn list(&self, search: Option<&str>) -> DbResult<Vec<Customer>> {
        let pattern = match search {
            Some(q) => Some(validate_search_query(q)?).filter(|q| !q.is_empty()),
            None => None,
        }
        .map(|q| format!("%{}%", q));

        let customers = sqlx::query_as::<_, Customer>(&format!(
            r#"
            SELECT {CUSTOMER_COLUMNS}
            FROM customers
            WHERE is_active = 1
              AND (?1 IS NULL OR first_name LIKE ?1 OR last_name LIKE ?1
                   OR email LIKE ?1 OR phone LIKE ?1)
            ORDER BY last_name, first_name
            "#
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    pub async fn get(&self, id: i64) -> DbResult<Customer> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn insert(&self, input: &CustomerInput) -> DbResult<Customer> {
        input.validate(true)?;
        debug!("Inserting customer");

        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (
                first_name, last_name, email, phone, address, birth_date, gender,
                total_spent_cents, total_orders, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, 1, ?8, ?8)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(input.first_name.as_deref().map(str::trim))
        .bind(input.last_name.as_deref().map(str::trim))
        .bind(input.email.as_deref().map(str::trim))
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.birth_date)
        .bind(input.gender)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn update(&self, id: i64, input: &CustomerInput) -> DbResult<Customer> {
        input.validate(false)?;
        debug!(id, "Updating customer");

        sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customers SET
                first_name = COALESCE(?2, first_name),
                last_name  = COALESCE(?3, last_name),
                email      = COALESCE(?4, email),
                phone      = COALESCE(?5, phone),
                address    = COALESCE(?6, address),
                birth_date = COALESCE(?7, birth_date),
                gender     = COALESCE(?8, gender),
                is_active  = COALESCE(?9, is_active),
                updated_at = ?10
            WHERE id = ?1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.first_name.as_deref().map(str::trim))
        .bind(input.last_name.as_deref().map(str::trim))
        .bind(input.email.as_deref().map(str::trim))
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.birth_date)
        .bind(input.gender)
        .bind(input.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Soft delete. Past transactions keep the reference.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE customers SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// The customer's latest transactions, newest first.
    pub async fn recent_transactions(&self, id: i64, limit: i64) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE customer_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#
        ))
        .bind(id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Active customers count.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
