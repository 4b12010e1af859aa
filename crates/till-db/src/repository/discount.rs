//! # Discount Repository
//!
//! Discount rules, code lookup and the guarded usage counter.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use till_core::discount::{redeem_code, validate_rules};
use till_core::{CoreError, Discount, DiscountKind, Money};

use crate::error::{DbError, DbResult};

const DISCOUNT_COLUMNS: &str = r#"
    id, name, description, code, discount_type, value, minimum_amount_cents,
    start_date, end_date, usage_limit, used_count, is_active, created_at, updated_at
"#;

/// A new discount rule. `value` is basis points for percentages and
/// cents for fixed amounts.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDiscount {
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub discount_type: DiscountKind,
    pub value: i64,
    pub minimum_amount_cents: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub usage_limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscountUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub discount_type: Option<DiscountKind>,
    pub value: Option<i64>,
    pub minimum_amount_cents: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub usage_limit: Option<i64>,
    pub is_active: Option<bool>,
}

/// Answer to a code check at the register. Nothing is redeemed.
#[derive(Debug, Clone, Serialize)]
pub struct CodeCheck {
    pub discount: Discount,
    pub discount_amount_cents: i64,
}

fn normalized_code(code: Option<&str>) -> Option<String> {
    code.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string)
}

impl NewDiscount {
    fn draft(&self, now: DateTime<Utc>) -> Discount {
        Discount {
            id: 0,
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            code: normalized_code(self.code.as_deref()),
            discount_type: self.discount_type,
            value: self.value,
            minimum_amount_cents: self.minimum_amount_cents,
            start_date: self.start_date,
            end_date: self.end_date,
            usage_limit: self.usage_limit,
            used_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl DiscountUpdate {
    fn apply(&self, mut discount: Discount, now: DateTime<Utc>) -> Discount {
        if let Some(name) = &self.name {
            discount.name = name.trim().to_string();
        }
        if self.description.is_some() {
            discount.description = self.description.clone();
        }
        if self.code.is_some() {
            discount.code = normalized_code(self.code.as_deref());
        }
        discount.discount_type = self.discount_type.unwrap_or(discount.discount_type);
        discount.value = self.value.unwrap_or(discount.value);
        if self.minimum_amount_cents.is_some() {
            discount.minimum_amount_cents = self.minimum_amount_cents;
        }
        if self.start_date.is_some() {
            discount.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            discount.end_date = self.end_date;
        }
        if self.usage_limit.is_some() {
            discount.usage_limit = self.usage_limit;
        }
        discount.is_active = self.is_active.unwrap_or(discount.is_active);
        discount.updated_at = now;
        discount
    }
}

/// Looks a code up on `conn`, whatever its state.
pub(crate) async fn find_by_code_on(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Discount>> {
    let discount = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE code = ?1"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(discount)
}

/// Counts one use of a discount.
///
/// The limit is re-checked in the same statement, so concurrent sales can
/// never push `used_count` past `usage_limit`.
pub(crate) async fn redeem(
    conn: &mut SqliteConnection,
    discount: &Discount,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE discounts
        SET used_count = used_count + 1, updated_at = ?2
        WHERE id = ?1 AND is_active = 1
          AND (usage_limit IS NULL OR used_count < usage_limit)
        "#,
    )
    .bind(discount.id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let code = discount.code.clone().unwrap_or_else(|| discount.name.clone());
        return Err(CoreError::DiscountInvalid(code).into());
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// All discounts, newest first.
    pub async fn list(&self) -> DbResult<Vec<Discount>> {
        let discounts = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discounts ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    pub async fn get(&self, id: i64) -> DbResult<Discount> {
        sqlx::query_as::<_, Discount>(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Discount", id))
    }

    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Discount>> {
        let mut conn = self.pool.acquire().await?;
        find_by_code_on(&mut conn, code.trim()).await
    }

    pub async fn insert(&self, new: &NewDiscount) -> DbResult<Discount> {
        let draft = new.draft(Utc::now());
        validate_rules(&draft)?;
        debug!(name = %draft.name, code = ?draft.code, "Inserting discount");

        let discount = sqlx::query_as::<_, Discount>(&format!(
            r#"
            INSERT INTO discounts (
                name, description, code, discount_type, value, minimum_amount_cents,
                start_date, end_date, usage_limit, used_count, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 1, ?10, ?10)
            RETURNING {DISCOUNT_COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.code)
        .bind(draft.discount_type)
        .bind(draft.value)
        .bind(draft.minimum_amount_cents)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.usage_limit)
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(discount)
    }

    /// Merges `update` into the stored rule and re-validates the result.
    ///
    /// `used_count` is never written here.
    pub async fn update(&self, id: i64, update: &DiscountUpdate) -> DbResult<Discount> {
        let merged = update.apply(self.get(id).await?, Utc::now());
        validate_rules(&merged)?;
        debug!(id, "Updating discount");

        sqlx::query_as::<_, Discount>(&format!(
            r#"
            UPDATE discounts SET
                name = ?2, description = ?3, code = ?4, discount_type = ?5, value = ?6,
                minimum_amount_cents = ?7, start_date = ?8, end_date = ?9,
                usage_limit = ?10, is_active = ?11, updated_at = ?12
            WHERE id = ?1
            RETURNING {DISCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&merged.name)
        .bind(&merged.description)
        .bind(&merged.code)
        .bind(merged.discount_type)
        .bind(merged.value)
        .bind(merged.minimum_amount_cents)
        .bind(merged.start_date)
        .bind(merged.end_date)
        .bind(merged.usage_limit)
        .bind(merged.is_active)
        .bind(merged.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Discount", id))
    }

    /// Soft delete: the code stops validating.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE discounts SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", id));
        }

        Ok(())
    }

    /// Checks a code against an amount without redeeming it.
    pub async fn validate_code(&self, code: &str, amount_cents: i64, now: DateTime<Utc>) -> DbResult<CodeCheck> {
        let code = code.trim();
        let found = self.find_by_code(code).await?;
        let off = redeem_code(code, found.as_ref(), Money::from_cents(amount_cents), now)?;

        let discount = found.ok_or_else(|| CoreError::DiscountNotFound(code.to_string()))?;

        Ok(CodeCheck {
            discount,
            discount_amount_cents: off.cents(),
        })
    }
}
