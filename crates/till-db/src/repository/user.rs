//! # User Repository
//!
//! Operator accounts and signed-out session tokens.
//!
//! Users are never hard-deleted: `soft_delete` sets `is_deleted` and
//! clears `is_active`, which also blocks sign-in.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use till_core::validation::{validate_email, validate_non_negative, validate_optional, validate_required};
use till_core::{Role, User, ValidationError};

use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str = r#"
    id, employee_id, first_name, middle_name, last_name, suffix, email,
    password_hash, role, phone, address, birth_date, hire_date, salary_cents,
    is_active, is_deleted, last_login_at, created_at, updated_at
"#;

/// Fields for a new operator. The password arrives already hashed.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub employee_id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
    pub salary_cents: Option<i64>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("employee_id", &self.employee_id, 50)?;
        validate_required("first_name", &self.first_name, 255)?;
        validate_required("last_name", &self.last_name, 255)?;
        validate_optional("middle_name", self.middle_name.as_deref(), 255)?;
        validate_optional("suffix", self.suffix.as_deref(), 10)?;
        validate_email(&self.email)?;
        validate_optional("phone", self.phone.as_deref(), 20)?;
        if let Some(salary) = self.salary_cents {
            validate_non_negative("salary", salary)?;
        }
        Ok(())
    }
}

/// Partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
    pub salary_cents: Option<i64>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.first_name {
            validate_required("first_name", name, 255)?;
        }
        if let Some(name) = &self.last_name {
            validate_required("last_name", name, 255)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(salary) = self.salary_cents {
            validate_non_negative("salary", salary)?;
        }
        Ok(())
    }
}

/// Repository for operator accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Lists users that are not deleted, optionally filtered.
    ///
    /// `search` matches first name, last name, email or employee id.
    pub async fn list(&self, search: Option<&str>, role: Option<Role>) -> DbResult<Vec<User>> {
        let pattern = search.map(|s| format!("%{}%", s.trim()));

        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE is_deleted = 0
              AND (?1 IS NULL OR first_name LIKE ?1 OR last_name LIKE ?1
                   OR email LIKE ?1 OR employee_id LIKE ?1)
              AND (?2 IS NULL OR role = ?2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(pattern)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Gets a user by id, including deleted ones.
    pub async fn get(&self, id: i64) -> DbResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Finds a user by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Inserts a new active user.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email or employee id taken
    pub async fn insert(&self, new: &NewUser, password_hash: &str) -> DbResult<User> {
        new.validate()?;
        debug!(employee_id = %new.employee_id, role = %new.role, "Inserting user");

        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (
                employee_id, first_name, middle_name, last_name, suffix, email,
                password_hash, role, phone, address, birth_date, hire_date, salary_cents,
                is_active, is_deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 1, 0, ?14, ?14)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.employee_id.trim())
        .bind(new.first_name.trim())
        .bind(&new.middle_name)
        .bind(new.last_name.trim())
        .bind(&new.suffix)
        .bind(new.email.trim())
        .bind(password_hash)
        .bind(new.role)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(new.birth_date)
        .bind(new.hire_date)
        .bind(new.salary_cents)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Applies a partial update to a non-deleted user.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> DbResult<User> {
        update.validate()?;
        debug!(id, "Updating user");

        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                first_name   = COALESCE(?2, first_name),
                middle_name  = COALESCE(?3, middle_name),
                last_name    = COALESCE(?4, last_name),
                suffix       = COALESCE(?5, suffix),
                email        = COALESCE(?6, email),
                role         = COALESCE(?7, role),
                phone        = COALESCE(?8, phone),
                address      = COALESCE(?9, address),
                birth_date   = COALESCE(?10, birth_date),
                hire_date    = COALESCE(?11, hire_date),
                salary_cents = COALESCE(?12, salary_cents),
                is_active    = COALESCE(?13, is_active),
                updated_at   = ?14
            WHERE id = ?1 AND is_deleted = 0
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.middle_name)
        .bind(&update.last_name)
        .bind(&update.suffix)
        .bind(&update.email)
        .bind(update.role)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(update.birth_date)
        .bind(update.hire_date)
        .bind(update.salary_cents)
        .bind(update.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Marks a user deleted and inactive.
    pub async fn soft_delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting user");

        let result = sqlx::query(
            "UPDATE users SET is_deleted = 1, is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    pub async fn set_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Stamps a successful sign-in.
    pub async fn record_login(&self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Revokes a session token until its natural expiry.
    ///
    /// Revoking twice is harmless.
    pub async fn revoke_token(&self, token_id: &str, user_id: i64, expires_at: DateTime<Utc>) -> DbResult<()> {
        debug!(user_id, "Revoking session token");

        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token_id, user_id, expires_at, revoked_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(token_id) DO NOTHING
            "#,
        )
        .bind(token_id)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn is_token_revoked(&self, token_id: &str) -> DbResult<bool> {
        let revoked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM revoked_tokens WHERE token_id = ?1")
            .bind(token_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(revoked > 0)
    }

    /// Drops revocations whose tokens have expired anyway.
    pub async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
