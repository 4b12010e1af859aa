//! # Validation Module
//!
//! Field validators run before any mutation is attempted.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: JSON deserialization (serde)                                  │
//! │  ├── Types, enums, required keys                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Lengths, ranges, formats                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── UNIQUE (sku, barcode, email, code)                                 │
//! │  └── Foreign keys, CHECK (stock_quantity >= 0)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field and its maximum length.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_required;
///
/// assert!(validate_required("name", "Beverages", 255).is_ok());
/// assert!(validate_required("name", "   ", 255).is_err());
/// ```
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional text field's maximum length.
pub fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
/// - Letters, numbers, hyphens, underscores only
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_sku;
///
/// assert!(validate_sku("COLA-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    validate_required("sku", sku, 100)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1-255 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required("name", name, 255)
}

/// Validates an email address.
///
/// Only the shape `local@domain.tld` is checked; deliverability is not.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_required("email", email, 255)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }
    if domain.starts_with('.') || domain.ends_with('.') || email.contains(char::is_whitespace) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a new password (at least 8 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 8 {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must be at least 8 characters".to_string(),
        });
    }
    Ok(())
}

/// Trims a search query and caps it at 100 characters.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## User Workflow
/// ```text
/// Cart line: qty 5
///      │
///      ▼
/// validate_quantity(5) ← THIS FUNCTION
///      │
///      ├── qty <= 0?      → "quantity must be positive"
///      ├── qty > 9999?    → "quantity must be between 1 and 9999"
///      └── OK → stock check
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::out_of_range("quantity", 1, MAX_ITEM_QUANTITY));
    }

    Ok(())
}

/// Validates a non-negative amount in cents (prices, payments, discounts),
/// at most [`MAX_AMOUNT_CENTS`].
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", 1099).is_ok());
/// assert!(validate_non_negative("price", 0).is_ok());
/// assert!(validate_non_negative("price", -100).is_err());
/// assert!(validate_non_negative("price", i64::MAX).is_err());
/// ```
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&value) {
        return Err(ValidationError::out_of_range(field, 0, MAX_AMOUNT_CENTS));
    }
    Ok(())
}

/// Validates a stock level or stock threshold (0 to [`MAX_STOCK_QUANTITY`]).
pub fn validate_stock_level(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_QUANTITY).contains(&value) {
        return Err(ValidationError::out_of_range(field, 0, MAX_STOCK_QUANTITY));
    }
    Ok(())
}

/// Validates a star rating (1-5).
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::out_of_range("rating", 1, 5));
    }
    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::out_of_range("tax_rate_bps", 0, 10_000));
    }
    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that `end` is not before `start` when both are set.
pub fn validate_date_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ValidationResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::InvalidFormat {
                field: "end_date".to_string(),
                reason: "must be on or after start_date".to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COLA-330").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin@till.local").is_ok());
        assert!(validate_email("a.b+c@shop.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@domain.com").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("user@a@b.com").is_err());
        assert!(validate_email("us er@b.com").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_amounts_and_stock_levels_are_bounded() {
        assert!(validate_non_negative("unit_price", MAX_AMOUNT_CENTS).is_ok());
        assert_eq!(
            validate_non_negative("unit_price", MAX_AMOUNT_CENTS + 1),
            Err(ValidationError::out_of_range("unit_price", 0, MAX_AMOUNT_CENTS))
        );
        assert!(validate_non_negative("amount_paid", i64::MAX).is_err());

        assert!(validate_stock_level("stock_quantity", 0).is_ok());
        assert!(validate_stock_level("stock_quantity", MAX_STOCK_QUANTITY).is_ok());
        assert!(validate_stock_level("stock_quantity", MAX_STOCK_QUANTITY + 1).is_err());
        assert!(validate_stock_level("min_stock_level", -1).is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_date_window() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        assert!(validate_date_window(d("2026-01-01"), d("2026-01-31")).is_ok());
        assert!(validate_date_window(d("2026-01-01"), d("2026-01-01")).is_ok());
        assert!(validate_date_window(None, d("2026-01-01")).is_ok());
        assert!(validate_date_window(d("2026-02-01"), d("2026-01-01")).is_err());
    }

    #[test]
    fn test_validate_password_and_search() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
        assert_eq!(validate_search_query("  cola ").unwrap(), "cola");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }
}
