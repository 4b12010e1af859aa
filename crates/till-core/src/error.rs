//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors                                                        │
//! │  └── DbError          - Store failures, wraps CoreError on rollback    │
//! │                                                                         │
//! │  till-api errors                                                       │
//! │  └── ApiError         - What the client sees ({code, message})         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Any of these raised inside an atomic unit of work aborts the whole unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Referenced customer does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    /// Stock would go negative.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout line (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Cola 330ml", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, client shows "Only 3 Cola 330ml in stock"
    /// ```
    #[error("Insufficient stock for {product} ({sku}): available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// No discount carries the supplied code.
    #[error("Invalid discount code: {0}")]
    DiscountNotFound(String),

    /// Discount exists but is inactive, outside its window, or used up.
    #[error("Discount code {0} is not valid or has expired")]
    DiscountInvalid(String),

    /// Tendered amount does not cover the sale total.
    #[error("Amount paid {paid_cents} does not cover total {total_cents}")]
    InsufficientPayment { total_cents: i64, paid_cents: i64 },

    /// Checkout submitted without lines.
    #[error("Cart must contain at least one item")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email, bad SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::OutOfRange`].
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
