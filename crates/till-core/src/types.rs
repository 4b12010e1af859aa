//! # Domain Types
//!
//! Entities and enums shared by every layer of the back office.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────┐  1..n  ┌──────────┐  n..1  ┌──────────────────┐          │
//! │  │ Category │───────►│ Product  │◄───────│InventoryMovement │          │
//! │  └──────────┘        └────┬─────┘        └──────────────────┘          │
//! │                           │ referenced by                               │
//! │                      ┌────▼────────────┐                                │
//! │  ┌──────────┐  n..1  │ TransactionItem │                                │
//! │  │ Customer │◄──┐    └────┬────────────┘                                │
//! │  └──────────┘   │         │ owned by                                    │
//! │                 │    ┌────▼────────┐  n..1  ┌──────────┐                │
//! │                 └────│ Transaction │───────►│ Discount │                │
//! │                      └────┬────────┘        └──────────┘                │
//! │  ┌──────────┐             │ 1..n                                        │
//! │  │   User   │  (actor)  ┌─▼────────┐                                    │
//! │  └──────────┘           │ Feedback │                                    │
//! │                         └──────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has an `i64` row id. Business identifiers (`sku`,
//! `transaction_number`, `employee_id`, discount `code`) are unique
//! but never used as foreign keys.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// Operator role. Gates what an authenticated actor may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            _ => Err(crate::ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".into(), "manager".into(), "cashier".into()],
            }),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A back-office operator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    /// Business identifier printed on receipts ("EMP-0001").
    pub employee_id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub hire_date: Option<NaiveDate>,
    pub salary_cents: Option<i64>,
    pub is_active: bool,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Middle Last Suffix" with absent parts skipped.
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
            self.suffix.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Whether this user may sign in.
    #[inline]
    pub fn can_login(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Category listing row with the number of active products.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub products_count: i64,
}

// =============================================================================
// Product
// =============================================================================

/// A sellable catalog item.
///
/// `stock_quantity` is only ever changed through the inventory ledger,
/// so every change has a matching [`InventoryMovement`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,

    /// Stock Keeping Unit, unique across the catalog.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, ...), unique when present.
    pub barcode: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Purchase cost in cents, for margin reporting.
    pub cost_price_cents: i64,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    /// Reorder threshold. At or below this the product is "low stock".
    pub min_stock_level: i64,

    pub category_id: i64,
    pub brand: Option<String>,
    pub weight_grams: Option<i64>,

    /// Soft delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// At or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }

    /// Enough units on hand to sell `quantity`.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// Direction of a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Goods received: stock increases by quantity.
    In,
    /// Goods removed (sale, damage): stock decreases by quantity.
    Out,
    /// Stock count correction: quantity is the new absolute level.
    Adjustment,
}

/// Immutable audit record of one stock change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: i64,
    pub product_id: i64,
    /// Operator who caused the change.
    pub user_id: i64,
    #[serde(rename = "type")]
    pub movement_type: MovementKind,
    /// Absolute number of units moved.
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reason: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Discount
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is basis points of the amount (1000 = 10%).
    Percentage,
    /// `value` is cents off, capped at the amount.
    FixedAmount,
}

/// A promotional rule, optionally redeemable by code.
///
/// Evaluation lives in [`crate::discount`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Discount {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub discount_type: DiscountKind,
    /// Hundredths: basis points for percentage, cents for fixed amount.
    pub value: i64,
    pub minimum_amount_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// Accepted tender types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    DigitalWallet,
    BankTransfer,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::DigitalWallet => "digital_wallet",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

/// Lifecycle of a sale. Checkout only ever creates `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
    Refunded,
}

/// One completed checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: i64,
    /// "TXN-YYYYMMDD-XXXXXXXX", unique.
    pub transaction_number: String,
    /// Operator who rang up the sale.
    pub user_id: i64,
    pub customer_id: Option<i64>,
    /// Discount redeemed by this sale, if any.
    pub discount_id: Option<i64>,
    pub subtotal_cents: i64,
    pub discount_amount_cents: i64,
    pub tax_amount_cents: i64,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub change_amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// One line of a sale. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: i64,
    pub transaction_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_amount_cents: i64,
    /// `unit_price × quantity − discount_amount`.
    pub total_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// An optional purchaser record.
///
/// The aggregates (`total_spent_cents`, `total_orders`, `last_purchase_at`)
/// are written only by checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub total_spent_cents: i64,
    pub total_orders: i64,
    #[ts(as = "Option<String>")]
    pub last_purchase_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// Post-sale customer feedback.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Feedback {
    pub id: i64,
    pub transaction_id: i64,
    pub customer_id: Option<i64>,
    /// 1 to 5 stars.
    pub rating: i64,
    pub comment: Option<String>,
    /// Free-form survey answers as submitted by the client.
    #[ts(type = "Record<string, unknown> | null")]
    pub survey_responses: Option<serde_json::Value>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
