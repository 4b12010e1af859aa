//! # till-core: Pure Business Logic for the Till back office
//!
//! This crate holds every rule of the back office that can be expressed
//! without touching a database or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Client application (separate)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-api (axum handlers)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  money   │ │ discount │ │inventory │ │    checkout      │  │   │
//! │  │   │ Money    │ │ is_valid │ │  ledger  │ │ line totals, tax │  │   │
//! │  │   │ TaxRate  │ │ calculate│ │  rules   │ │ change, request  │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        till-db (SQLite, repositories, atomic checkout)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities and enums (Product, Discount, Transaction, ...)
//! - [`money`] - Integer money and basis-point tax rates
//! - [`discount`] - Discount Evaluator (validity window, usage cap, minimum)
//! - [`inventory`] - Inventory Ledger transition rules
//! - [`checkout`] - Checkout request shape and pricing
//! - [`events`] - Notification event payloads
//! - [`validation`] - Field validators
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::checkout::compute_totals;
//! use till_core::money::{Money, TaxRate};
//!
//! // 3 × $10.00, no discount, 12% tax, $20.00 tendered
//! let totals = compute_totals(
//!     Money::from_cents(3000),
//!     Money::zero(),
//!     TaxRate::from_bps(1200),
//!     Money::from_cents(2000),
//! );
//!
//! assert_eq!(totals.tax.cents(), 360);
//! assert_eq!(totals.total.cents(), 3360);
//! assert_eq!(totals.change.cents(), 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod discount;
pub mod error;
pub mod events;
pub mod inventory;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use events::Event;
pub use money::{Money, TaxRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tax rate applied at checkout unless configured otherwise (12% VAT).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1200;

/// Maximum lines allowed in a single checkout cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest amount in cents accepted from input ($10,000,000,000.00).
///
/// A full cart at this price still prices within `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Largest stock level a product may hold.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;
