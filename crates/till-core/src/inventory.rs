//! # Inventory Ledger Rules
//!
//! Computes stock transitions. Persisting the new level together with
//! its movement record is till-db's job; this module decides what the
//! transition is, or refuses it.
//!
//! ```text
//! kind        new_stock                 recorded quantity
//! ─────────── ───────────────────────── ─────────────────────
//! in          previous + quantity       quantity
//! out         previous - quantity       quantity
//! adjustment  quantity (the target)     |target - previous|
//! ```
//!
//! A transition that would leave stock below zero fails with
//! [`CoreError::InsufficientStock`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{MovementKind, Product};
use crate::MAX_STOCK_QUANTITY;

/// Reason recorded for the movement written when a product is created
/// with stock on hand.
pub const INITIAL_STOCK_REASON: &str = "Initial stock";

/// A validated stock transition, ready to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockChange {
    pub kind: MovementKind,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// Absolute units moved.
    pub quantity: i64,
}

impl StockChange {
    /// Signed change applied to `stock_quantity`.
    #[inline]
    pub fn delta(&self) -> i64 {
        self.new_stock - self.previous_stock
    }
}

/// Plans the transition of `product` for one ledger entry.
///
/// `quantity` is the amount moved for `in`/`out` and the target level
/// for `adjustment`.
pub fn plan_stock_change(
    product: &Product,
    kind: MovementKind,
    quantity: i64,
) -> CoreResult<StockChange> {
    let previous = product.stock_quantity;

    let insufficient = |requested: i64| CoreError::InsufficientStock {
        product: product.name.clone(),
        sku: product.sku.clone(),
        available: previous,
        requested,
    };

    let (new_stock, moved) = match kind {
        MovementKind::In => {
            if quantity <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "quantity".to_string(),
                }
                .into());
            }
            let new_stock = previous
                .checked_add(quantity)
                .filter(|stock| *stock <= MAX_STOCK_QUANTITY)
                .ok_or_else(|| {
                    ValidationError::out_of_range("quantity", 1, (MAX_STOCK_QUANTITY - previous).max(1))
                })?;
            (new_stock, quantity)
        }
        MovementKind::Out => {
            if quantity <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "quantity".to_string(),
                }
                .into());
            }
            if previous < quantity {
                return Err(insufficient(quantity));
            }
            (previous - quantity, quantity)
        }
        MovementKind::Adjustment => {
            if quantity < 0 {
                return Err(insufficient(quantity));
            }
            if quantity > MAX_STOCK_QUANTITY {
                return Err(ValidationError::out_of_range("quantity", 0, MAX_STOCK_QUANTITY).into());
            }
            (quantity, (quantity - previous).abs())
        }
    };

    Ok(StockChange {
        kind,
        previous_stock: previous,
        new_stock,
        quantity: moved,
    })
}

/// Movement reason written for each line of a completed sale.
///
/// ```rust
/// use till_core::inventory::sale_reason;
///
/// assert_eq!(sale_reason("TXN-20260301-0A1B2C3D"), "Sale - Transaction #TXN-20260301-0A1B2C3D");
/// ```
pub fn sale_reason(transaction_number: &str) -> String {
    format!("Sale - Transaction #{}", transaction_number)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: 7,
            name: "Cola 330ml".to_string(),
            description: None,
            sku: "COLA-330".to_string(),
            barcode: None,
            price_cents: 1000,
            cost_price_cents: 600,
            stock_quantity: stock,
            min_stock_level: 5,
            category_id: 1,
            brand: None,
            weight_grams: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_in_adds_stock() {
        let change = plan_stock_change(&product(10), MovementKind::In, 4).unwrap();
        assert_eq!(change.new_stock, 14);
        assert_eq!(change.quantity, 4);
        assert_eq!(change.delta(), 4);
    }

    #[test]
    fn test_out_removes_stock() {
        let change = plan_stock_change(&product(10), MovementKind::Out, 3).unwrap();
        assert_eq!(change.previous_stock, 10);
        assert_eq!(change.new_stock, 7);
        assert_eq!(change.delta(), -3);

        // exactly to zero is allowed
        let change = plan_stock_change(&product(3), MovementKind::Out, 3).unwrap();
        assert_eq!(change.new_stock, 0);
    }

    #[test]
    fn test_out_beyond_stock_names_product() {
        let err = plan_stock_change(&product(3), MovementKind::Out, 5).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product: "Cola 330ml".to_string(),
                sku: "COLA-330".to_string(),
                available: 3,
                requested: 5,
            }
        );
    }

    #[test]
    fn test_adjustment_to_zero_records_absolute_delta() {
        let change = plan_stock_change(&product(5), MovementKind::Adjustment, 0).unwrap();
        assert_eq!(change.kind, MovementKind::Adjustment);
        assert_eq!(change.previous_stock, 5);
        assert_eq!(change.new_stock, 0);
        assert_eq!(change.quantity, 5);

        let up = plan_stock_change(&product(5), MovementKind::Adjustment, 12).unwrap();
        assert_eq!(up.quantity, 7);
    }

    #[test]
    fn test_negative_adjustment_rejected() {
        let err = plan_stock_change(&product(5), MovementKind::Adjustment, -1).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
    }

    #[test]
    fn test_stock_cannot_grow_past_the_maximum() {
        assert!(matches!(
            plan_stock_change(&product(10), MovementKind::In, i64::MAX),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(matches!(
            plan_stock_change(&product(10), MovementKind::In, MAX_STOCK_QUANTITY - 9),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(matches!(
            plan_stock_change(&product(10), MovementKind::Adjustment, i64::MAX),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let full = plan_stock_change(&product(10), MovementKind::In, MAX_STOCK_QUANTITY - 10).unwrap();
        assert_eq!(full.new_stock, MAX_STOCK_QUANTITY);
    }

    #[test]
    fn test_non_positive_in_out_rejected() {
        assert!(matches!(
            plan_stock_change(&product(5), MovementKind::In, 0),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            plan_stock_change(&product(5), MovementKind::Out, -2),
            Err(CoreError::Validation(_))
        ));
    }
}
