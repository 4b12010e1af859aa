//! # Checkout Pricing
//!
//! The pure half of the Checkout Engine: request validation and the
//! arithmetic that turns a cart into a priced sale. The atomic half
//! (stock debits, discount redemption, persistence) lives in
//! `till_db::checkout`.
//!
//! ## Pricing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► Σ(unit_price × qty − line_discount) ──► subtotal             │
//! │                                                       │                 │
//! │  discount code ──► Discount::calculate(subtotal) ─────┤                 │
//! │                                                       ▼                 │
//! │                                  taxable = subtotal − discount          │
//! │                                  tax     = taxable × rate (half-up)     │
//! │                                  total   = taxable + tax                │
//! │                                  change  = max(0, paid − total)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, TaxRate};
use crate::types::{PaymentMethod, Transaction, TransactionItem};
use crate::validation::{validate_non_negative, validate_optional, validate_quantity};
use crate::{MAX_AMOUNT_CENTS, MAX_CART_ITEMS};

// =============================================================================
// Request
// =============================================================================

/// One cart line as submitted by the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_amount_cents: i64,
}

impl CartLine {
    /// `unit_price × quantity` before the line discount.
    pub fn gross(&self) -> CoreResult<Money> {
        Money::from_cents(self.unit_price_cents)
            .checked_mul(self.quantity)
            .ok_or_else(|| ValidationError::out_of_range("unit_price", 0, MAX_AMOUNT_CENTS).into())
    }

    /// `unit_price × quantity − discount_amount`.
    pub fn total(&self) -> CoreResult<Money> {
        self.gross()?
            .checked_sub(Money::from_cents(self.discount_amount_cents))
            .ok_or_else(|| ValidationError::out_of_range("discount_amount", 0, MAX_AMOUNT_CENTS).into())
    }

    fn validate(&self) -> CoreResult<()> {
        validate_quantity(self.quantity)?;
        validate_non_negative("unit_price", self.unit_price_cents)?;
        validate_non_negative("discount_amount", self.discount_amount_cents)?;

        let gross = self.gross()?;
        if self.discount_amount_cents > gross.cents() {
            return Err(ValidationError::out_of_range("discount_amount", 0, gross.cents()).into());
        }
        Ok(())
    }
}

/// Everything the register submits for one sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    pub customer_id: Option<i64>,
    pub items: Vec<CartLine>,
    pub discount_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    pub notes: Option<String>,
}

impl CheckoutRequest {
    /// Shape checks that need no store access.
    pub fn validate(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        if self.items.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        for line in &self.items {
            line.validate()?;
        }

        validate_non_negative("amount_paid", self.amount_paid_cents)?;
        validate_optional("notes", self.notes.as_deref(), 1000)?;
        Ok(())
    }

    /// Discount code with surrounding whitespace removed; blank means none.
    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Injected checkout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    pub tax_rate: TaxRate,
    /// Accept `amount_paid < total` and give zero change instead of
    /// rejecting the sale.
    pub allow_underpayment: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            tax_rate: TaxRate::default(),
            allow_underpayment: false,
        }
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Sum of line totals.
pub fn subtotal(lines: &[CartLine]) -> CoreResult<Money> {
    lines.iter().try_fold(Money::zero(), |acc, line| -> CoreResult<Money> {
        acc.checked_add(line.total()?)
            .ok_or_else(|| ValidationError::out_of_range("subtotal", 0, i64::MAX).into())
    })
}

/// The priced sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub taxable: Money,
    pub tax: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub change: Money,
}

impl Totals {
    /// Tendered amount covers the total.
    #[inline]
    pub fn is_fully_paid(&self) -> bool {
        self.amount_paid >= self.total
    }
}

/// Prices a sale from its subtotal and the already-computed discount.
pub fn compute_totals(subtotal: Money, discount: Money, rate: TaxRate, amount_paid: Money) -> Totals {
    let taxable = subtotal - discount;
    let tax = taxable.calculate_tax(rate);
    let total = taxable + tax;

    Totals {
        subtotal,
        discount,
        taxable,
        tax,
        total,
        amount_paid,
        change: (amount_paid - total).floor_zero(),
    }
}

/// Enforces the payment policy on priced totals.
pub fn settle_payment(totals: &Totals, config: &CheckoutConfig) -> CoreResult<()> {
    if !totals.is_fully_paid() && !config.allow_underpayment {
        return Err(CoreError::InsufficientPayment {
            total_cents: totals.total.cents(),
            paid_cents: totals.amount_paid.cents(),
        });
    }
    Ok(())
}

/// Generates a transaction number: `TXN-YYYYMMDD-XXXXXXXX`.
///
/// The suffix is 8 upper-case hex characters of a v4 UUID. Uniqueness is
/// finally enforced by the store's unique index.
pub fn generate_transaction_number(now: DateTime<Utc>) -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!(
        "TXN-{}-{}",
        now.format("%Y%m%d"),
        entropy[..8].to_uppercase()
    )
}

// =============================================================================
// Result
// =============================================================================

/// What a successful checkout returns to the register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutReceipt {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
    pub change_amount_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(product_id: i64, quantity: i64, unit_price_cents: i64) -> CartLine {
        CartLine {
            product_id,
            quantity,
            unit_price_cents,
            discount_amount_cents: 0,
        }
    }

    fn request(items: Vec<CartLine>, paid: i64) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: None,
            items,
            discount_code: None,
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: paid,
            notes: None,
        }
    }

    #[test]
    fn test_three_at_ten_with_vat() {
        let lines = vec![line(1, 3, 1000)];
        let totals = compute_totals(subtotal(&lines).unwrap(), Money::zero(), TaxRate::from_bps(1200), Money::from_cents(2000));

        assert_eq!(totals.subtotal.cents(), 3000);
        assert_eq!(totals.discount.cents(), 0);
        assert_eq!(totals.tax.cents(), 360);
        assert_eq!(totals.total.cents(), 3360);
        assert_eq!(totals.change.cents(), 0);
        assert!(!totals.is_fully_paid());
    }

    #[test]
    fn test_total_matches_rounded_gross_up() {
        // total == round((subtotal - discount) × 1.12, 2) for awkward amounts
        for taxable in [1, 4, 5, 13, 999, 1234, 98_765] {
            let totals = compute_totals(Money::from_cents(taxable), Money::zero(), TaxRate::from_bps(1200), Money::zero());
            let expected = ((taxable as f64) * 1.12).round() as i64;
            assert_eq!(totals.total.cents(), expected, "taxable {}", taxable);
        }
    }

    #[test]
    fn test_change_is_paid_minus_total() {
        let totals = compute_totals(Money::from_cents(1000), Money::from_cents(100), TaxRate::from_bps(1200), Money::from_cents(2000));
        // taxable 900, tax 108, total 1008
        assert_eq!(totals.total.cents(), 1008);
        assert_eq!(totals.change.cents(), 992);
    }

    #[test]
    fn test_line_discounts_reduce_subtotal() {
        let lines = vec![
            CartLine {
                discount_amount_cents: 150,
                ..line(1, 2, 500)
            },
            line(2, 1, 250),
        ];
        assert_eq!(subtotal(&lines).unwrap().cents(), 1100);
    }

    #[test]
    fn test_underpayment_policy() {
        let totals = compute_totals(Money::from_cents(3000), Money::zero(), TaxRate::from_bps(1200), Money::from_cents(2000));

        let strict = CheckoutConfig::default();
        assert_eq!(
            settle_payment(&totals, &strict),
            Err(CoreError::InsufficientPayment {
                total_cents: 3360,
                paid_cents: 2000
            })
        );

        let lenient = CheckoutConfig {
            allow_underpayment: true,
            ..CheckoutConfig::default()
        };
        assert!(settle_payment(&totals, &lenient).is_ok());
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(request(vec![], 0).validate(), Err(CoreError::EmptyCart));
        assert!(request(vec![line(1, 1, 100)], 100).validate().is_ok());
        assert!(request(vec![line(1, 0, 100)], 100).validate().is_err());
        assert!(request(vec![line(1, 1, -1)], 100).validate().is_err());
        assert!(request(vec![line(1, 1, 100)], -5).validate().is_err());

        let over_discounted = CartLine {
            discount_amount_cents: 201,
            ..line(1, 2, 100)
        };
        assert!(request(vec![over_discounted], 0).validate().is_err());

        let too_many = (0..=MAX_CART_ITEMS as i64).map(|i| line(i, 1, 1)).collect();
        assert_eq!(
            request(too_many, 0).validate(),
            Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS })
        );
    }

    #[test]
    fn test_huge_amounts_are_rejected_not_overflowed() {
        let huge_price = request(vec![line(1, 2, i64::MAX / 2 + 1)], 0);
        assert!(matches!(
            huge_price.validate(),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let huge_payment = request(vec![line(1, 1, 100)], i64::MAX);
        assert!(matches!(
            huge_payment.validate(),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // Largest accepted cart still prices without overflow.
        let full: Vec<CartLine> = (0..MAX_CART_ITEMS as i64)
            .map(|i| line(i, crate::MAX_ITEM_QUANTITY, MAX_AMOUNT_CENTS))
            .collect();
        let req = request(full, MAX_AMOUNT_CENTS);
        assert!(req.validate().is_ok());
        let sub = subtotal(&req.items).unwrap();
        assert_eq!(sub.cents(), MAX_CART_ITEMS as i64 * crate::MAX_ITEM_QUANTITY * MAX_AMOUNT_CENTS);
        let totals = compute_totals(sub, Money::zero(), TaxRate::from_bps(1200), req.amount_paid());
        assert!(totals.total > sub);
    }

    #[test]
    fn test_unchecked_line_overflow_is_an_error() {
        let lines = vec![line(1, 2, i64::MAX / 2 + 1)];
        assert!(lines[0].gross().is_err());
        assert!(subtotal(&lines).is_err());

        let near_max = vec![line(1, 1, i64::MAX), line(2, 1, 1)];
        assert!(subtotal(&near_max).is_err());
    }

    #[test]
    fn test_blank_discount_code_is_none() {
        let mut req = request(vec![line(1, 1, 100)], 100);
        req.discount_code = Some("   ".to_string());
        assert_eq!(req.discount_code(), None);
        req.discount_code = Some(" SAVE10 ".to_string());
        assert_eq!(req.discount_code(), Some("SAVE10"));
    }

    #[test]
    fn test_transaction_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let number = generate_transaction_number(now);

        assert_eq!(number.len(), "TXN-20260301-".len() + 8);
        assert!(number.starts_with("TXN-20260301-"));
        let suffix = &number["TXN-20260301-".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        assert_ne!(number, generate_transaction_number(now));
    }
}
