//! # Discount Evaluator
//!
//! Decides whether a discount may be redeemed and how much it is worth.
//!
//! ## Rule Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  is_valid(now)                                                          │
//! │  ├── is_active?                          no  → invalid                  │
//! │  ├── start_date <= today?                no  → invalid                  │
//! │  ├── end_date   >= today?                no  → invalid                  │
//! │  └── used_count <  usage_limit?          no  → invalid                  │
//! │                                                                         │
//! │  calculate(amount, now)                                                 │
//! │  ├── invalid                                    → 0                     │
//! │  ├── amount < minimum_amount                    → 0                     │
//! │  ├── percentage                                 → amount × bps / 10000  │
//! │  └── fixed_amount                               → min(value, amount)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure. Incrementing `used_count` belongs to the
//! caller and must share the atomic unit of the sale it enables.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Discount, DiscountKind};
use crate::validation::{validate_date_window, validate_non_negative, validate_required, ValidationResult};
use crate::ValidationError;

/// Upper bound for a percentage discount value (100.00%).
pub const MAX_PERCENTAGE_BPS: i64 = 10_000;

impl Discount {
    /// True iff the discount is active, today falls inside its window,
    /// and it still has uses left.
    ///
    /// The window is compared on calendar dates, so a discount ending
    /// today is valid for the whole of today.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();

        self.is_active
            && self.start_date.map_or(true, |start| start <= today)
            && self.end_date.map_or(true, |end| end >= today)
            && self.has_remaining_uses()
    }

    /// `used_count` is below `usage_limit`, or there is no limit.
    #[inline]
    pub fn has_remaining_uses(&self) -> bool {
        self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }

    /// Discount worth for `amount`, never more than `amount`.
    ///
    /// ## Example
    /// ```rust
    /// # use chrono::Utc;
    /// # use till_core::{Discount, DiscountKind, Money};
    /// # let now = Utc::now();
    /// let save10 = Discount {
    ///     id: 1,
    ///     name: "Save 10".into(),
    ///     description: None,
    ///     code: Some("SAVE10".into()),
    ///     discount_type: DiscountKind::Percentage,
    ///     value: 1000,                       // 10.00%
    ///     minimum_amount_cents: Some(5000),  // $50.00
    ///     start_date: None,
    ///     end_date: None,
    ///     usage_limit: None,
    ///     used_count: 0,
    ///     is_active: true,
    ///     created_at: now,
    ///     updated_at: now,
    /// };
    ///
    /// assert_eq!(save10.calculate(Money::from_cents(10_000), now).cents(), 1000);
    /// assert_eq!(save10.calculate(Money::from_cents(3000), now).cents(), 0);
    /// ```
    pub fn calculate(&self, amount: Money, now: DateTime<Utc>) -> Money {
        if !self.is_valid(now) || !amount.is_positive() {
            return Money::zero();
        }

        if let Some(minimum) = self.minimum_amount_cents {
            if amount.cents() < minimum {
                return Money::zero();
            }
        }

        let off = match self.discount_type {
            DiscountKind::Percentage => {
                let bps = self.value.clamp(0, MAX_PERCENTAGE_BPS) as u32;
                amount.percentage_of(bps)
            }
            DiscountKind::FixedAmount => Money::from_cents(self.value.max(0)),
        };

        off.min(amount)
    }
}

/// Resolves a code lookup into a discount amount.
///
/// `found` is the result of looking `code` up in the store.
///
/// ## Outcomes
/// - `None` → [`CoreError::DiscountNotFound`]
/// - found but not [`Discount::is_valid`] → [`CoreError::DiscountInvalid`]
/// - otherwise the computed amount (possibly zero when the minimum is not met)
pub fn redeem_code(
    code: &str,
    found: Option<&Discount>,
    amount: Money,
    now: DateTime<Utc>,
) -> CoreResult<Money> {
    let discount = found.ok_or_else(|| CoreError::DiscountNotFound(code.to_string()))?;

    if !discount.is_valid(now) {
        return Err(CoreError::DiscountInvalid(code.to_string()));
    }

    Ok(discount.calculate(amount, now))
}

/// Validates the editable rule fields of a discount.
pub fn validate_rules(discount: &Discount) -> ValidationResult<()> {
    validate_required("name", &discount.name, 255)?;
    validate_non_negative("value", discount.value)?;

    if discount.discount_type == DiscountKind::Percentage && discount.value > MAX_PERCENTAGE_BPS {
        return Err(ValidationError::out_of_range("value", 0, MAX_PERCENTAGE_BPS));
    }

    if let Some(minimum) = discount.minimum_amount_cents {
        validate_non_negative("minimum_amount", minimum)?;
    }

    if let Some(limit) = discount.usage_limit {
        if limit < 1 {
            return Err(ValidationError::out_of_range("usage_limit", 1, i64::MAX));
        }
    }

    if let Some(code) = discount.code.as_deref() {
        validate_required("code", code, 50)?;
    }

    validate_date_window(discount.start_date, discount.end_date)
}

// =============================================================================
// Unit Tests
// =============================================================================
