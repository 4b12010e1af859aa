//! # Checkout Engine
//!
//! Turns a register cart into a completed sale in one atomic unit.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE                                                        │
//! │    1. load every product ─── missing/inactive ──► ProductNotFound       │
//! │                          ─── short ───────────► InsufficientStock       │
//! │    2. customer exists?   ─── no ──────────────► CustomerNotFound        │
//! │    3. subtotal = Σ (unit × qty − line discount)                         │
//! │    4. discount code      ─── unknown ─────────► DiscountNotFound        │
//! │                          ─── not valid ───────► DiscountInvalid         │
//! │    5. tax, total, change ─── underpaid ───────► InsufficientPayment     │
//! │    6. INSERT transaction + items                                        │
//! │    7. redeem discount (guarded used_count)                              │
//! │    8. ledger `out` per line (guarded stock)                             │
//! │    9. customer aggregates                                               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error drops the open `sqlx::Transaction`, which rolls back every
//! write made so far. Notifying anyone about the sale is the caller's job,
//! after this returns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use till_core::checkout::{
    compute_totals, generate_transaction_number, settle_payment, subtotal, CheckoutConfig,
    CheckoutReceipt, CheckoutRequest,
};
use till_core::discount::redeem_code;
use till_core::inventory::sale_reason;
use till_core::{CoreError, Money, MovementKind};

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::customer::{customer_exists, record_purchase};
use crate::repository::discount::{find_by_code_on, redeem};
use crate::repository::inventory::apply_stock_change;
use crate::repository::product::fetch_product;
use crate::repository::transaction::{insert_item, insert_transaction, NewSale};

/// Runs checkouts against one pool under one pricing policy.
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    pool: SqlitePool,
    config: CheckoutConfig,
}

impl CheckoutEngine {
    pub fn new(pool: SqlitePool, config: CheckoutConfig) -> Self {
        CheckoutEngine { pool, config }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Completes a sale for `actor_id` at the current time.
    pub async fn checkout(&self, actor_id: i64, request: &CheckoutRequest) -> DbResult<CheckoutReceipt> {
        self.checkout_at(actor_id, request, Utc::now()).await
    }

    /// Completes a sale as of `now`.
    ///
    /// ## Returns
    /// * `Ok(receipt)` - everything committed
    /// * `Err(DbError::Domain(..))` - a business rule failed, nothing written
    /// * `Err(..)` - store failure, nothing written
    pub async fn checkout_at(
        &self,
        actor_id: i64,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> DbResult<CheckoutReceipt> {
        request.validate()?;

        let mut tx = begin_write(&self.pool).await?;

        // Stock is checked against the whole cart, so a product listed on
        // two lines is counted once with the summed quantity.
        let mut requested: HashMap<i64, i64> = HashMap::new();
        for line in &request.items {
            *requested.entry(line.product_id).or_default() += line.quantity;
        }

        for line in &request.items {
            let product = fetch_product(&mut tx, line.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or(CoreError::ProductNotFound(line.product_id))?;

            let wanted = requested.get(&product.id).copied().unwrap_or(line.quantity);
            if !product.can_sell(wanted) {
                return Err(CoreError::InsufficientStock {
                    product: product.name,
                    sku: product.sku,
                    available: product.stock_quantity,
                    requested: wanted,
                }
                .into());
            }
        }

        if let Some(customer_id) = request.customer_id {
            if !customer_exists(&mut tx, customer_id).await? {
                return Err(CoreError::CustomerNotFound(customer_id).into());
            }
        }

        let subtotal = subtotal(&request.items)?;

        let (discount, discount_amount) = match request.discount_code() {
            Some(code) => {
                let found = find_by_code_on(&mut tx, code).await?;
                let amount = redeem_code(code, found.as_ref(), subtotal, now)?;
                (found, amount)
            }
            None => (None, Money::zero()),
        };

        let totals = compute_totals(subtotal, discount_amount, self.config.tax_rate, request.amount_paid());
        settle_payment(&totals, &self.config)?;

        let number = generate_transaction_number(now);
        debug!(number = %number, total = %totals.total, "Recording sale");

        let transaction = insert_transaction(
            &mut tx,
            &NewSale {
                number: &number,
                user_id: actor_id,
                customer_id: request.customer_id,
                discount_id: discount.as_ref().map(|d| d.id),
                totals: &totals,
                payment_method: request.payment_method,
                notes: request.notes.as_deref(),
            },
            now,
        )
        .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            items.push(insert_item(&mut tx, transaction.id, line, now).await?);
        }

        if let Some(discount) = &discount {
            redeem(&mut tx, discount, now).await?;
        }

        let reason = sale_reason(&number);
        for line in &request.items {
            apply_stock_change(
                &mut tx,
                line.product_id,
                MovementKind::Out,
                line.quantity,
                &reason,
                None,
                actor_id,
                now,
            )
            .await?;
        }

        if let Some(customer_id) = request.customer_id {
            record_purchase(&mut tx, customer_id, totals.total.cents(), now).await?;
        }

        tx.commit().await?;

        info!(
            number = %transaction.transaction_number,
            total = %totals.total,
            items = items.len(),
            customer_id = ?request.customer_id,
            actor_id,
            "Checkout completed"
        );

        Ok(CheckoutReceipt {
            change_amount_cents: transaction.change_amount_cents,
            transaction,
            items,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::customer::CustomerInput;
    use crate::repository::discount::NewDiscount;
    use crate::repository::transaction::TransactionFilter;
    use crate::testing::{cart, new_product, save10, seed_catalog, test_db, TempDbFile};
    use crate::Database;
    use std::time::Duration;
    use till_core::checkout::CartLine;
    use till_core::{TaxRate, TransactionStatus};

    fn lenient() -> CheckoutConfig {
        CheckoutConfig {
            allow_underpayment: true,
            ..CheckoutConfig::default()
        }
    }

    #[tokio::test]
    async fn test_scenario_three_units_underpaid() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;

        let request = CheckoutRequest {
            amount_paid_cents: 2000,
            ..cart(&fx, 3)
        };
        let receipt = db.checkout(lenient()).checkout(fx.admin.id, &request).await.unwrap();
        let t = &receipt.transaction;

        assert_eq!(t.subtotal_cents, 3000);
        assert_eq!(t.discount_amount_cents, 0);
        assert_eq!(t.tax_amount_cents, 360);
        assert_eq!(t.total_amount_cents, 3360);
        assert_eq!(t.change_amount_cents, 0);
        assert_eq!(receipt.change_amount_cents, 0);
        assert_eq!(t.status, TransactionStatus::Completed);
        assert!(t.transaction_number.starts_with("TXN-"));

        let product = db.products().get(fx.product.id).await.unwrap();
        assert_eq!(product.stock_quantity, 7);

        let movements = db.inventory().movements(fx.product.id).await.unwrap();
        let out = &movements[0];
        assert_eq!(out.movement_type, MovementKind::Out);
        assert_eq!(out.quantity, 3);
        assert_eq!(out.previous_stock, 10);
        assert_eq!(out.new_stock, 7);
        assert_eq!(out.reason, format!("Sale - Transaction #{}", t.transaction_number));
        assert_eq!(
            movements.iter().filter(|m| m.movement_type == MovementKind::Out).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_underpayment_rejected_by_default() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;

        let request = CheckoutRequest {
            amount_paid_cents: 2000,
            ..cart(&fx, 3)
        };
        let err = db
            .checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientPayment {
                total_cents: 3360,
                paid_cents: 2000
            })
        ));
        assert_eq!(db.products().get(fx.product.id).await.unwrap().stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_totals_identity_with_change() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;

        let request = CheckoutRequest {
            amount_paid_cents: 5000,
            items: vec![CartLine {
                product_id: fx.product.id,
                quantity: 2,
                unit_price_cents: 999,
                discount_amount_cents: 33,
            }],
            ..cart(&fx, 1)
        };
        let receipt = db
            .checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap();
        let t = &receipt.transaction;

        // (1998 - 33) * 1.12 = 2200.8 -> 2201
        assert_eq!(t.subtotal_cents, 1965);
        assert_eq!(t.total_amount_cents, 2201);
        assert_eq!(t.change_amount_cents, 5000 - 2201);
        assert_eq!(receipt.items[0].total_price_cents, 1965);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let discount = db.discounts().insert(&save10()).await.unwrap();
        let other = db
            .products()
            .insert(&new_product("CHIPS-1", fx.category.id, 500, 50, 5), fx.admin.id)
            .await
            .unwrap();

        // first line is fine; second exceeds stock
        let request = CheckoutRequest {
            items: vec![
                CartLine {
                    product_id: other.id,
                    quantity: 20,
                    unit_price_cents: 500,
                    discount_amount_cents: 0,
                },
                CartLine {
                    product_id: fx.product.id,
                    quantity: 11,
                    unit_price_cents: 1000,
                    discount_amount_cents: 0,
                },
            ],
            discount_code: Some("SAVE10".to_string()),
            ..cart(&fx, 1)
        };

        let err = db
            .checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock { product, available, requested, .. }) => {
                assert_eq!(product, "Cola 330ml");
                assert_eq!(available, 10);
                assert_eq!(requested, 11);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(db.products().get(fx.product.id).await.unwrap().stock_quantity, 10);
        assert_eq!(db.products().get(other.id).await.unwrap().stock_quantity, 50);
        assert!(db.transactions().list(&TransactionFilter::default()).await.unwrap().is_empty());
        assert_eq!(db.discounts().get(discount.id).await.unwrap().used_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_checkouts_never_oversell() {
        let file = TempDbFile::new("race");
        let db = Database::new(file.config().max_connections(4)).await.unwrap();
        let fx = seed_catalog(&db).await;
        let engine = db.checkout(CheckoutConfig::default());
        let request = cart(&fx, 6);

        let (first, second) = tokio::join!(
            engine.checkout(fx.admin.id, &request),
            engine.checkout(fx.admin.id, &request),
        );

        let (done, failed): (Vec<_>, Vec<_>) = [first, second].into_iter().partition(Result::is_ok);
        assert_eq!(done.len(), 1);
        match failed.into_iter().next() {
            Some(Err(DbError::Domain(CoreError::InsufficientStock { available, requested, .. }))) => {
                assert_eq!(available, 4);
                assert_eq!(requested, 6);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(db.products().get(fx.product.id).await.unwrap().stock_quantity, 4);
        let movements = db.inventory().movements(fx.product.id).await.unwrap();
        assert_eq!(
            movements.iter().filter(|m| m.movement_type == MovementKind::Out).count(),
            1
        );
        assert_eq!(db.transactions().list(&TransactionFilter::default()).await.unwrap().len(), 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_locked_store_is_busy_and_writes_nothing() {
        let file = TempDbFile::new("locked");
        let config = file.config().max_connections(2).busy_timeout(Duration::from_millis(100));
        let db = Database::new(config).await.unwrap();
        let fx = seed_catalog(&db).await;
        let engine = db.checkout(CheckoutConfig::default());

        let mut writer = db.pool().acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *writer).await.unwrap();

        let err = engine.checkout(fx.admin.id, &cart(&fx, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Busy(_)), "unexpected error: {err:?}");
        assert!(err.is_retryable());

        sqlx::query("ROLLBACK").execute(&mut *writer).await.unwrap();
        drop(writer);

        assert_eq!(db.products().get(fx.product.id).await.unwrap().stock_quantity, 10);
        engine.checkout(fx.admin.id, &cart(&fx, 1)).await.unwrap();
        assert_eq!(db.products().get(fx.product.id).await.unwrap().stock_quantity, 9);
        db.close().await;
    }

    #[tokio::test]
    async fn test_same_product_on_two_lines_counts_once() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;

        let mut request = cart(&fx, 6);
        request.items.push(request.items[0].clone());

        let err = db
            .checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { requested: 12, .. })
        ));
    }

    #[tokio::test]
    async fn test_save10_through_checkout() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let discount = db.discounts().insert(&save10()).await.unwrap();

        let request = CheckoutRequest {
            discount_code: Some(" SAVE10 ".to_string()),
            ..cart(&fx, 10)
        };
        let receipt = db
            .checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap();
        let t = &receipt.transaction;

        assert_eq!(t.subtotal_cents, 10_000);
        assert_eq!(t.discount_amount_cents, 1000);
        assert_eq!(t.tax_amount_cents, 1080);
        assert_eq!(t.total_amount_cents, 10_080);
        assert_eq!(t.discount_id, Some(discount.id));
        assert_eq!(db.discounts().get(discount.id).await.unwrap().used_count, 1);
    }

    #[tokio::test]
    async fn test_below_minimum_applies_nothing_but_counts() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let discount = db.discounts().insert(&save10()).await.unwrap();

        let request = CheckoutRequest {
            discount_code: Some("SAVE10".to_string()),
            ..cart(&fx, 3)
        };
        let receipt = db
            .checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap();

        assert_eq!(receipt.transaction.discount_amount_cents, 0);
        assert_eq!(db.discounts().get(discount.id).await.unwrap().used_count, 1);
    }

    #[tokio::test]
    async fn test_usage_limit_redeemable_exactly_n_times() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let discount = db
            .discounts()
            .insert(&NewDiscount {
                code: Some("TWICE".to_string()),
                minimum_amount_cents: None,
                usage_limit: Some(2),
                ..save10()
            })
            .await
            .unwrap();
        let engine = db.checkout(CheckoutConfig::default());
        let request = CheckoutRequest {
            discount_code: Some("TWICE".to_string()),
            ..cart(&fx, 1)
        };

        engine.checkout(fx.admin.id, &request).await.unwrap();
        engine.checkout(fx.admin.id, &request).await.unwrap();
        let err = engine.checkout(fx.admin.id, &request).await.unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::DiscountInvalid(_))));
        assert_eq!(db.discounts().get(discount.id).await.unwrap().used_count, 2);
        assert_eq!(db.products().get(fx.product.id).await.unwrap().stock_quantity, 8);
    }

    #[tokio::test]
    async fn test_unknown_code_fails() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;

        let request = CheckoutRequest {
            discount_code: Some("NOPE".to_string()),
            ..cart(&fx, 1)
        };
        let err = db
            .checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DiscountNotFound(code)) if code == "NOPE"));

        // blank code means no code
        let request = CheckoutRequest {
            discount_code: Some("   ".to_string()),
            ..cart(&fx, 1)
        };
        db.checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_customer_aggregates_updated() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let customer = db
            .customers()
            .insert(&CustomerInput {
                first_name: Some("Maria".to_string()),
                last_name: Some("Santos".to_string()),
                ..CustomerInput::default()
            })
            .await
            .unwrap();
        let engine = db.checkout(CheckoutConfig::default());

        let request = CheckoutRequest {
            customer_id: Some(customer.id),
            ..cart(&fx, 2)
        };
        engine.checkout(fx.admin.id, &request).await.unwrap();
        engine.checkout(fx.admin.id, &request).await.unwrap();

        let after = db.customers().get(customer.id).await.unwrap();
        assert_eq!(after.total_orders, 2);
        assert_eq!(after.total_spent_cents, 2 * 2240);
        assert!(after.last_purchase_at.is_some());

        let recent = db.customers().recent_transactions(customer.id, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_customer_and_inactive_product() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let engine = db.checkout(CheckoutConfig::default());

        let request = CheckoutRequest {
            customer_id: Some(999),
            ..cart(&fx, 1)
        };
        assert!(matches!(
            engine.checkout(fx.admin.id, &request).await,
            Err(DbError::Domain(CoreError::CustomerNotFound(999)))
        ));

        db.products().deactivate(fx.product.id).await.unwrap();
        assert!(matches!(
            engine.checkout(fx.admin.id, &cart(&fx, 1)).await,
            Err(DbError::Domain(CoreError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_cart_and_custom_tax_rate() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;

        let empty = CheckoutRequest {
            items: Vec::new(),
            ..cart(&fx, 1)
        };
        assert!(matches!(
            db.checkout(CheckoutConfig::default()).checkout(fx.admin.id, &empty).await,
            Err(DbError::Domain(CoreError::EmptyCart))
        ));

        let untaxed = CheckoutConfig {
            tax_rate: TaxRate::zero(),
            allow_underpayment: false,
        };
        let receipt = db.checkout(untaxed).checkout(fx.admin.id, &cart(&fx, 1)).await.unwrap();
        assert_eq!(receipt.transaction.total_amount_cents, 1000);
    }
}
