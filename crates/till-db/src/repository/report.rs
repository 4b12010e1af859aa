//! # Reports
//!
//! Fixed aggregates over completed sales in an inclusive date range.
//! Each report is a handful of plain SQL statements.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use till_core::{Feedback, Product};

use crate::error::DbResult;
use crate::repository::feedback::{FeedbackRepository, FeedbackStatistics};
use crate::repository::product::ProductRepository;
use crate::repository::transaction::ProductSales;

/// Requested date range. Missing bounds default to the current month so far.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReportPeriod {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A resolved, inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportPeriod {
    pub fn resolve(&self, today: NaiveDate) -> Period {
        let first_of_month = today.with_day(1).unwrap_or(today);
        Period {
            start_date: self.start_date.unwrap_or(first_of_month),
            end_date: self.end_date.unwrap_or(today),
        }
    }
}

// =============================================================================
// Report Shapes
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SalesDay {
    pub date: NaiveDate,
    pub transactions: i64,
    pub total_sales_cents: i64,
    pub total_discounts_cents: i64,
    pub total_tax_cents: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SalesSummary {
    pub total_transactions: i64,
    pub total_sales_cents: i64,
    pub total_discounts_cents: i64,
    pub total_tax_cents: i64,
    pub average_sale_cents: f64,
    pub min_sale_cents: i64,
    pub max_sale_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub period: Period,
    pub daily: Vec<SalesDay>,
    pub summary: SalesSummary,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryPerformance {
    pub category_id: i64,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductReport {
    pub period: Period,
    pub top_sellers: Vec<ProductSales>,
    pub low_stock: Vec<Product>,
    pub categories: Vec<CategoryPerformance>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopCustomer {
    pub customer_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub transactions: i64,
    pub spent_cents: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerStatistics {
    pub total_customers: i64,
    pub active_customers: i64,
    pub new_customers: i64,
    pub average_lifetime_spent_cents: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerReport {
    pub period: Period,
    pub top_customers: Vec<TopCustomer>,
    pub statistics: CustomerStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackReport {
    pub period: Period,
    pub statistics: FeedbackStatistics,
    pub recent: Vec<Feedback>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub today_sales_cents: i64,
    pub today_transactions: i64,
    pub month_sales_cents: i64,
    pub active_products: i64,
    pub low_stock_products: i64,
    pub active_customers: i64,
    pub average_rating: f64,
}

#[derive(Debug, FromRow)]
struct SalesTotal {
    transactions: i64,
    total_sales_cents: i64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    pub async fn sales(&self, period: Period) -> DbResult<SalesReport> {
        let daily = sqlx::query_as::<_, SalesDay>(
            r#"
            SELECT substr(created_at, 1, 10) AS date,
                   COUNT(*) AS transactions,
                   CAST(SUM(total_amount_cents) AS INTEGER) AS total_sales_cents,
                   CAST(SUM(discount_amount_cents) AS INTEGER) AS total_discounts_cents,
                   CAST(SUM(tax_amount_cents) AS INTEGER) AS total_tax_cents
            FROM transactions
            WHERE status = 'completed'
              AND substr(created_at, 1, 10) BETWEEN ?1 AND ?2
            GROUP BY substr(created_at, 1, 10)
            ORDER BY date
            "#,
        )
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_all(&self.pool)
        .await?;

        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT COUNT(*) AS total_transactions,
                   CAST(COALESCE(SUM(total_amount_cents), 0) AS INTEGER) AS total_sales_cents,
                   CAST(COALESCE(SUM(discount_amount_cents), 0) AS INTEGER) AS total_discounts_cents,
                   CAST(COALESCE(SUM(tax_amount_cents), 0) AS INTEGER) AS total_tax_cents,
                   COALESCE(AVG(total_amount_cents), 0.0) AS average_sale_cents,
                   CAST(COALESCE(MIN(total_amount_cents), 0) AS INTEGER) AS min_sale_cents,
                   CAST(COALESCE(MAX(total_amount_cents), 0) AS INTEGER) AS max_sale_cents
            FROM transactions
            WHERE status = 'completed'
              AND substr(created_at, 1, 10) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesReport {
            period,
            daily,
            summary,
        })
    }

    pub async fn products(&self, period: Period) -> DbResult<ProductReport> {
        let top_sellers = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT p.id AS product_id, p.name, p.sku,
                   CAST(SUM(ti.quantity) AS INTEGER) AS quantity_sold,
                   CAST(SUM(ti.total_price_cents) AS INTEGER) AS revenue_cents
            FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            JOIN products p ON p.id = ti.product_id
            WHERE t.status = 'completed'
              AND substr(t.created_at, 1, 10) BETWEEN ?1 AND ?2
            GROUP BY p.id, p.name, p.sku
            ORDER BY quantity_sold DESC, revenue_cents DESC
            LIMIT 20
            "#,
        )
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_all(&self.pool)
        .await?;

        let categories = sqlx::query_as::<_, CategoryPerformance>(
            r#"
            SELECT c.id AS category_id, c.name,
                   CAST(SUM(ti.quantity) AS INTEGER) AS quantity_sold,
                   CAST(SUM(ti.total_price_cents) AS INTEGER) AS revenue_cents
            FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            JOIN products p ON p.id = ti.product_id
            JOIN categories c ON c.id = p.category_id
            WHERE t.status = 'completed'
              AND substr(t.created_at, 1, 10) BETWEEN ?1 AND ?2
            GROUP BY c.id, c.name
            ORDER BY revenue_cents DESC
            "#,
        )
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_all(&self.pool)
        .await?;

        let low_stock = ProductRepository::new(self.pool.clone()).low_stock().await?;

        Ok(ProductReport {
            period,
            top_sellers,
            low_stock,
            categories,
        })
    }

    pub async fn customers(&self, period: Period) -> DbResult<CustomerReport> {
        let top_customers = sqlx::query_as::<_, TopCustomer>(
            r#"
            SELECT c.id AS customer_id, c.first_name, c.last_name,
                   COUNT(t.id) AS transactions,
                   CAST(SUM(t.total_amount_cents) AS INTEGER) AS spent_cents
            FROM transactions t
            JOIN customers c ON c.id = t.customer_id
            WHERE t.status = 'completed'
              AND substr(t.created_at, 1, 10) BETWEEN ?1 AND ?2
            GROUP BY c.id, c.first_name, c.last_name
            ORDER BY spent_cents DESC
            LIMIT 20
            "#,
        )
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_all(&self.pool)
        .await?;

        let statistics = sqlx::query_as::<_, CustomerStatistics>(
            r#"
            SELECT COUNT(*) AS total_customers,
                   CAST(COALESCE(SUM(is_active = 1), 0) AS INTEGER) AS active_customers,
                   CAST(COALESCE(SUM(substr(created_at, 1, 10) BETWEEN ?1 AND ?2), 0) AS INTEGER)
                       AS new_customers,
                   COALESCE(AVG(total_spent_cents), 0.0) AS average_lifetime_spent_cents
            FROM customers
            "#,
        )
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(CustomerReport {
            period,
            top_customers,
            statistics,
        })
    }

    pub async fn feedback(&self, period: Period) -> DbResult<FeedbackReport> {
        let repo = FeedbackRepository::new(self.pool.clone());
        let statistics = repo
            .statistics_between(Some(period.start_date), Some(period.end_date))
            .await?;
        let recent = repo.recent(10).await?;

        Ok(FeedbackReport {
            period,
            statistics: FeedbackStatistics {
                average_rating: round2(statistics.average_rating),
                ..statistics
            },
            recent,
        })
    }

    /// Headline numbers for `today` and its month.
    pub async fn dashboard(&self, today: NaiveDate) -> DbResult<Dashboard> {
        let month = ReportPeriod::default().resolve(today);

        let day = self.sales_total(today, today).await?;
        let month_total = self.sales_total(month.start_date, month.end_date).await?;

        let active_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        let low_stock_products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE is_active = 1 AND stock_quantity <= min_stock_level",
        )
        .fetch_one(&self.pool)
        .await?;
        let active_customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        let average_rating: f64 = sqlx::query_scalar("SELECT COALESCE(AVG(rating), 0.0) FROM feedback")
            .fetch_one(&self.pool)
            .await?;

        Ok(Dashboard {
            today_sales_cents: day.total_sales_cents,
            today_transactions: day.transactions,
            month_sales_cents: month_total.total_sales_cents,
            active_products,
            low_stock_products,
            active_customers,
            average_rating: round2(average_rating),
        })
    }

    async fn sales_total(&self, from: NaiveDate, to: NaiveDate) -> DbResult<SalesTotal> {
        let total = sqlx::query_as::<_, SalesTotal>(
            r#"
            SELECT COUNT(*) AS transactions,
                   CAST(COALESCE(SUM(total_amount_cents), 0) AS INTEGER) AS total_sales_cents
            FROM transactions
            WHERE status = 'completed'
              AND substr(created_at, 1, 10) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::customer::CustomerInput;
    use crate::repository::feedback::NewFeedback;
    use crate::testing::{cart, record_sale, seed_catalog, test_db};
    use chrono::Utc;
    use till_core::checkout::{CheckoutConfig, CheckoutRequest};

    fn this_month() -> Period {
        ReportPeriod::default().resolve(Utc::now().date_naive())
    }

    #[test]
    fn test_period_defaults_to_month_to_date() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let period = ReportPeriod::default().resolve(today);
        assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(period.end_date, today);

        let explicit = ReportPeriod {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: None,
        }
        .resolve(today);
        assert_eq!(explicit.start_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[tokio::test]
    async fn test_sales_report() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        record_sale(&db, &fx, 1).await;
        record_sale(&db, &fx, 3).await;

        let report = db.reports().sales(this_month()).await.unwrap();
        assert_eq!(report.daily.len(), 1);
        assert_eq!(report.daily[0].transactions, 2);
        assert_eq!(report.summary.total_sales_cents, 1120 + 3360);
        assert_eq!(report.summary.min_sale_cents, 1120);
        assert_eq!(report.summary.max_sale_cents, 3360);
        assert_eq!(report.summary.total_tax_cents, 120 + 360);
    }

    #[tokio::test]
    async fn test_product_and_customer_reports() {
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

        let request = CheckoutRequest {
            customer_id: Some(customer.id),
            ..cart(&fx, 6)
        };
        db.checkout(CheckoutConfig::default())
            .checkout(fx.admin.id, &request)
            .await
            .unwrap();

        let products = db.reports().products(this_month()).await.unwrap();
        assert_eq!(products.top_sellers[0].quantity_sold, 6);
        assert_eq!(products.categories[0].name, "Beverages");
        // 10 - 6 = 4, at or below the reorder level of 5
        assert_eq!(products.low_stock.len(), 1);

        let customers = db.reports().customers(this_month()).await.unwrap();
        assert_eq!(customers.top_customers.len(), 1);
        assert_eq!(customers.top_customers[0].spent_cents, 6720);
        assert_eq!(customers.statistics.new_customers, 1);
    }

    #[tokio::test]
    async fn test_dashboard_and_feedback_report() {
        let db = test_db().await;
        let fx = seed_catalog(&db).await;
        let sale = record_sale(&db, &fx, 2).await;

        for rating in [5, 4, 4] {
            db.feedback()
                .insert(&NewFeedback {
                    transaction_id: sale.id,
                    customer_id: None,
                    rating,
                    comment: None,
                    survey_responses: None,
                })
                .await
                .unwrap();
        }

        let dashboard = db.reports().dashboard(Utc::now().date_naive()).await.unwrap();
        assert_eq!(dashboard.today_transactions, 1);
        assert_eq!(dashboard.today_sales_cents, 2240);
        assert_eq!(dashboard.month_sales_cents, 2240);
        assert_eq!(dashboard.active_products, 1);
        assert_eq!(dashboard.low_stock_products, 0);
        assert_eq!(dashboard.average_rating, 4.33);

        let report = db.reports().feedback(this_month()).await.unwrap();
        assert_eq!(report.statistics.total_feedback, 3);
        assert_eq!(report.statistics.average_rating, 4.33);
        assert_eq!(report.recent.len(), 3);
    }
}
