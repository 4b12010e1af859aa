//! Period reports and the dashboard. Admins and managers only.
//!
//! Every report takes optional `start_date` / `end_date` query parameters
//! and defaults to the current month so far.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use till_db::repository::report::{
    CustomerReport, Dashboard, FeedbackReport, Period, ProductReport, ReportPeriod, SalesReport,
};

use crate::auth::{Actor, BACK_OFFICE};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales", get(sales))
        .route("/products", get(products))
        .route("/customers", get(customers))
        .route("/feedback", get(feedback))
        .route("/dashboard", get(dashboard))
}

fn authorize(actor: &Actor, requested: ReportPeriod) -> ApiResult<Period> {
    actor.require(BACK_OFFICE)?;

    let period = requested.resolve(Utc::now().date_naive());
    if period.start_date > period.end_date {
        return Err(ApiError::Validation("start_date must not be after end_date.".to_string()));
    }
    Ok(period)
}

async fn sales(
    State(state): State<AppState>,
    actor: Actor,
    Query(requested): Query<ReportPeriod>,
) -> ApiResult<Json<SalesReport>> {
    let period = authorize(&actor, requested)?;
    Ok(Json(state.db.reports().sales(period).await?))
}

async fn products(
    State(state): State<AppState>,
    actor: Actor,
    Query(requested): Query<ReportPeriod>,
) -> ApiResult<Json<ProductReport>> {
    let period = authorize(&actor, requested)?;
    Ok(Json(state.db.reports().products(period).await?))
}

async fn customers(
    State(state): State<AppState>,
    actor: Actor,
    Query(requested): Query<ReportPeriod>,
) -> ApiResult<Json<CustomerReport>> {
    let period = authorize(&actor, requested)?;
    Ok(Json(state.db.reports().customers(period).await?))
}

async fn feedback(
    State(state): State<AppState>,
    actor: Actor,
    Query(requested): Query<ReportPeriod>,
) -> ApiResult<Json<FeedbackReport>> {
    let period = authorize(&actor, requested)?;
    Ok(Json(state.db.reports().feedback(period).await?))
}

async fn dashboard(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<Dashboard>> {
    actor.require(BACK_OFFICE)?;
    Ok(Json(state.db.reports().dashboard(Utc::now().date_naive()).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn test_cashier_cannot_read_reports() {
        let app = TestApp::new().await;
        let token = app.cashier_token().await;

        for uri in ["/api/reports/sales", "/api/reports/dashboard"] {
            let (status, body) = app.get(uri, &token).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(body["code"], "FORBIDDEN");
        }
    }

    #[tokio::test]
    async fn test_dashboard_and_sales_report() {
        let app = TestApp::new().await;
        let token = app.admin_token().await;
        app.post("/api/transactions", &token, app.sale(3)).await;

        let (status, dashboard) = app.get("/api/reports/dashboard", &token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["today_sales_cents"], 3360);
        assert_eq!(dashboard["today_transactions"], 1);
        assert_eq!(dashboard["active_products"], 1);

        let (status, report) = app.get("/api/reports/sales", &token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["summary"]["total_transactions"], 1);
        assert_eq!(report["summary"]["total_tax_cents"], 360);

        let (status, report) = app.get("/api/reports/products", &token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["top_sellers"][0]["quantity_sold"], 3);
    }

    #[tokio::test]
    async fn test_inverted_period_is_rejected() {
        let app = TestApp::new().await;
        let token = app.admin_token().await;

        let (status, _) = app
            .get("/api/reports/sales?start_date=2026-03-10&end_date=2026-03-01", &token)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
