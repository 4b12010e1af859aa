//! Checkout and sales history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use till_core::checkout::{CheckoutReceipt, CheckoutRequest};
use till_core::{Event, Feedback, Transaction, TransactionItem};
use till_db::repository::transaction::{DailySales, TransactionFilter};

use crate::auth::Actor;
use crate::error::ApiResult;
use crate::routes::AppJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(store))
        .route("/daily-sales", get(daily_sales))
        .route("/{id}", get(show))
}

#[derive(Debug, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
    pub feedback: Vec<Feedback>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DailySalesQuery {
    pub date: Option<NaiveDate>,
}

async fn index(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<TransactionFilter>,
) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(state.db.transactions().list(&filter).await?))
}

/// POST /api/transactions
///
/// Runs the Checkout Engine, then hands a `transaction_completed` event to
/// the notification sink. Nothing after the commit can fail the request.
async fn store(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(request): AppJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<CheckoutReceipt>)> {
    let receipt = state.db.checkout(state.checkout).checkout(actor.user_id, &request).await?;

    notify_completed(&state, &receipt.transaction).await;

    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn notify_completed(state: &AppState, transaction: &Transaction) {
    let cashier = match state.db.users().get(transaction.user_id).await {
        Ok(user) => user,
        Err(e) => {
            warn!(transaction_id = transaction.id, error = %e, "Skipping sale notification");
            return;
        }
    };

    let customer = match transaction.customer_id {
        Some(id) => match state.db.customers().get(id).await {
            Ok(customer) => Some(customer),
            Err(e) => {
                warn!(transaction_id = transaction.id, error = %e, "Sale notification without customer");
                None
            }
        },
        None => None,
    };

    state
        .notifier
        .notify(Event::transaction_completed(transaction, &cashier, customer.as_ref()));
}

async fn show(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<TransactionDetail>> {
    let transaction = state.db.transactions().get(id).await?;
    let items = state.db.transactions().items(id).await?;
    let feedback = state.db.feedback().for_transaction(id).await?;

    Ok(Json(TransactionDetail {
        transaction,
        items,
        feedback,
    }))
}

/// GET /api/transactions/daily-sales?date=YYYY-MM-DD (default: today)
async fn daily_sales(
    State(state): State<AppState>,
    _actor: Actor,
    Query(query): Query<DailySalesQuery>,
) -> ApiResult<Json<DailySales>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.db.transactions().daily_sales(date).await?))
}
