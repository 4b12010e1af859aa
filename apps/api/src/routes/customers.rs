//! Customer records. Open to every operator; purchase aggregates are
//! maintained by checkout only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use till_core::{Customer, Feedback, Transaction};
use till_db::repository::customer::CustomerInput;

use crate::auth::Actor;
use crate::error::ApiResult;
use crate::routes::{AppJson, Message};
use crate::AppState;

const RECENT_TRANSACTIONS: i64 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(store))
        .route("/{id}", get(show).put(update).delete(destroy))
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub recent_transactions: Vec<Transaction>,
    pub feedback: Vec<Feedback>,
}

async fn index(
    State(state): State<AppState>,
    _actor: Actor,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list(query.search.as_deref()).await?))
}

async fn store(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(input): AppJson<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.db.customers().insert(&input).await?;
    info!(customer_id = customer.id, created_by = actor.user_id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn show(State(state): State<AppState>, _actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<CustomerDetail>> {
    let customer = state.db.customers().get(id).await?;
    let recent_transactions = state.db.customers().recent_transactions(id, RECENT_TRANSACTIONS).await?;
    let feedback = state.db.feedback().for_customer(id).await?;

    Ok(Json(CustomerDetail {
        customer,
        recent_transactions,
        feedback,
    }))
}

async fn update(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
    AppJson(input): AppJson<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.db.customers().update(id, &input).await?))
}

async fn destroy(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<Message>> {
    state.db.customers().deactivate(id).await?;
    info!(customer_id = id, deleted_by = actor.user_id, "Customer deactivated");
    Ok(Message::new("Customer deleted successfully."))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn test_customer_detail_tracks_purchases() {
        let app = TestApp::new().await;
        let token = app.cashier_token().await;

        let (status, customer) = app
            .post(
                "/api/customers",
                &token,
                json!({ "first_name": "Maria", "last_name": "Santos", "email": "maria@example.com" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{customer}");
        let id = customer["id"].as_i64().unwrap();
        assert_eq!(customer["total_orders"], 0);

        let mut sale = app.sale(2);
        sale["customer_id"] = json!(id);
        let (status, _) = app.post("/api/transactions", &token, sale).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, detail) = app.get(&format!("/api/customers/{id}"), &token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["total_orders"], 1);
        assert_eq!(detail["total_spent_cents"], 2240);
        assert_eq!(detail["recent_transactions"].as_array().unwrap().len(), 1);
        assert!(detail["feedback"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_and_deactivate() {
        let app = TestApp::new().await;
        let token = app.admin_token().await;

        let (_, customer) = app
            .post("/api/customers", &token, json!({ "first_name": "Jose", "last_name": "Cruz" }))
            .await;
        let id = customer["id"].as_i64().unwrap();

        let (_, found) = app.get("/api/customers?search=cruz", &token).await;
        assert_eq!(found.as_array().unwrap().len(), 1);

        let (status, _) = app.delete(&format!("/api/customers/{id}"), &token).await;
        assert_eq!(status, StatusCode::OK);

        let (_, found) = app.get("/api/customers?search=cruz", &token).await;
        assert!(found.as_array().unwrap().is_empty());
    }
}
