//! Discount rules and the code validation helper used by the register.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use till_core::Discount;
use till_db::repository::discount::{DiscountUpdate, NewDiscount};

use crate::auth::{Actor, BACK_OFFICE};
use crate::error::ApiResult;
use crate::routes::{AppJson, Message};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(store))
        .route("/validate", post(validate_code))
        .route("/{id}", get(show).put(update).delete(destroy))
}

#[derive(Debug, Deserialize)]
pub struct ValidateCode {
    pub code: String,
    pub amount_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct ValidCode {
    pub valid: bool,
    pub discount: Discount,
    pub discount_amount_cents: i64,
}

async fn index(State(state): State<AppState>, _actor: Actor) -> ApiResult<Json<Vec<Discount>>> {
    Ok(Json(state.db.discounts().list().await?))
}

async fn store(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(new): AppJson<NewDiscount>,
) -> ApiResult<(StatusCode, Json<Discount>)> {
    actor.require(BACK_OFFICE)?;
    let discount = state.db.discounts().insert(&new).await?;
    info!(discount_id = discount.id, code = ?discount.code, "Discount created");
    Ok((StatusCode::CREATED, Json(discount)))
}

async fn show(State(state): State<AppState>, _actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<Discount>> {
    Ok(Json(state.db.discounts().get(id).await?))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    AppJson(update): AppJson<DiscountUpdate>,
) -> ApiResult<Json<Discount>> {
    actor.require(BACK_OFFICE)?;
    Ok(Json(state.db.discounts().update(id, &update).await?))
}

async fn destroy(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<Message>> {
    actor.require(BACK_OFFICE)?;
    state.db.discounts().deactivate(id).await?;
    info!(discount_id = id, "Discount deactivated");
    Ok(Message::new("Discount deleted successfully."))
}

/// POST /api/discounts/validate
///
/// 404 for an unknown code, 422 for an inactive, expired or used-up one.
async fn validate_code(
    State(state): State<AppState>,
    _actor: Actor,
    AppJson(request): AppJson<ValidateCode>,
) -> ApiResult<Json<ValidCode>> {
    let check = state
        .db
        .discounts()
        .validate_code(&request.code, request.amount_cents, Utc::now())
        .await?;

    Ok(Json(ValidCode {
        valid: true,
        discount: check.discount,
        discount_amount_cents: check.discount_amount_cents,
    }))
}
