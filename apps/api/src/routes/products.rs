//! Product catalog and the Inventory Ledger endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use till_core::{InventoryMovement, Product};
use till_db::repository::inventory::StockAdjustment;
use till_db::repository::product::{NewProduct, ProductFilter, ProductUpdate};

use crate::auth::{Actor, BACK_OFFICE};
use crate::error::ApiResult;
use crate::routes::{AppJson, Message};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(store))
        .route("/low-stock/list", get(low_stock))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/stock", post(adjust_stock))
        .route("/{id}/movements", get(movements))
}

#[derive(Debug, Serialize)]
pub struct StockAdjusted {
    pub message: &'static str,
    pub product: Product,
    pub movement: InventoryMovement,
}

async fn index(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list(&filter).await?))
}

async fn store(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(new): AppJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    actor.require(BACK_OFFICE)?;
    let product = state.db.products().insert(&new, actor.user_id).await?;
    info!(product_id = product.id, sku = %product.sku, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn show(State(state): State<AppState>, _actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().get(id).await?))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    AppJson(update): AppJson<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    actor.require(BACK_OFFICE)?;
    Ok(Json(state.db.products().update(id, &update).await?))
}

async fn destroy(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<Message>> {
    actor.require(BACK_OFFICE)?;
    state.db.products().deactivate(id).await?;
    info!(product_id = id, "Product deactivated");
    Ok(Message::new("Product deleted successfully."))
}

/// POST /api/products/{id}/stock
async fn adjust_stock(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    AppJson(adjustment): AppJson<StockAdjustment>,
) -> ApiResult<Json<StockAdjusted>> {
    actor.require(BACK_OFFICE)?;
    let (product, movement) = state.db.inventory().adjust_stock(id, &adjustment, actor.user_id).await?;

    Ok(Json(StockAdjusted {
        message: "Stock updated successfully.",
        product,
        movement,
    }))
}

/// GET /api/products/low-stock/list
async fn low_stock(State(state): State<AppState>, _actor: Actor) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().low_stock().await?))
}

async fn movements(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<InventoryMovement>>> {
    Ok(Json(state.db.inventory().movements(id).await?))
}
