//! Category catalog. Reads for any operator, writes for admins and managers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use till_core::{Category, CategorySummary, Product};
use till_db::repository::category::{CategoryUpdate, NewCategory};

use crate::auth::{Actor, BACK_OFFICE};
use crate::error::ApiResult;
use crate::routes::{AppJson, Message};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(store))
        .route("/{id}", get(show).put(update).delete(destroy))
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<Product>,
}

async fn index(State(state): State<AppState>, _actor: Actor) -> ApiResult<Json<Vec<CategorySummary>>> {
    Ok(Json(state.db.categories().list_active().await?))
}

async fn store(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(new): AppJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    actor.require(BACK_OFFICE)?;
    let category = state.db.categories().insert(&new).await?;
    info!(category_id = category.id, name = %category.name, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn show(State(state): State<AppState>, _actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<CategoryDetail>> {
    let category = state.db.categories().get(id).await?;
    let products = state.db.categories().products(id).await?;
    Ok(Json(CategoryDetail { category, products }))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    AppJson(update): AppJson<CategoryUpdate>,
) -> ApiResult<Json<Category>> {
    actor.require(BACK_OFFICE)?;
    Ok(Json(state.db.categories().update(id, &update).await?))
}

async fn destroy(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<Message>> {
    actor.require(BACK_OFFICE)?;
    state.db.categories().deactivate(id).await?;
    info!(category_id = id, "Category deactivated");
    Ok(Message::new("Category deleted successfully."))
}
