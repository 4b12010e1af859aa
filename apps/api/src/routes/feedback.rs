//! Customer ratings of completed sales.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{info, warn};

use till_core::{Event, Feedback};
use till_db::repository::feedback::{FeedbackStatistics, NewFeedback, RecordedFeedback};

use crate::auth::Actor;
use crate::error::ApiResult;
use crate::routes::AppJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(store))
        .route("/statistics", get(statistics))
        .route("/{id}", get(show))
}

async fn index(State(state): State<AppState>, _actor: Actor) -> ApiResult<Json<Vec<Feedback>>> {
    Ok(Json(state.db.feedback().list().await?))
}

/// POST /api/feedback
async fn store(
    State(state): State<AppState>,
    _actor: Actor,
    AppJson(new): AppJson<NewFeedback>,
) -> ApiResult<(StatusCode, Json<RecordedFeedback>)> {
    let recorded = state.db.feedback().insert(&new).await?;
    info!(
        feedback_id = recorded.feedback.id,
        transaction = %recorded.transaction_number,
        rating = recorded.feedback.rating,
        "Feedback received"
    );

    let customer = match recorded.feedback.customer_id {
        Some(id) => state
            .db
            .customers()
            .get(id)
            .await
            .map_err(|e| warn!(feedback_id = recorded.feedback.id, error = %e, "Feedback notification without customer"))
            .ok(),
        None => None,
    };
    state.notifier.notify(Event::feedback_received(
        &recorded.feedback,
        &recorded.transaction_number,
        customer.as_ref(),
    ));

    Ok((StatusCode::CREATED, Json(recorded)))
}

async fn show(State(state): State<AppState>, _actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<Feedback>> {
    Ok(Json(state.db.feedback().get(id).await?))
}

async fn statistics(State(state): State<AppState>, _actor: Actor) -> ApiResult<Json<FeedbackStatistics>> {
    Ok(Json(state.db.feedback().statistics().await?))
}
