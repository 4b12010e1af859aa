//! Operator management. Admin only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use till_core::validation::validate_password;
use till_core::{Event, Role, User};
use till_db::password::hash_password;
use till_db::repository::user::{NewUser, UserUpdate};

use crate::auth::{Actor, ADMIN_ONLY};
use crate::error::{ApiError, ApiResult};
use crate::routes::{AppJson, Message};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(store))
        .route("/{id}", get(show).put(update).delete(destroy))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    #[serde(flatten)]
    pub user: NewUser,
    pub password: String,
    pub password_confirmation: String,
}

/// GET /api/roles
pub async fn roles(actor: Actor) -> ApiResult<Json<Vec<Role>>> {
    actor.require(ADMIN_ONLY)?;
    Ok(Json(vec![Role::Admin, Role::Manager, Role::Cashier]))
}

async fn index(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<User>>> {
    actor.require(ADMIN_ONLY)?;
    let users = state.db.users().list(query.search.as_deref(), query.role).await?;
    Ok(Json(users))
}

async fn store(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(request): AppJson<CreateUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    actor.require(ADMIN_ONLY)?;
    validate_password(&request.password).map_err(|e| ApiError::Validation(e.to_string()))?;
    if request.password != request.password_confirmation {
        return Err(ApiError::Validation("The password confirmation does not match.".to_string()));
    }

    let hash = hash_password(&request.password)?;
    let user = state.db.users().insert(&request.user, &hash).await?;
    info!(user_id = user.id, role = %user.role, created_by = actor.user_id, "User created");

    state.notifier.notify(Event::user_created(&user));

    Ok((StatusCode::CREATED, Json(user)))
}

async fn show(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<User>> {
    actor.require(ADMIN_ONLY)?;
    let user = state.db.users().get(id).await?;
    if user.is_deleted {
        return Err(ApiError::NotFound(format!("User not found: {id}")));
    }
    Ok(Json(user))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    AppJson(update): AppJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    actor.require(ADMIN_ONLY)?;
    let user = state.db.users().update(id, &update).await?;
    info!(user_id = id, updated_by = actor.user_id, "User updated");
    Ok(Json(user))
}

async fn destroy(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<Json<Message>> {
    actor.require(ADMIN_ONLY)?;
    if id == actor.user_id {
        return Err(ApiError::Validation("You cannot delete your own account.".to_string()));
    }

    state.db.users().soft_delete(id).await?;
    info!(user_id = id, deleted_by = actor.user_id, "User deleted");
    Ok(Message::new("User deleted successfully."))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use till_core::Event;

    use crate::testing::TestApp;

    fn new_user(email: &str) -> serde_json::Value {
        json!({
            "employee_id": "EMP-0200",
            "first_name": "Luis",
            "last_name": "Garcia",
            "email": email,
            "role": "manager",
            "password": "manager-pass",
            "password_confirmation": "manager-pass",
        })
    }

    #[tokio::test]
    async fn test_admin_creates_user_and_event_is_emitted() {
        let app = TestApp::new().await;
        let token = app.admin_token().await;

        let (status, body) = app.post("/api/users", &token, new_user("luis@till.local")).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["role"], "manager");

        let events = app.notifier.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::UserCreated(created) => {
                assert_eq!(created.email, "luis@till.local");
                assert_eq!(created.name, "Luis Garcia");
            }
            other => panic!("unexpected event {other:?}"),
        }

        let (status, body) = app.post("/api/users", &token, new_user("luis@till.local")).await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");
    }

    #[tokio::test]
    async fn test_cashier_cannot_manage_users() {
        let app = TestApp::new().await;
        let token = app.cashier_token().await;

        let (status, body) = app.post("/api/users", &token, new_user("x@till.local")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, _) = app.get("/api/users", &token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(app.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_password_confirmation_must_match() {
        let app = TestApp::new().await;
        let token = app.admin_token().await;

        let mut body = new_user("luis@till.local");
        body["password_confirmation"] = json!("something-else");
        let (status, _) = app.post("/api/users", &token, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let app = TestApp::new().await;
        let token = app.admin_token().await;

        let (status, _) = app.delete(&format!("/api/users/{}", app.admin.id), &token).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
