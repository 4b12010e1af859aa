//! Login, logout and the signed-in operator.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use till_core::validation::validate_password;
use till_core::User;
use till_db::password::{hash_password, verify_password};

use crate::auth::Actor;
use crate::error::{ApiError, ApiResult};
use crate::routes::{AppJson, Message};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/user", get(current_user))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

/// POST /api/login
async fn login(State(state): State<AppState>, AppJson(request): AppJson<LoginRequest>) -> ApiResult<Json<LoginResponse>> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required.".to_string()));
    }

    let user = state.db.users().find_by_email(email).await?;
    let user = match user {
        Some(user) if user.can_login() && verify_password(&request.password, &user.password_hash) => user,
        _ => {
            warn!(email, "Failed login attempt");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let now = Utc::now();
    state.db.users().record_login(user.id, now).await?;
    let (token, claims) = state.jwt.issue(&user)?;
    info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        token_type: "Bearer",
        expires_at: claims.expires_at(),
        user: User {
            last_login_at: Some(now),
            ..user
        },
    }))
}

/// GET /api/user
async fn current_user(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<User>> {
    Ok(Json(state.db.users().get(actor.user_id).await?))
}

/// POST /api/logout
async fn logout(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<Message>> {
    state
        .db
        .users()
        .revoke_token(&actor.token_id, actor.user_id, actor.expires_at)
        .await?;
    info!(user_id = actor.user_id, "User logged out");

    Ok(Message::new("Logout successful"))
}

/// POST /api/change-password
async fn change_password(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> ApiResult<Json<Message>> {
    validate_password(&request.new_password).map_err(|e| ApiError::Validation(e.to_string()))?;
    if request.new_password != request.new_password_confirmation {
        return Err(ApiError::Validation(
            "The new password confirmation does not match.".to_string(),
        ));
    }

    let user = state.db.users().get(actor.user_id).await?;
    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(ApiError::IncorrectPassword);
    }

    let hash = hash_password(&request.new_password)?;
    state.db.users().set_password(user.id, &hash).await?;
    info!(user_id = user.id, "Password changed");

    Ok(Message::new("Password changed successfully."))
}
