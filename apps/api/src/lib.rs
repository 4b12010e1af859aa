//! # till-api: JSON HTTP API for the Till back office
//!
//! Thin orchestration over `till-db`: every handler authenticates the
//! [`auth::Actor`], checks its role, calls one repository or the Checkout
//! Engine, and maps failures through [`error::ApiError`].
//!
//! ## Request Flow
//! ```text
//! HTTP request
//!   │
//!   ├─► TraceLayer / CorsLayer
//!   ├─► Actor extractor (Bearer JWT, revocation, active user)
//!   ├─► role guard
//!   ├─► repository / CheckoutEngine (one sqlx transaction per write)
//!   └─► NotificationSink (after commit, spawned)
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use till_core::checkout::CheckoutConfig;
use till_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::notify::NotificationSink;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
    pub checkout: CheckoutConfig,
    pub notifier: Arc<dyn NotificationSink>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig, notifier: Arc<dyn NotificationSink>) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);
        let checkout = config.checkout_config();

        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            checkout,
            notifier,
        }
    }
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
