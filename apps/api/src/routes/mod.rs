//! HTTP routes, mounted under `/api`.
//!
//! - [`session`] - login, current user, logout, password change
//! - [`users`] - operator management and roles (admin)
//! - [`categories`] - category catalog
//! - [`products`] - product catalog and Inventory Ledger endpoints
//! - [`customers`] - customer records
//! - [`transactions`] - checkout and sales history
//! - [`discounts`] - discount rules and code validation
//! - [`feedback`] - ratings and statistics
//! - [`reports`] - period reports and dashboard (admin, manager)
//! - [`health`] - liveness and database check

pub mod categories;
pub mod customers;
pub mod discounts;
pub mod feedback;
pub mod health;
pub mod products;
pub mod reports;
pub mod session;
pub mod transactions;
pub mod users;

use axum::extract::FromRequest;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(session::router())
        .route("/roles", get(users::roles))
        .nest("/users", users::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/customers", customers::router())
        .nest("/transactions", transactions::router())
        .nest("/discounts", discounts::router())
        .nest("/feedback", feedback::router())
        .nest("/reports", reports::router())
}

/// JSON body extractor whose rejection is an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Body of `DELETE` and other acknowledgement-only responses.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> axum::Json<Message> {
        axum::Json(Message {
            message: message.into(),
        })
    }
}
