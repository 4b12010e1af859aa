//! HTTP error responses.
//!
//! Every failure leaves the API as `{"code": "...", "message": "..."}` with
//! a status from this table:
//!
//! ```text
//! Validation / bad body           400  VALIDATION_ERROR
//! missing or bad token            401  UNAUTHENTICATED
//! wrong email or password         401  INVALID_CREDENTIALS
//! wrong current password          422  INCORRECT_PASSWORD
//! role not allowed                403  FORBIDDEN
//! unknown entity                  404  NOT_FOUND / DISCOUNT_NOT_FOUND
//! duplicate unique value          409  CONFLICT
//! business rule                   422  INSUFFICIENT_STOCK, DISCOUNT_INVALID, ...
//! store busy, retry later         503  STORE_BUSY
//! store failure                   500  INTERNAL_ERROR (details logged only)
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use till_core::CoreError;
use till_db::DbError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthenticated.")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Current password is incorrect.")]
    IncorrectPassword,

    #[error("This action is unauthorized.")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Business(CoreError),

    #[error("The store is busy. Please retry the request.")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::IncorrectPassword => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Business(err) => match err {
                CoreError::Validation(_) | CoreError::EmptyCart | CoreError::CartTooLarge { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::ProductNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::DiscountNotFound(_) => StatusCode::NOT_FOUND,
                CoreError::InsufficientStock { .. }
                | CoreError::DiscountInvalid(_)
                | CoreError::InsufficientPayment { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::IncorrectPassword => "INCORRECT_PASSWORD",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Business(err) => match err {
                CoreError::Validation(_) => "VALIDATION_ERROR",
                CoreError::EmptyCart => "EMPTY_CART",
                CoreError::CartTooLarge { .. } => "CART_TOO_LARGE",
                CoreError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
                CoreError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
                CoreError::DiscountNotFound(_) => "DISCOUNT_NOT_FOUND",
                CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
                CoreError::DiscountInvalid(_) => "DISCOUNT_INVALID",
                CoreError::InsufficientPayment { .. } => "INSUFFICIENT_PAYMENT",
            },
            ApiError::Unavailable(_) => "STORE_BUSY",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
            ApiError::Unavailable(detail) => {
                warn!(error = %detail, "Store busy");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            code: self.code().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Business(err)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::NotFound(format!("{entity} not found: {id}")),
            DbError::UniqueViolation { field, .. } => {
                ApiError::Conflict(format!("The {field} has already been taken."))
            }
            DbError::ForeignKeyViolation { message } => ApiError::Validation(message),
            DbError::Domain(core) => ApiError::Business(core),
            other if other.is_retryable() => ApiError::Unavailable(other.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
