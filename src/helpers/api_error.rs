use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::repositories::store::StoreError;

/// Every failure a handler can report, each mapped to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("email is incorrect")]
    WrongEmail,

    #[error("password is incorrect")]
    WrongPassword,

    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::WrongEmail | ApiError::WrongPassword => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => ApiError::Validation(message),
            StoreError::Backend(source) => ApiError::Internal(format!("{:#}", source)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Validation(message) => {
                json!({ "error": "ValidationError", "message": message })
            }
            ApiError::WrongEmail | ApiError::WrongPassword | ApiError::Unauthorized => {
                json!({ "message": self.to_string() })
            }
            ApiError::BadRequest(message) | ApiError::Upstream(message) => {
                json!({ "message": message })
            }
            ApiError::Internal(_) => json!({ "message": "internal server error" }),
        };

        if status.is_server_error() {
            error!("Responding with {} due to: {}", status, self);
        } else {
            warn!("Responding with {} due to: {}", status, self);
        }

        (status, Json(body)).into_response()
    }
}
