use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::application::usecases::lifecycle::LifecycleError;
use crate::application::usecases::trial_eligibility::TrialError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<LifecycleError> for AppError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::NotFound => AppError::NotFound("subscription not found".to_string()),
            LifecycleError::ProductNotFound => {
                AppError::NotFound("product not found".to_string())
            }
            LifecycleError::InvalidTransition(detail) => AppError::Conflict(detail),
            LifecycleError::NotASubscription => {
                AppError::BadRequest("product is not a subscription".to_string())
            }
            LifecycleError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl From<TrialError> for AppError {
    fn from(value: TrialError) -> Self {
        match value {
            TrialError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(_) => {
                // Don't leak internal error detail to client
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}
