use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::card_service::CardError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<CardError> for AppError {
    fn from(err: CardError) -> Self {
        let message = err.to_string();
        match err {
            CardError::InvalidInput(_) | CardError::AlreadyBlocked => AppError::Validation(message),
            CardError::DuplicateCard => AppError::Conflict(message),
            CardError::CardNotFound => AppError::NotFound(message),
            CardError::Internal(source) => AppError::Internal(source.context(message)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationError;

    #[test]
    fn test_card_errors_map_to_statuses() {
        let cases = [
            (
                CardError::InvalidInput(ValidationError::InvalidCardNumber),
                StatusCode::BAD_REQUEST,
            ),
            (CardError::DuplicateCard, StatusCode::CONFLICT),
            (CardError::CardNotFound, StatusCode::NOT_FOUND),
            (CardError::AlreadyBlocked, StatusCode::BAD_REQUEST),
            (
                CardError::Internal(anyhow::anyhow!("pool timed out")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_internal_error_keeps_cause_chain() {
        let err = AppError::from(CardError::Internal(anyhow::anyhow!("pool timed out")));

        let AppError::Internal(e) = err else {
            panic!("expected an internal error");
        };
        let chain: Vec<String> = e.chain().map(|cause| cause.to_string()).collect();
        assert_eq!(chain, ["Internal error", "pool timed out"]);
    }
}
