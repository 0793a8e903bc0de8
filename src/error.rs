//! Error handling
//!
//! Every request failure reaches the client the same way: `400` with
//! `{"error": "<message>"}`. The variants only matter for logging.

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::logic::model::{FrameError, InferenceError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Caller errors
    #[error("415 Unsupported Media Type: Did not attempt to load JSON data because the request Content-Type was not 'application/json'.")]
    UnsupportedMediaType,

    #[error("400 Bad Request: {0}")]
    UnreadableBody(#[from] BytesRejection),

    #[error("400 Bad Request: Failed to decode JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidRecord(#[from] FrameError),

    // Model errors
    #[error("{0}")]
    Inference(#[from] InferenceError),

    #[error("{0}")]
    MalformedOutput(String),

    // Generic errors
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn is_caller_error(&self) -> bool {
        match self {
            AppError::UnsupportedMediaType
            | AppError::UnreadableBody(_)
            | AppError::InvalidJson(_)
            | AppError::InvalidRecord(_) => true,
            AppError::Inference(err) => matches!(
                err,
                InferenceError::MissingColumns(_) | InferenceError::InvalidCell { .. }
            ),
            AppError::MalformedOutput(_) | AppError::Internal(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_caller_error() {
            tracing::warn!("Rejected prediction request: {:?}", self);
        } else {
            tracing::error!("Prediction failed: {:?}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("inference task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_variant_is_a_bad_request() {
        let errors = vec![
            AppError::UnsupportedMediaType,
            AppError::InvalidJson(serde_json::from_str::<serde_json::Value>("{").unwrap_err()),
            AppError::InvalidRecord(FrameError::NotAnObject("array")),
            AppError::Inference(InferenceError::MissingColumns(vec!["brand".into()])),
            AppError::Inference(InferenceError::Runtime("boom".into())),
            AppError::MalformedOutput("short".into()),
            AppError::Internal("panic".into()),
        ];

        for err in errors {
            let message = err.to_string();
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body, json!({ "error": message }));
        }
    }

    #[test]
    fn test_caller_errors_are_told_apart() {
        assert!(AppError::UnsupportedMediaType.is_caller_error());
        assert!(AppError::Inference(InferenceError::MissingColumns(vec![])).is_caller_error());
        assert!(!AppError::Inference(InferenceError::NoOutput).is_caller_error());
        assert!(!AppError::Internal("x".into()).is_caller_error());
    }
}
