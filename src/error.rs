// src/error.rs

use crate::completion::CompletionError;
use crate::knowledge::KnowledgeError;
use crate::sandbox::SandboxError;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors surfaced to HTTP clients.
///
/// Component errors are translated here into a small set of statuses:
/// - completion backend failures → 502
/// - sandbox, knowledge store, and model pull failures → 500
/// - bad parameters → 422
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error("Model pull failed: {0}")]
    ModelPull(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Completion(_) => StatusCode::BAD_GATEWAY,
            AppError::Sandbox(_) | AppError::Knowledge(_) | AppError::ModelPull(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
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
        (
            self.status(),
            Json(serde_json::json!({
                "detail": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_errors_map_to_their_status_category() {
        assert_eq!(
            AppError::from(CompletionError::MissingField).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(SandboxError::Timeout { seconds: 30 }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::ModelPull("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Validation("k".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn detail_carries_the_component_message() {
        let err = AppError::from(SandboxError::Timeout { seconds: 30 });
        assert_eq!(err.to_string(), "sandbox execution timed out after 30s");
    }
}
