use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::orchestrator::{FailureKind, TaskError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task failed: {0}")]
    Task(#[from] TaskError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Task(e) => {
                let kind = e.kind();
                tracing::error!(kind = ?kind, "Task failed: {}", e.diagnostic());
                let (status, code, message) = task_failure(kind);
                (status, code, message.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Stable status, code and user-facing copy per failure kind.
fn task_failure(kind: FailureKind) -> (StatusCode, &'static str, &'static str) {
    match kind {
        FailureKind::NoUsableDocuments => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "NO_USABLE_DOCUMENTS",
            "None of the uploaded documents contained readable text",
        ),
        FailureKind::ProviderAuth => (
            StatusCode::BAD_GATEWAY,
            "AI_PROVIDER_AUTH",
            "The AI provider rejected the configured credentials",
        ),
        FailureKind::AllProvidersFailed => (
            StatusCode::SERVICE_UNAVAILABLE,
            "AI_UNAVAILABLE",
            "AI processing is temporarily unavailable, please try again",
        ),
        FailureKind::ResponseFormat | FailureKind::SchemaValidation => (
            StatusCode::BAD_GATEWAY,
            "AI_RESPONSE_INVALID",
            "The AI returned a response that could not be used, please try again",
        ),
    }
}
