use crate::config::ConfigError;
use crate::engine::service::EngineError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Application-boundary error for the binary: everything the CLI and server
/// startup path can fail with, plus engine errors surfaced outside the
/// router.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Engine(EngineError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Engine(EngineError::Transition(_))
            | AppError::Engine(EngineError::Overbooked(_)) => StatusCode::CONFLICT,
            AppError::Engine(EngineError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Engine(EngineError::Repository(_))
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
