use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dispatch_core::SaveResponse;
use thiserror::Error;

pub const TEXT_REQUIRED: &str = "The 'text' field is required";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    ValidationFailed(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    pub fn internal(error: impl std::fmt::Display) -> Self {
        Self::InternalServerError(error.to_string())
    }

    fn public_message(&self) -> String {
        match self {
            Self::InternalServerError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::InternalServerError(ref detail) => {
                tracing::error!("Request failed: {detail}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(SaveResponse::failed(self.public_message()))).into_response()
    }
}
