//! API 错误类型与 HTTP 映射

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use galsim_core::ErrorBody;
use galsim_session::SessionError;
use thiserror::Error;

use crate::engine::EngineError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid theme: {0}")]
    InvalidTheme(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("session not found or expired: {0}")]
    SessionNotFound(String),

    #[error("too many active sessions (limit {0})")]
    Capacity(usize),

    #[error("dialogue generation failed: {0}")]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidTheme(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidTheme(_) => "INVALID_THEME",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            ApiError::Capacity(_) => "SESSION_CAPACITY",
            ApiError::Engine(_) => "DIALOGUE_ERROR",
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound { id } | SessionError::Expired { id } => {
                ApiError::SessionNotFound(id)
            }
            SessionError::CapacityExceeded { limit } => ApiError::Capacity(limit),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
