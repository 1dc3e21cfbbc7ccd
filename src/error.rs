use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    CityNotFound(String),
    #[error("Upstream API error: {0}")]
    UpstreamApi(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::CityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamApi(_) => StatusCode::BAD_GATEWAY,
            AppError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Failing to reach the upstream or to read its response is a transport
// failure; a response that arrived whole but cannot be understood is the
// upstream's fault.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::UpstreamApi(err.to_string())
        } else if err.is_connect()
            || err.is_timeout()
            || err.is_request()
            || err.is_body()
            || err.is_redirect()
        {
            AppError::Network(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::UpstreamApi(format!("JSON parsing failed: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Network(_) => {
                tracing::warn!("Upstream unreachable: {}", self);
                json!({ "error": "No internet connection or incorrect URL" })
            }
            AppError::Internal(details) => {
                tracing::error!("Unhandled failure: {}", details);
                json!({ "error": "Internal Server Error", "details": details })
            }
            other => {
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", other);
                }
                json!({ "error": other.to_string() })
            }
        };

        (status, Json(body)).into_response()
    }
}
