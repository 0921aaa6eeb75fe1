//! Conversion from gateway errors to HTTP responses.
//!
//! [`ApiError`] is the error half of handler return types. The public JSON
//! body never leaks internals for 5xx responses; the full message, optional
//! structured body and captured stack are attached as a response extension
//! and exposed only by the development-mode response hook.

use std::backtrace::{Backtrace, BacktraceStatus};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, GatewayError};

/// Error detail attached to error responses as a response extension.
///
/// Consumed by the response post-processing hook.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    /// Machine-readable error code mirrored from the public body.
    pub code: String,
    /// The source error's full message.
    pub message: String,
    /// Structured body forwarded from the source error, when one exists.
    pub body: Option<serde_json::Value>,
    /// Stack trace captured where the error was converted to a response.
    pub stack: Option<String>,
}

/// Error type returned by gateway handlers.
///
/// Wraps [`anyhow::Error`] so handlers can use `?` freely; a wrapped
/// [`GatewayError`] determines the HTTP status, anything else maps to 500.
pub struct ApiError {
    err: anyhow::Error,
    body: Option<serde_json::Value>,
}

impl ApiError {
    /// Attach a structured body forwarded from an upstream error.
    pub fn with_body(err: impl Into<anyhow::Error>, body: serde_json::Value) -> Self {
        Self {
            err: err.into(),
            body: Some(body),
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            err: err.into(),
            body: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self.err.downcast_ref::<GatewayError>() {
            Some(e) => (
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.code(),
            ),
            None => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        // 5xx messages are redacted here; the development hook restores them.
        let public_message = if status.is_server_error() {
            "internal server error".to_owned()
        } else {
            self.err.to_string()
        };

        let stack = match self.err.backtrace().status() {
            BacktraceStatus::Captured => Some(self.err.backtrace().to_string()),
            _ => Some(Backtrace::force_capture().to_string()),
        };

        let details = ErrorDetails {
            code: code.to_owned(),
            message: self.err.to_string(),
            body: self.body,
            stack,
        };

        let mut resp = (status, Json(ErrorResponse::new(code, public_message))).into_response();
        resp.extensions_mut().insert(details);
        resp
    }
}
