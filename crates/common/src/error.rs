//! Common error types shared across crates.

use thiserror::Error;

/// Top-level gateway error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`GatewayError::BadRequest`] → 400
/// - [`GatewayError::Unauthorized`] → 401
/// - [`GatewayError::Forbidden`] → 403
/// - [`GatewayError::Internal`] → 500
/// - [`GatewayError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request was malformed — bad header values or invalid JSON.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The bearer token was missing or not in the configured allow-list.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The remote address is not in the configured allow-list.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),

    /// A required resource is temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::BadRequest(_) => 400,
            GatewayError::Unauthorized(_) => 401,
            GatewayError::Forbidden(_) => 403,
            GatewayError::Internal(_) => 500,
            GatewayError::Unavailable(_) => 503,
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::BadRequest(_) => "bad_request",
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::Forbidden(_) => "forbidden",
            GatewayError::Internal(_) => "internal_error",
            GatewayError::Unavailable(_) => "service_unavailable",
        }
    }
}
