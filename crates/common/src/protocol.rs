//! Request and response types exchanged with callers.
//!
//! These types are serialised as JSON over the public HTTP API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
///
/// `body` and `stack` are populated only by the development-mode response
/// hook; production responses carry `code` and `message` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"unauthorized"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
    /// Structured body forwarded from the source error, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Stack trace captured from the source error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            body: None,
            stack: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status; the admission gate is stateless, so `"ok"`.
    pub status: String,
    /// Environment mode the gateway is running in.
    pub mode: String,
    /// Whether a bearer-token allow-list is configured.
    pub token_auth_restricted: bool,
    /// Number of IP allow-list entries (addresses plus blocks).
    pub graylist_entries: usize,
}

// ---------------------------------------------------------------------------
// Principal echo
// ---------------------------------------------------------------------------

/// Response body echoing the authenticated principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalResponse {
    /// The raw bearer token the caller presented.
    pub token: String,
    /// Scopes granted by the strategy that authenticated the caller.
    pub scopes: Vec<String>,
}
