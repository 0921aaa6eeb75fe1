//! Axum request handlers for the gateway's own endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use common::protocol::{ErrorResponse, HealthResponse, PrincipalResponse};

use crate::admission::AuthenticatedPrincipal;

use super::state::AppState;

/// `GET /health` — liveness check and admission-gate summary.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        mode: state.config.node_env.as_str().into(),
        token_auth_restricted: state.tokens.is_restricted(),
        graylist_entries: state.graylist.len(),
    })
}

/// Echo the principal attached by the bearer-token middleware.
pub async fn principal(
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> Json<PrincipalResponse> {
    Json(PrincipalResponse {
        token: principal.token,
        scopes: principal.scopes,
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}
