//! Axum router construction.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Mode;

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`]: the provider's routes plus the public
/// health endpoint, admission middleware, the response hook, and the shared
/// tower-http layers. HTTPS enforcement is attached only in production.
pub fn build(state: AppState, api: Router<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), middleware::ip_filter))
        .layer(from_fn_with_state(state.clone(), middleware::postprocess));

    if state.config.node_env == Mode::Production {
        app = app.layer(from_fn(middleware::enforce_https));
    }

    app.layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
