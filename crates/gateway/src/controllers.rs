//! Route table construction.
//!
//! Routes are supplied by a [`RouteProvider`]; the gateway awaits the
//! provider during startup and attaches whatever it returns. The default
//! [`Controllers`] provider mounts the principal-echo endpoints, each
//! guarded by one of the registered auth strategies.

use std::future::Future;

use anyhow::Result;
use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::admission::Strategy;
use crate::server::{
    handlers,
    middleware::{authenticate, AuthState},
    state::AppState,
};

/// Supplies the route table consumed by the HTTP server at startup.
pub trait RouteProvider {
    /// Asynchronously produce the route table for `state`.
    fn routes(&self, state: &AppState) -> impl Future<Output = Result<Router<AppState>>> + Send;
}

/// Default controller set.
pub struct Controllers;

impl RouteProvider for Controllers {
    async fn routes(&self, state: &AppState) -> Result<Router<AppState>> {
        let simple = AuthState {
            app: state.clone(),
            strategy: Strategy::Simple,
        };
        let mut router = Router::new().route(
            "/v1/principal",
            get(handlers::principal).layer(from_fn_with_state(simple, authenticate)),
        );

        // The privileged route is only mounted when login strategies were
        // registered, which never happens in production.
        if state.strategies.is_registered(Strategy::Session) {
            let session = AuthState {
                app: state.clone(),
                strategy: Strategy::Session,
            };
            router = router.route(
                "/v1/session/principal",
                get(handlers::principal).layer(from_fn_with_state(session, authenticate)),
            );
        }

        Ok(router)
    }
}
