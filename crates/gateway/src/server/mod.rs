//! Axum HTTP server: routing, handlers, admission middleware, state.
//!
//! # Responsibilities
//! - Build the Axum router from provider routes and shared middleware.
//! - Enforce the request admission policy before handlers run.
//! - Post-process outgoing responses (error enrichment, cache headers).

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
