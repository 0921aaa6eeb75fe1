//! `gateway` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON tracing).
//! 3. Build the IP graylist from configuration.
//! 4. Register auth strategies; privileged login is forbidden in production.
//! 5. Resolve the route table from the route provider.
//! 6. Build the Axum router and bind the listener.
//! 7. Post-bind: normalize the DNS resolver list, signal readiness, serve.

mod admission;
mod config;
mod controllers;
mod dns;
mod readiness;
mod server;
mod telemetry;

use std::net::SocketAddr;

use anyhow::Result;
use tracing::{info, warn};

use admission::{Graylist, Strategy, StrategyRegistry};
use config::Config;
use controllers::{Controllers, RouteProvider};
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        mode = cfg.node_env.as_str(),
        "gateway starting"
    );

    // -----------------------------------------------------------------------
    // 3. IP graylist
    // -----------------------------------------------------------------------
    let graylist = Graylist::from_list(cfg.ip_graylist.as_deref())?;
    if graylist.enabled() {
        info!(
            addresses = graylist.authorized_addrs().len(),
            blocks = graylist.authorized_blocks().len(),
            "IP graylist enabled"
        );
    }

    // -----------------------------------------------------------------------
    // 4. Auth strategies
    // -----------------------------------------------------------------------
    let mut strategies = StrategyRegistry::new();
    if cfg.login {
        strategies.register_login(cfg.node_env)?;
        info!("privileged login strategies registered");
    }
    strategies.register(Strategy::Simple);

    // -----------------------------------------------------------------------
    // 5. Routes
    // -----------------------------------------------------------------------
    let state = AppState::new(cfg.clone(), graylist, strategies);
    let api = Controllers.routes(&state).await?;

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(state, api);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening");

    // -----------------------------------------------------------------------
    // 7. Post-bind
    // -----------------------------------------------------------------------
    let configured = match cfg.dns_resolvers.as_deref() {
        Some(raw) => dns::parse_resolver_list(raw)?,
        None => Vec::new(),
    };
    let resolvers = dns::normalize(&configured);
    info!(resolvers = ?resolvers, "DNS resolver list normalized");

    match readiness::notify(cfg.ready_socket.as_deref()) {
        Ok(true) => info!("readiness signalled to parent process"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "failed to signal readiness"),
    }

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
