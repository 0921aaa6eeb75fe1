//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::admission::{Graylist, StrategyRegistry, TokenSet};
use crate::config::Config;

/// Application state shared across all request handlers.
///
/// All fields are `Arc`-wrapped so that Axum can clone the state for each
/// request without copying configuration data.
#[derive(Clone)]
pub struct AppState {
    /// Read-only configuration built once at startup.
    pub config: Arc<Config>,
    /// Bearer-token allow-list derived from the configuration.
    pub tokens: Arc<TokenSet>,
    /// IP allow-list derived from the configuration.
    pub graylist: Arc<Graylist>,
    /// Auth strategies registered during startup.
    pub strategies: Arc<StrategyRegistry>,
}

impl AppState {
    /// Create a new [`AppState`] from startup-derived components.
    pub fn new(config: Config, graylist: Graylist, strategies: StrategyRegistry) -> Self {
        let tokens = TokenSet::from_list(config.token_list.as_deref());
        Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            graylist: Arc::new(graylist),
            strategies: Arc::new(strategies),
        }
    }
}

impl Default for AppState {
    /// Creates a default [`AppState`] with admission disabled, suitable for tests.
    fn default() -> Self {
        Self::new(
            Config::default(),
            Graylist::default(),
            StrategyRegistry::default(),
        )
    }
}
