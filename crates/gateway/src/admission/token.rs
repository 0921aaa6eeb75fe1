//! Bearer-token allow-list validation and auth strategy registration.

use anyhow::Result;

use crate::config::Mode;

/// Scopes attached to principals authenticated by a privileged strategy.
pub const LOGIN_SCOPES: [&str; 3] = ["devops", "ledger", "QA"];

/// Optional allow-list of accepted bearer tokens.
///
/// Absent ⇒ every presented token is accepted. Membership is an exact,
/// order-independent string match.
#[derive(Debug, Clone, Default)]
pub struct TokenSet(Option<Vec<String>>);

impl TokenSet {
    /// Build from the raw `TOKEN_LIST` value. Empty or absent ⇒ unrestricted.
    pub fn from_list(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if !s.is_empty() => {
                TokenSet(Some(s.split(',').map(str::to_owned).collect()))
            }
            _ => TokenSet(None),
        }
    }

    /// `true` when an allow-list is configured.
    pub fn is_restricted(&self) -> bool {
        self.0.is_some()
    }

    /// Accept iff no list is configured or `token` is a member.
    pub fn accepts(&self, token: &str) -> bool {
        match &self.0 {
            None => true,
            Some(list) => list.iter().any(|t| t == token),
        }
    }
}

/// Credential attached to the request after a successful token check.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    /// The raw bearer token the caller presented.
    pub token: String,
    /// Scopes granted by the strategy that performed the check.
    pub scopes: Vec<String>,
}

/// Named auth strategies exposed by the gateway.
///
/// `session` and `github` are privileged: they attach the fixed
/// [`LOGIN_SCOPES`] on success and may only be registered outside production.
/// `simple` is always available and attaches no scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Session,
    Github,
    Simple,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Session => "session",
            Strategy::Github => "github",
            Strategy::Simple => "simple",
        }
    }

    pub fn is_privileged(&self) -> bool {
        !matches!(self, Strategy::Simple)
    }

    /// Scopes granted to principals authenticated by this strategy.
    pub fn scopes(&self) -> Vec<String> {
        if self.is_privileged() {
            LOGIN_SCOPES.iter().map(|s| (*s).to_owned()).collect()
        } else {
            Vec::new()
        }
    }
}

/// Records which strategies were registered during startup.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    registered: Vec<Strategy>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single strategy. Re-registration is a no-op.
    pub fn register(&mut self, strategy: Strategy) {
        if !self.is_registered(strategy) {
            self.registered.push(strategy);
        }
    }

    /// Register the privileged `session` and `github` strategies.
    ///
    /// # Errors
    ///
    /// Fails when the gateway runs in production mode; the caller must treat
    /// this as fatal before the server reaches a listening state.
    pub fn register_login(&mut self, mode: Mode) -> Result<()> {
        if mode == Mode::Production {
            anyhow::bail!("login authentication is not enabled in production mode");
        }
        self.register(Strategy::Session);
        self.register(Strategy::Github);
        Ok(())
    }

    pub fn is_registered(&self, strategy: Strategy) -> bool {
        self.registered.contains(&strategy)
    }
}
