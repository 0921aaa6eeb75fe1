//! Configuration loading and validation for the gateway service.
//!
//! All values are read from environment variables once at startup and shared
//! as a read-only struct. The process exits with a clear error message if any
//! value cannot be parsed.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment mode, read from `NODE_ENV`.
///
/// Anything other than `production` or `development` maps to [`Mode::Other`],
/// which is also the default when the variable is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Mode {
    Production,
    Development,
    Other,
}

impl From<String> for Mode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "production" => Mode::Production,
            "development" => Mode::Development,
            _ => Mode::Other,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Other
    }
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Production => "production",
            Mode::Development => "development",
            Mode::Other => "other",
        }
    }
}

/// Validated gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the gateway listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment mode (`NODE_ENV`).
    #[serde(default)]
    pub node_env: Mode,

    /// Comma-separated IP allow-list entries: bare IPv4 addresses and CIDR
    /// blocks (`IP_GRAYLIST`). Absent ⇒ IP filtering disabled.
    #[serde(default)]
    pub ip_graylist: Option<String>,

    /// Comma-separated bearer tokens accepted by the admission gate
    /// (`TOKEN_LIST`). Absent ⇒ every presented token is accepted.
    #[serde(default)]
    pub token_list: Option<String>,

    /// Register the privileged login strategies (`LOGIN`). Forbidden in
    /// production mode.
    #[serde(default)]
    pub login: bool,

    /// Honor `X-Forwarded-For` from a fronting proxy (`TRUST_PROXY`).
    #[serde(default = "default_trust_proxy")]
    pub trust_proxy: bool,

    /// Comma-separated resolver IPs merged into the normalized resolver list
    /// (`DNS_RESOLVERS`).
    #[serde(default)]
    pub dns_resolvers: Option<String>,

    /// Unix datagram socket path used to signal readiness to a parent
    /// process (`READY_SOCKET`).
    #[serde(default)]
    pub ready_socket: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    3000
}
fn default_trust_proxy() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let mut c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.normalize();
        c.validate()?;
        Ok(c)
    }

    /// Empty-string list variables count as unset.
    fn normalize(&mut self) {
        for field in [
            &mut self.ip_graylist,
            &mut self.token_list,
            &mut self.dns_resolvers,
            &mut self.ready_socket,
        ] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be non-zero");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            node_env: Mode::default(),
            ip_graylist: None,
            token_list: None,
            login: false,
            trust_proxy: default_trust_proxy(),
            dns_resolvers: None,
            ready_socket: None,
            log_level: default_log_level(),
        }
    }
}
