//! IP allow-list ("graylist") construction and membership tests.
//!
//! Entries come from a comma-separated list. An entry with no `/` and exactly
//! four dot-separated components is an exact IPv4 address; anything else must
//! parse as an IPv4 CIDR block. Classification happens once at startup and
//! never changes at runtime.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use ipnet::Ipv4Net;
use thiserror::Error;

/// Errors produced while parsing graylist entries.
#[derive(Debug, Error)]
pub enum GraylistError {
    /// An entry classified as an exact address failed to parse.
    #[error("invalid graylist address {entry:?}: {source}")]
    InvalidAddress {
        entry: String,
        source: std::net::AddrParseError,
    },

    /// An entry classified as a CIDR block failed to parse.
    #[error("invalid graylist block {entry:?}: {source}")]
    InvalidBlock {
        entry: String,
        source: ipnet::AddrParseError,
    },
}

/// Allow-list of exact addresses and CIDR blocks, built once at startup.
///
/// Despite the name this is an allow construct: when no entries are
/// configured the component is disabled and every address is permitted.
#[derive(Debug, Clone, Default)]
pub struct Graylist {
    authorized_addrs: HashSet<Ipv4Addr>,
    authorized_blocks: Vec<Ipv4Net>,
    enabled: bool,
}

impl Graylist {
    /// Parse the raw `IP_GRAYLIST` value. Empty or absent ⇒ disabled.
    ///
    /// # Errors
    ///
    /// Returns an error on the first entry that fails to parse; the caller
    /// must treat this as fatal during startup.
    pub fn from_list(raw: Option<&str>) -> Result<Self, GraylistError> {
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };

        let mut authorized_addrs = HashSet::new();
        let mut authorized_blocks = Vec::new();

        for entry in raw.split(',') {
            if !entry.contains('/') && entry.split('.').count() == 4 {
                let addr = entry.parse().map_err(|source| GraylistError::InvalidAddress {
                    entry: entry.to_owned(),
                    source,
                })?;
                authorized_addrs.insert(addr);
            } else {
                let block = entry.parse().map_err(|source| GraylistError::InvalidBlock {
                    entry: entry.to_owned(),
                    source,
                })?;
                authorized_blocks.push(block);
            }
        }

        Ok(Self {
            authorized_addrs,
            authorized_blocks,
            enabled: true,
        })
    }

    /// `true` when an allow-list is configured.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Exact addresses admitted by the list.
    pub fn authorized_addrs(&self) -> &HashSet<Ipv4Addr> {
        &self.authorized_addrs
    }

    /// CIDR blocks admitted by the list.
    pub fn authorized_blocks(&self) -> &[Ipv4Net] {
        &self.authorized_blocks
    }

    /// Total number of configured entries.
    pub fn len(&self) -> usize {
        self.authorized_addrs.len() + self.authorized_blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Permit when disabled, or when `ip` matches an exact address or a block.
    ///
    /// IPv6 peers are only matched through their IPv4-mapped form.
    pub fn permits(&self, ip: IpAddr) -> bool {
        if !self.enabled {
            return true;
        }
        let v4 = match ip {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => v4,
                None => return false,
            },
        };
        self.authorized_addrs.contains(&v4)
            || self.authorized_blocks.iter().any(|block| block.contains(&v4))
    }
}
