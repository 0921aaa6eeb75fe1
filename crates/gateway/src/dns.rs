//! DNS resolver list normalization.
//!
//! The gateway does not resolve names itself; after startup it normalizes
//! the configured resolver list to a de-duplicated list that favours two
//! well-known public resolvers, and logs the result.

use std::net::{IpAddr, Ipv4Addr};

use anyhow::{Context, Result};

/// Public resolvers always placed at the front of the normalized list.
pub const PUBLIC_RESOLVERS: [IpAddr; 2] = [
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)),
];

/// Parse a comma-separated resolver list.
///
/// # Errors
///
/// Returns an error on the first entry that is not an IP address.
pub fn parse_resolver_list(raw: &str) -> Result<Vec<IpAddr>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .with_context(|| format!("invalid resolver address {s:?}"))
        })
        .collect()
}

/// Prepend the public resolvers and de-duplicate, preserving first occurrence.
pub fn normalize(configured: &[IpAddr]) -> Vec<IpAddr> {
    let mut resolvers = Vec::with_capacity(PUBLIC_RESOLVERS.len() + configured.len());
    for addr in PUBLIC_RESOLVERS.iter().chain(configured) {
        if !resolvers.contains(addr) {
            resolvers.push(*addr);
        }
    }
    resolvers
}
