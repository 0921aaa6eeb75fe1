//! Request admission policy: bearer-token validation and IP allow-listing.
//!
//! # Responsibilities
//! - Parse the configured token allow-list and validate presented tokens.
//! - Parse the configured IP graylist into exact addresses and CIDR blocks.
//! - Track which auth strategies were registered at startup.

pub mod graylist;
pub mod token;

pub use graylist::Graylist;
pub use token::{AuthenticatedPrincipal, Strategy, StrategyRegistry, TokenSet};
