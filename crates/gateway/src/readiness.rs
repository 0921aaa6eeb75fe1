//! Parent-process readiness signalling.
//!
//! When a supervising process passes a unix datagram socket path, the
//! gateway sends `started` to it once the listener is bound. Failures are
//! reported to the caller, which logs them without aborting startup.

use std::os::unix::net::UnixDatagram;

use anyhow::{Context, Result};

/// Message sent once the listener is bound.
pub const READY_MESSAGE: &[u8] = b"started";

/// Send the readiness message if a socket path is configured.
///
/// Returns `true` when a message was sent.
///
/// # Errors
///
/// Returns an error when the socket cannot be created or the message cannot
/// be delivered to `socket`.
pub fn notify(socket: Option<&str>) -> Result<bool> {
    let Some(path) = socket else {
        return Ok(false);
    };
    let sock = UnixDatagram::unbound().context("failed to create readiness socket")?;
    sock.send_to(READY_MESSAGE, path)
        .with_context(|| format!("failed to signal readiness to {path}"))?;
    Ok(true)
}
