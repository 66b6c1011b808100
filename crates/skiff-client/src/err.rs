//! Declare error types for skiff-client

use thiserror::Error;

/// An error returned while establishing a tunnel through a proxy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller-supplied options were rejected before any I/O
    /// began.
    #[error("invalid tunnel configuration: {0}")]
    Configuration(#[from] crate::config::ConfigError),

    /// The SOCKS handshake with the proxy failed.
    #[error("SOCKS handshake failed: {0}")]
    Handshake(#[from] skiff_socksproto::Error),

    /// The handshake did not complete within its deadline.
    #[error("proxy handshake timed out")]
    HandshakeTimeout,

    /// The proxy closed the connection in the middle of the
    /// handshake.
    #[error("proxy closed the connection during the handshake")]
    ProxyClosed,

    /// An I/O error on the transport, outside the protocol's control.
    #[error("I/O error while talking to the proxy: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error of some kind that should never occur.
    #[error("internal error: {0}")]
    Internal(&'static str),
}
