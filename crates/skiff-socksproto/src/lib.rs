//! Implements the client side of SOCKS, in the flavors spoken by
//! commodity proxies.
//!
//! SOCKS is an old and somewhat janky protocol for asking a TCP proxy
//! to connect somewhere on your behalf.  Versions 4, 4a, and 5 are
//! all still encountered in the wild, so this crate speaks all three.
//!
//! This crate tries to hide the actual details of the protocol, and
//! expose a stateful handshake type that you feed bytes from the
//! proxy as they arrive, in fragments of any size, until it reports
//! an established tunnel or a specific error.  It performs no I/O of
//! its own: the `skiff-client` crate drives it over a real socket.
//!
//! For more information about SOCKS:
//!
//!   * SOCKS5 (which is preferred) is specified in
//!     [RFC 1928](https://tools.ietf.org/html/rfc1928), and see also
//!     [RFC 1929](https://tools.ietf.org/html/rfc1929) for
//!     Username/Password authentication in SOCKS5.
//!   * [The wikipedia article](https://en.wikipedia.org/wiki/SOCKS)
//!     is the best surviving documentation for SOCKS4 and SOCKS4a.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]

mod err;
mod handshake;
mod msg;
mod udp;

pub use err::Error;
pub use handshake::{Action, SocksClientHandshake, SocksReply};
pub use msg::{
    Socks4Status, SocksAddr, SocksAuth, SocksCmd, SocksHostname, SocksStatus, SocksVersion,
    TargetAddr,
};
pub use udp::UdpFrame;

/// A Result type for the skiff_socksproto crate.
pub type Result<T> = std::result::Result<T, Error>;
