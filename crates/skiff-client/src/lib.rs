//! High-level client for tunneling TCP connections through SOCKS
//! proxies.
//!
//! # Overview
//!
//! This crate is the part of skiff that the surrounding application
//! talks to.  Given a description of a proxy (or an ordered chain of
//! proxies) and a destination, it dials the proxy, drives the SOCKS
//! handshake implemented in [`skiff_socksproto`], and hands back a
//! [`Tunnel`]: a live socket ready for the application protocol,
//! with any early application bytes preserved.
//!
//! All options are validated when they are constructed, before any
//! socket is opened.  Each handshake produces exactly one outcome: a
//! tunnel, or a typed error, after which the transport has been
//! dropped.
//!
//! # Example
//!
//! ```no_run
//! use skiff_client::{establish, Established, HandshakeOptions, ProxyServer};
//! use skiff_rtcompat::SpawnBlocking;
//! use skiff_socksproto::{SocksVersion, TargetAddr};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = skiff_rtcompat::tokio::create_runtime()?;
//! let proxy = ProxyServer::new("127.0.0.1", 1080, SocksVersion::V5)?;
//! let options = HandshakeOptions::new(proxy, TargetAddr::new("files.example.com", 22)?)?;
//!
//! let rt = runtime.clone();
//! runtime.block_on(async move {
//!     match establish(&rt, &options).await? {
//!         Established::Ready(tunnel) => {
//!             // Hand the tunnel to the SSH/SFTP layer.
//!             let (_socket, _early_bytes) = tunnel.into_parts();
//!         }
//!         Established::Bound(_) => unreachable!("CONNECT never binds"),
//!     }
//!     Ok::<_, skiff_client::Error>(())
//! })?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::await_holding_lock)]

mod chain;
mod config;
mod connect;
mod err;
mod tunnel;

#[cfg(test)]
mod testing;

pub use chain::{establish_chain, establish_chain_on};
pub use config::{ChainOptions, ConfigError, HandshakeOptions, ProxyServer};
pub use connect::{establish, establish_on, Established, PendingBind};
pub use err::Error;
pub use tunnel::Tunnel;

// The protocol-level types that appear in this crate's API.
pub use skiff_socksproto::{SocksCmd, SocksVersion, TargetAddr, UdpFrame};

/// A Result type for the skiff_client crate.
pub type Result<T> = std::result::Result<T, Error>;
