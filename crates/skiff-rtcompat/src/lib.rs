//! Compatibility between skiff and its async runtime.
//!
//! We isolate the runtime dependencies of the other skiff crates in
//! a single place, so that they only rely on the minimal set of
//! features a SOCKS client actually needs: opening an outbound TCP
//! connection, sleeping for a timeout, and blocking on a future.
//! Right now there is a single backend, built on tokio; the traits
//! keep the rest of the code honest about what it uses, and keep the
//! door open for another backend.
//!
//! Compared to a general-purpose runtime wrapper, a lot is
//! deliberately missing here: no listeners (a SOCKS client never
//! accepts connections itself; BIND listens on the proxy's side), no
//! TLS (a caller that wants transport security hands us the finished
//! stream), and no task spawning (the client drives one handshake at
//! a time and joins futures instead).

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::await_holding_lock)]

mod timer;
mod traits;

pub mod tokio;

pub use timer::{SleepProviderExt, Timeout, TimeoutError};
pub use traits::{Runtime, SleepProvider, SpawnBlocking, TcpProvider};
