//! Declarations for the traits that a runtime backend must implement.

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite, Future};
use std::io::Result as IoResult;
use std::net::SocketAddr;
use std::time::Duration;

/// A runtime that we can use to run a SOCKS client.
pub trait Runtime:
    Send + Sync + Clone + SpawnBlocking + SleepProvider + TcpProvider + 'static
{
}

impl<T> Runtime for T where
    T: Send + Sync + Clone + SpawnBlocking + SleepProvider + TcpProvider + 'static
{
}

/// Trait for a runtime that can wait until a timer elapses.
pub trait SleepProvider {
    /// A future returned by [`SleepProvider::sleep`].
    type SleepFuture: Future<Output = ()> + Send + 'static;
    /// Return a future that will be ready once `duration` has passed.
    fn sleep(&self, duration: Duration) -> Self::SleepFuture;
}

/// Trait for a runtime that can block the current thread on a future.
pub trait SpawnBlocking {
    /// Run `f` until it is ready, and return its output.
    fn block_on<F: Future>(&self, f: F) -> F::Output;
}

/// Trait for a runtime that can open outbound TCP connections.
#[async_trait]
pub trait TcpProvider {
    /// The type of TCP connection returned by this provider.
    type TcpStream: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static;

    /// Try to open a TCP connection to `addr`, trying exactly once,
    /// not timing out.
    async fn connect(&self, addr: &SocketAddr) -> IoResult<Self::TcpStream>;
}
