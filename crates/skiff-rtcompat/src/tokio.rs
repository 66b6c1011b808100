//! Implementation of the runtime traits, backed by tokio.

use crate::traits::{SleepProvider, SpawnBlocking, TcpProvider};

use async_trait::async_trait;
use std::io::Result as IoResult;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_crate as tokio;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

/// A [`crate::Runtime`] backed by a private tokio executor.
///
/// Cloning is cheap; all clones share one executor.
#[derive(Clone)]
pub struct TokioRuntime {
    /// The shared tokio executor.
    rt: Arc<tokio::runtime::Runtime>,
}

/// Create a new tokio-backed [`TokioRuntime`].
pub fn create_runtime() -> IoResult<TokioRuntime> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(TokioRuntime { rt: Arc::new(rt) })
}

impl SleepProvider for TokioRuntime {
    type SleepFuture = tokio::time::Sleep;
    fn sleep(&self, duration: Duration) -> Self::SleepFuture {
        // The Sleep must be constructed where tokio's timer is
        // reachable, even if it is polled from somewhere else.
        let _guard = self.rt.enter();
        tokio::time::sleep(duration)
    }
}

impl SpawnBlocking for TokioRuntime {
    fn block_on<F: futures::Future>(&self, f: F) -> F::Output {
        self.rt.block_on(f)
    }
}

#[async_trait]
impl TcpProvider for TokioRuntime {
    type TcpStream = Compat<tokio::net::TcpStream>;

    async fn connect(&self, addr: &SocketAddr) -> IoResult<Self::TcpStream> {
        let stream = tokio::net::TcpStream::connect(addr).await?;
        // Handshake frames are tiny and interactive; don't let Nagle
        // batch them.
        stream.set_nodelay(true)?;
        Ok(stream.compat())
    }
}
