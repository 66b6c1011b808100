//! Establish a tunnel through an ordered chain of SOCKS proxies.
//!
//! Only the first proxy is dialed directly.  Each hop's handshake
//! asks its proxy to CONNECT to the next hop, so the same transport
//! socket carries every handshake in turn, each one running inside
//! the tunnel built by the hops before it.

use crate::config::{ChainOptions, HandshakeOptions, ProxyServer};
use crate::connect::{establish_with_leftover, proxy_sock_addr, Established};
use crate::tunnel::Tunnel;
use crate::{Error, Result};

use skiff_rtcompat::{Runtime, SleepProviderExt};
use skiff_socksproto::TargetAddr;

use futures::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Establish a tunnel through every proxy in `options`, dialing the
/// first one through `runtime`.
///
/// Each hop gets the options' timeout to itself; the first failure
/// aborts the remaining hops and is surfaced unchanged.
pub async fn establish_chain<R: Runtime>(
    runtime: &R,
    options: &ChainOptions,
) -> Result<Tunnel<R::TcpStream>> {
    let hops = plan(options);
    let addr = proxy_sock_addr(&hops[0])?;
    let stream = runtime
        .timeout(options.timeout(), runtime.connect(&addr))
        .await
        .map_err(|_| Error::HandshakeTimeout)??;

    let mut stream = stream;
    let mut leftover = Vec::new();
    let mut peer = None;
    for (i, hop) in hops.iter().enumerate() {
        let hop_options = options_for_hop(&hops, i, hop, options)?;
        let established = runtime
            .timeout(
                options.timeout(),
                establish_with_leftover(stream, leftover, &hop_options),
            )
            .await
            .map_err(|_| Error::HandshakeTimeout)??;
        let parts = dismantle(established)?;
        stream = parts.0;
        leftover = parts.1;
        peer = parts.2;
    }
    Ok(Tunnel::new(stream, leftover, peer))
}

/// As [`establish_chain`], but over a socket the caller already
/// connected to the first proxy.  No timers are armed here.
pub async fn establish_chain_on<S>(stream: S, options: &ChainOptions) -> Result<Tunnel<S>>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let hops = plan(options);
    let mut stream = stream;
    let mut leftover = Vec::new();
    let mut peer = None;
    for (i, hop) in hops.iter().enumerate() {
        let hop_options = options_for_hop(&hops, i, hop, options)?;
        let established = establish_with_leftover(stream, leftover, &hop_options).await?;
        let parts = dismantle(established)?;
        stream = parts.0;
        leftover = parts.1;
        peer = parts.2;
    }
    Ok(Tunnel::new(stream, leftover, peer))
}

/// Settle the hop order for one run.
fn plan(options: &ChainOptions) -> Vec<ProxyServer> {
    let mut hops = options.proxies().to_vec();
    if options.randomize_order() {
        use rand::seq::SliceRandom;
        let mut rng = rand::thread_rng();
        hops[..].shuffle(&mut rng);
    }
    hops
}

/// Build the single-hop options for hop `i`: its destination is the
/// next hop's address, or the chain's final target for the last hop.
fn options_for_hop(
    hops: &[ProxyServer],
    i: usize,
    hop: &ProxyServer,
    options: &ChainOptions,
) -> Result<HandshakeOptions> {
    let destination = match hops.get(i + 1) {
        Some(next) => next.target_addr()?,
        None => options.target().clone(),
    };
    debug!(
        "chain hop {}/{}: asking {} to reach {}",
        i + 1,
        hops.len(),
        hop.host(),
        destination
    );
    Ok(HandshakeOptions::new(hop.clone(), destination)?.with_timeout(options.timeout()))
}

/// Take an established hop apart so the next hop can reuse its
/// socket.
#[allow(clippy::type_complexity)]
fn dismantle<S>(established: Established<S>) -> Result<(S, Vec<u8>, Option<TargetAddr>)> {
    match established {
        Established::Ready(tunnel) => {
            let peer = tunnel.peer_addr().cloned();
            let (stream, leftover) = tunnel.into_parts();
            Ok((stream, leftover, peer))
        }
        // Chains are validated to CONNECT only.
        Established::Bound(_) => Err(Error::Internal("chain hop produced a BIND")),
    }
}
