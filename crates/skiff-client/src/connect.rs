//! Establish a tunnel through a single SOCKS proxy.

use crate::config::{HandshakeOptions, ProxyServer};
use crate::tunnel::Tunnel;
use crate::{Error, Result};

use skiff_rtcompat::{Runtime, SleepProviderExt};
use skiff_socksproto::{Action, SocksAddr, SocksClientHandshake, TargetAddr};

use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use tracing::{debug, trace};

/// Read size while pumping a handshake.  Replies are tiny; this is
/// generous so that early application bytes ride along too.
const HANDSHAKE_BUF_LEN: usize = 1024;

/// The outcome of a successful [`establish`] or [`establish_on`].
#[allow(clippy::exhaustive_enums)]
#[derive(Debug)]
pub enum Established<S> {
    /// The tunnel is ready for application traffic.  (CONNECT and
    /// UDP_ASSOCIATE land here directly.)
    Ready(Tunnel<S>),
    /// A BIND handshake has completed its first phase: the proxy is
    /// listening on our behalf.  Tell the remote peer where to
    /// connect, then call [`PendingBind::accept`].
    Bound(PendingBind<S>),
}

/// A BIND handshake waiting for its second phase.
///
/// The proxy has reported the address it is listening on; the tunnel
/// materializes once a peer actually connects there.  There is no
/// timer on this wait: how long to give the peer is the caller's
/// decision, not ours.
#[derive(Debug)]
pub struct PendingBind<S> {
    /// The protocol machine, parked in its bound state.
    hs: SocksClientHandshake,
    /// The socket to the proxy.
    stream: S,
    /// Where the proxy is listening.
    local: TargetAddr,
}

impl<S> PendingBind<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Return the address the proxy is listening on for the inbound
    /// peer.
    pub fn bound_addr(&self) -> &TargetAddr {
        &self.local
    }

    /// Wait for the proxy to report an inbound connection, completing
    /// the tunnel.
    pub async fn accept(self) -> Result<Tunnel<S>> {
        let PendingBind {
            mut hs,
            mut stream,
            local,
        } = self;
        loop {
            let action = read_and_feed(&mut stream, &mut hs).await?;
            if !action.reply.is_empty() {
                stream.write_all(&action.reply).await?;
                stream.flush().await?;
            }
            if action.finished {
                let reply = hs
                    .into_reply()
                    .ok_or(Error::Internal("finished handshake had no reply"))?;
                let (peer, leftover) = reply.into_parts();
                debug!("bind at {} completed; peer is {:?}", local, peer);
                return Ok(Tunnel::new(stream, leftover, peer));
            }
        }
    }
}

/// Establish a tunnel via the proxy in `options`, dialing a fresh TCP
/// connection through `runtime`.
///
/// The options' timeout covers everything up to the first terminal
/// outcome: dialing, the handshake, and for BIND the first of its two
/// replies.
pub async fn establish<R: Runtime>(
    runtime: &R,
    options: &HandshakeOptions,
) -> Result<Established<R::TcpStream>> {
    let addr = proxy_sock_addr(options.proxy())?;
    debug!(
        "opening {} handshake with proxy at {}",
        options.proxy().version(),
        addr
    );
    let fut = async {
        let stream = runtime.connect(&addr).await?;
        establish_on(stream, options).await
    };
    runtime
        .timeout(options.timeout(), fut)
        .await
        .map_err(|_| Error::HandshakeTimeout)?
}

/// Establish a tunnel over a socket the caller already owns.
///
/// Use this to run the handshake over a pre-connected or
/// security-wrapped stream, or to add a hop to an existing tunnel.
/// No timer is armed here: the caller owns the socket's lifetime and
/// its deadlines.
pub async fn establish_on<S>(stream: S, options: &HandshakeOptions) -> Result<Established<S>>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    establish_with_leftover(stream, Vec::new(), options).await
}

/// As [`establish_on`], but first replaying bytes that have already
/// been read off the socket (the previous hop's tunnel handoff).
pub(crate) async fn establish_with_leftover<S>(
    mut stream: S,
    initial: Vec<u8>,
    options: &HandshakeOptions,
) -> Result<Established<S>>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let mut hs = options.make_handshake()?;
    let mut action = hs.handshake(&initial)?;
    loop {
        if !action.reply.is_empty() {
            stream.write_all(&action.reply).await?;
            stream.flush().await?;
        }
        if action.finished {
            let reply = hs
                .into_reply()
                .ok_or(Error::Internal("finished handshake had no reply"))?;
            let (peer, leftover) = reply.into_parts();
            let peer = peer.map(|p| rewrite_unspecified(p, options));
            trace!(
                "established tunnel to {} via {}",
                options.target(),
                options.proxy().host()
            );
            return Ok(Established::Ready(Tunnel::new(stream, leftover, peer)));
        }
        if let Some(local) = action.bound {
            let local = rewrite_unspecified(local, options);
            debug!("proxy is listening at {} on our behalf", local);
            return Ok(Established::Bound(PendingBind { hs, stream, local }));
        }
        action = read_and_feed(&mut stream, &mut hs).await?;
    }
}

/// Read more bytes from the proxy and feed them to the protocol
/// machine.
async fn read_and_feed<S>(stream: &mut S, hs: &mut SocksClientHandshake) -> Result<Action>
where
    S: AsyncRead + Send + Unpin,
{
    let mut buf = [0_u8; HANDSHAKE_BUF_LEN];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Err(Error::ProxyClosed);
    }
    Ok(hs.handshake(&buf[..n])?)
}

/// Figure out which socket address to dial for `proxy`.
///
/// An IP literal is used as given; anything else goes through the
/// system resolver.  (Resolving tunnel *targets* is the proxy's job;
/// resolving the proxy itself is ours.)
pub(crate) fn proxy_sock_addr(proxy: &ProxyServer) -> Result<SocketAddr> {
    if let Ok(ip) = proxy.host().parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, proxy.port()));
    }
    (proxy.host(), proxy.port())
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "proxy hostname did not resolve to any address",
            )
            .into()
        })
}

/// Compatibility shim: some NAT'd proxies report an all-zero bound
/// address; substitute the proxy's own host, keeping the reported
/// port.
fn rewrite_unspecified(addr: TargetAddr, options: &HandshakeOptions) -> TargetAddr {
    let unspecified = matches!(addr.host(), SocksAddr::Ip(ip) if ip.is_unspecified());
    if unspecified {
        TargetAddr::new(options.proxy().host(), addr.port()).unwrap_or(addr)
    } else {
        addr
    }
}
