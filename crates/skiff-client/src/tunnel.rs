//! The type handed back to the application once a handshake is done.

use skiff_socksproto::TargetAddr;

use futures::io::{AsyncRead, AsyncWrite};
use std::io::Result as IoResult;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A socket whose SOCKS handshake has completed.
///
/// Reads and writes pass straight through to the underlying socket,
/// with one exception: any bytes that the proxy sent after the final
/// protocol frame (the application protocol starting early, e.g. an
/// SSH banner) were captured during the handshake, and are replayed
/// here ahead of anything newly read.  Nothing is lost in the
/// handoff window.
///
/// Callers that need the raw socket (to wrap it in TLS, hand it to an
/// SSH library, or run another chain hop) can dismantle the tunnel
/// with [`Tunnel::into_parts`].
#[derive(Debug)]
pub struct Tunnel<S> {
    /// The underlying socket.
    stream: S,
    /// Early application bytes, served before any fresh reads.
    leftover: Vec<u8>,
    /// How much of `leftover` has been served already.
    pos: usize,
    /// The address the proxy reported in its final reply, if any.
    peer: Option<TargetAddr>,
}

impl<S> Tunnel<S> {
    /// Wrap a socket whose handshake has just completed.
    pub(crate) fn new(stream: S, leftover: Vec<u8>, peer: Option<TargetAddr>) -> Self {
        Tunnel {
            stream,
            leftover,
            pos: 0,
            peer,
        }
    }

    /// Return the address the proxy reported in its final reply:
    /// the bound address for CONNECT, the connecting peer for BIND,
    /// or the relay endpoint for UDP_ASSOCIATE.
    pub fn peer_addr(&self) -> Option<&TargetAddr> {
        self.peer.as_ref()
    }

    /// Dismantle this tunnel into the raw socket and any replay bytes
    /// not yet served.
    ///
    /// Anyone adopting the socket must consume the returned bytes
    /// before reading from it, or the start of the application
    /// protocol will be lost.
    pub fn into_parts(self) -> (S, Vec<u8>) {
        let mut leftover = self.leftover;
        leftover.drain(..self.pos);
        (self.stream, leftover)
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Tunnel<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<IoResult<usize>> {
        let this = &mut *self;
        if this.pos < this.leftover.len() {
            let n = std::cmp::min(buf.len(), this.leftover.len() - this.pos);
            buf[..n].copy_from_slice(&this.leftover[this.pos..this.pos + n]);
            this.pos += n;
            return Poll::Ready(Ok(n));
        }
        Pin::new(&mut this.stream).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Tunnel<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<IoResult<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }
    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }
    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        Pin::new(&mut self.stream).poll_close(cx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::executor::block_on;
    use futures::io::{AsyncReadExt, AsyncWriteExt, Cursor};

    #[test]
    fn replay_before_fresh_reads() {
        let stream = Cursor::new(b" fresh bytes".to_vec());
        let mut tunnel = Tunnel::new(stream, b"replayed".to_vec(), None);

        block_on(async {
            let mut out = String::new();
            tunnel.read_to_string(&mut out).await.unwrap();
            assert_eq!(out, "replayed fresh bytes");
        });
    }

    #[test]
    fn replay_across_small_reads() {
        let stream = Cursor::new(b"XY".to_vec());
        let mut tunnel = Tunnel::new(stream, b"abcde".to_vec(), None);

        block_on(async {
            let mut buf = [0_u8; 2];
            let mut out = Vec::new();
            loop {
                let n = tunnel.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n]);
            }
            assert_eq!(out, b"abcdeXY");
        });
    }

    #[test]
    fn into_parts_returns_unserved_leftover() {
        let stream = Cursor::new(Vec::new());
        let mut tunnel = Tunnel::new(stream, b"abcdef".to_vec(), None);

        block_on(async {
            let mut buf = [0_u8; 4];
            tunnel.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"abcd");
        });

        let (_stream, rest) = tunnel.into_parts();
        assert_eq!(rest, b"ef");
    }

    #[test]
    fn writes_pass_through() {
        let stream = Cursor::new(Vec::new());
        let mut tunnel = Tunnel::new(stream, b"ignored".to_vec(), None);

        block_on(async {
            tunnel.write_all(b"hello").await.unwrap();
            tunnel.flush().await.unwrap();
        });

        let (stream, _) = tunnel.into_parts();
        assert_eq!(stream.into_inner(), b"hello");
    }
}
