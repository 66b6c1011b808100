//! Testing stubs for driving handshakes over an in-memory stream.
//! Only enabled with `cfg(test)`.

#![allow(clippy::missing_docs_in_private_items)]

use futures::io::{AsyncRead, AsyncWrite};
use std::collections::VecDeque;
use std::io::Result as IoResult;
use std::pin::Pin;
use std::task::{Context, Poll};

/// One step of a scripted conversation: once the client has written
/// `expect`, deliver each element of `responses` as a separate read.
#[derive(Debug)]
pub(crate) struct Exchange {
    pub(crate) expect: Vec<u8>,
    pub(crate) responses: Vec<Vec<u8>>,
}

/// An in-memory stream that plays the proxy's side of a handshake
/// from a fixed script.
///
/// Writes are matched, byte for byte, against the current exchange's
/// expectation; a mismatch panics with both byte strings, which is
/// the most useful failure mode in a test.  Responses can be split
/// into arbitrary chunks to exercise fragmented delivery.
#[derive(Debug)]
pub(crate) struct ScriptedStream {
    script: VecDeque<Exchange>,
    /// Bytes written by the client, not yet matched.
    written: Vec<u8>,
    /// Chunks queued up for the client to read.
    readable: VecDeque<Vec<u8>>,
    /// Everything the client ever wrote, for whole-session asserts.
    pub(crate) all_written: Vec<u8>,
}

impl ScriptedStream {
    pub(crate) fn new(script: Vec<Exchange>) -> Self {
        ScriptedStream {
            script: script.into(),
            written: Vec::new(),
            readable: VecDeque::new(),
            all_written: Vec::new(),
        }
    }

    /// Match freshly-written bytes against the current expectation,
    /// releasing its responses once it is fully satisfied.
    fn process_written(&mut self) {
        while let Some(front) = self.script.front() {
            if self.written.len() < front.expect.len() {
                // Whatever we have so far must be a prefix.
                assert_eq!(
                    &front.expect[..self.written.len()],
                    &self.written[..],
                    "client sent bytes that diverge from the script"
                );
                return;
            }
            let exchange = self.script.pop_front().expect("front() just succeeded");
            let rest = self.written.split_off(exchange.expect.len());
            assert_eq!(
                exchange.expect, self.written,
                "client sent bytes that diverge from the script"
            );
            self.written = rest;
            self.readable.extend(exchange.responses);
        }
        assert!(
            self.written.is_empty(),
            "client wrote past the end of the script: {:?}",
            self.written
        );
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<IoResult<usize>> {
        self.written.extend_from_slice(buf);
        self.all_written.extend_from_slice(buf);
        self.process_written();
        Poll::Ready(Ok(buf.len()))
    }
    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        Poll::Ready(Ok(()))
    }
    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<IoResult<usize>> {
        match self.readable.pop_front() {
            Some(mut chunk) => {
                if chunk.len() > buf.len() {
                    let rest = chunk.split_off(buf.len());
                    self.readable.push_front(rest);
                }
                buf[..chunk.len()].copy_from_slice(&chunk);
                Poll::Ready(Ok(chunk.len()))
            }
            // Script exhausted or awaiting a write: report EOF, the
            // same thing a proxy hanging up mid-handshake looks like.
            None => Poll::Ready(Ok(0)),
        }
    }
}
