//! Encoding and decoding for SOCKS5 UDP relay frames.
//!
//! Once a UDP_ASSOCIATE handshake has succeeded, each datagram
//! exchanged with the relay is wrapped in a small header: two
//! reserved zero bytes, a fragment number, and the remote address in
//! the same form the command request uses.

use crate::msg::{SocksAddr, TargetAddr};
use crate::{Error, Result};

use skiff_bytes::{Reader, Writer};

/// A datagram as carried through a SOCKS5 UDP relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UdpFrame {
    /// Fragment number.  Zero for a standalone datagram.
    frag: u8,
    /// The remote source or destination of the datagram.
    target: TargetAddr,
    /// The datagram payload.
    data: Vec<u8>,
}

impl UdpFrame {
    /// Construct a new UdpFrame.
    pub fn new(frag: u8, target: TargetAddr, data: impl Into<Vec<u8>>) -> Self {
        UdpFrame {
            frag,
            target,
            data: data.into(),
        }
    }

    /// Return the fragment number of this frame.
    pub fn frag(&self) -> u8 {
        self.frag
    }

    /// Return the remote address of this frame.
    pub fn target(&self) -> &TargetAddr {
        &self.target
    }

    /// Return the payload of this frame.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encode this frame into the form the relay expects.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Vec::with_capacity(self.data.len() + 22);
        w.write_u16(0); // reserved
        w.write_u8(self.frag);
        w.write(self.target.host());
        w.write_u16(self.target.port());
        w.write(&self.data[..]);
        w
    }

    /// Decode a frame received from the relay.  Exact inverse of
    /// [`UdpFrame::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let parsed = (|| -> skiff_bytes::Result<UdpFrame> {
            let mut r = Reader::from_slice(bytes);
            let reserved = r.take_u16()?;
            if reserved != 0 {
                return Err(skiff_bytes::Error::BadMessage(
                    "nonzero reserved bytes in UDP frame",
                ));
            }
            let frag = r.take_u8()?;
            let addr: SocksAddr = r.extract()?;
            let port = r.take_u16()?;
            let data = r.into_rest().to_vec();
            Ok(UdpFrame {
                frag,
                target: TargetAddr::from_parts(addr, port),
                data,
            })
        })();
        // A datagram is either whole or malformed; there is no
        // waiting for more bytes here.
        parsed.map_err(|_| Error::Syntax)
    }
}
