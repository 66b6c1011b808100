//! Types to implement the client side of the SOCKS handshake.

use crate::msg::{Socks4Status, SocksAddr, SocksAuth, SocksCmd, SocksStatus, SocksVersion};
use crate::{Error, Result, TargetAddr};

use skiff_bytes::{ByteQueue, Reader, Writer};

use std::net::{IpAddr, Ipv4Addr};

/// Length of every SOCKS4 reply.
const SOCKS4_REPLY_LEN: usize = 8;
/// Bytes of a SOCKS5 command reply we must see before we can compute
/// its total length: version, status, reserved, address type, and
/// (for hostnames) the address length byte.
const SOCKS5_REPLY_HEADER_LEN: usize = 5;

/// Constant for "no authentication".
const NO_AUTHENTICATION: u8 = 0x00;
/// Constant for Username/Password-style authentication. (RFC 1929)
const USERNAME_PASSWORD: u8 = 0x02;

/// An ongoing SOCKS handshake with a proxy, seen from the client side.
///
/// To perform a handshake, call [SocksClientHandshake::handshake]
/// repeatedly: first with empty input, to obtain the opening message
/// for the proxy, and then with bytes read from the proxy as they
/// arrive.  Each call returns an [Action] saying what to send and
/// whether the handshake is over.  Input may be fragmented
/// arbitrarily: bytes are buffered internally, and no reply is parsed
/// before the whole of it has arrived.
#[derive(Clone, Debug)]
pub struct SocksClientHandshake {
    /// Which version of SOCKS to speak.
    ///
    /// Decided once, here: the per-reply handlers dispatch on this
    /// field rather than re-deciding anything.
    version: SocksVersion,
    /// The command to request from the proxy.
    cmd: SocksCmd,
    /// The address we are asking the proxy to connect, bind, or relay
    /// to.
    target: TargetAddr,
    /// Authentication material to present if the proxy asks for it.
    auth: SocksAuth,
    /// Current state of the handshake.  Each completed reply advances
    /// the state.
    state: State,
    /// Bytes received from the proxy but not yet parsed.
    buf: ByteQueue,
    /// The minimum number of buffered bytes required before the next
    /// parse step may run.  We never parse with fewer.
    needed: usize,
    /// For BIND: the proxy's listening address, waiting to be
    /// reported to the caller exactly once.
    pending_bound: Option<TargetAddr>,
    /// Completed handshake result.
    reply: Option<SocksReply>,
}

/// Possible state for a SOCKS client handshake.
///
/// Each completed reply advances the state.
#[derive(Clone, Debug, Copy, PartialEq)]
enum State {
    /// Starting state: nothing has been sent yet.
    Initial,
    /// We've sent the SOCKS4 request, or the SOCKS5 greeting, and are
    /// waiting for the proxy's first reply.
    SentInitial,
    /// SOCKS5: we've sent username/password and are waiting for the
    /// verdict.
    SentAuth,
    /// We've sent the SOCKS5 command request and are waiting for its
    /// reply.
    SentCommand,
    /// BIND: the proxy is listening on our behalf, and we're waiting
    /// for it to report the inbound connection.
    BoundWait,
    /// Ending (successful) state: the tunnel is established.
    Done,
    /// Ending (failed) state.  Absorbing: once here, no further input
    /// is accepted and no further outcome is produced.
    Failed,
}

/// An action to take in response to a step of a SOCKS client
/// handshake.
#[derive(Clone, Debug)]
#[allow(clippy::exhaustive_structs)]
pub struct Action {
    /// If nonempty, these bytes should be sent to the proxy.
    pub reply: Vec<u8>,
    /// For BIND: the proxy has started listening at this address, and
    /// the peer should be told to connect there.  Reported exactly
    /// once per handshake, before `finished` becomes true.
    pub bound: Option<TargetAddr>,
    /// If true, the handshake has succeeded and [`SocksClientHandshake::into_reply`]
    /// will return its product.
    pub finished: bool,
}

/// The successful product of a SOCKS client handshake.
#[derive(Clone, Debug)]
pub struct SocksReply {
    /// The address the proxy reported in its final reply: the bound
    /// address for CONNECT, the connecting peer for BIND, or the UDP
    /// relay endpoint for UDP_ASSOCIATE.
    peer: Option<TargetAddr>,
    /// Bytes that arrived after the final protocol frame.  These
    /// belong to the application protocol and must be replayed ahead
    /// of any further reads from the socket.
    leftover: Vec<u8>,
}

impl SocksClientHandshake {
    /// Construct a new SocksClientHandshake in its initial state.
    ///
    /// Returns an error if the requested combination of version,
    /// command, address, and authentication cannot be expressed on
    /// the wire.
    pub fn new(
        version: SocksVersion,
        cmd: SocksCmd,
        target: TargetAddr,
        auth: SocksAuth,
    ) -> Result<Self> {
        if !cmd.recognized() {
            return Err(Error::NoSupport);
        }
        if target.port() == 0 && cmd != SocksCmd::UDP_ASSOCIATE {
            // ASSOCIATE may name an all-zero client endpoint; nothing
            // else may.
            return Err(Error::Syntax);
        }
        match version {
            SocksVersion::V4 => {
                if cmd == SocksCmd::UDP_ASSOCIATE {
                    return Err(Error::NoSupport);
                }
                if let SocksAddr::Ip(IpAddr::V6(_)) = target.host() {
                    return Err(Error::NoSupport);
                }
                match auth {
                    SocksAuth::NoAuth | SocksAuth::Socks4(_) => (),
                    _ => return Err(Error::NoSupport),
                }
            }
            SocksVersion::V5 => match &auth {
                SocksAuth::NoAuth => (),
                SocksAuth::Username(user, pass) => {
                    if user.len() > 255 || pass.len() > 255 {
                        // RFC 1929 stores each length in one byte.
                        return Err(Error::NoSupport);
                    }
                }
                _ => return Err(Error::NoSupport),
            },
        }

        Ok(SocksClientHandshake {
            version,
            cmd,
            target,
            auth,
            state: State::Initial,
            buf: ByteQueue::new(),
            needed: 0,
            pending_bound: None,
            reply: None,
        })
    }

    /// Try to advance the handshake, given some proxy input in
    /// `input`.
    ///
    /// The input is buffered; if it isn't enough to complete the next
    /// protocol step, the returned [Action] simply carries nothing
    /// and the caller should try again once more bytes have arrived.
    /// An error is terminal: the handshake moves to its absorbing
    /// failure state, and the transport should be discarded.
    pub fn handshake(&mut self, input: &[u8]) -> Result<Action> {
        if let State::Done | State::Failed = self.state {
            return Err(Error::AlreadyFinished);
        }
        self.buf.append(input);

        let mut send = Vec::new();
        match self.advance(&mut send) {
            Ok(()) => Ok(Action {
                reply: send,
                bound: self.pending_bound.take(),
                finished: self.state == State::Done,
            }),
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Run as many protocol steps as the buffered input allows,
    /// collecting outgoing bytes into `send`.
    fn advance(&mut self, send: &mut Vec<u8>) -> Result<()> {
        if self.state == State::Initial {
            self.send_initial(send)?;
        }
        loop {
            if self.state == State::Done || self.buf.len() < self.needed {
                return Ok(());
            }
            match (self.state, self.version) {
                (State::SentInitial, SocksVersion::V4) => self.socks4_reply(false)?,
                (State::SentInitial, SocksVersion::V5) => self.method_selection(send)?,
                (State::SentAuth, SocksVersion::V5) => self.auth_reply(send)?,
                (State::SentCommand, SocksVersion::V5) => self.command_reply()?,
                (State::BoundWait, SocksVersion::V4) => self.socks4_reply(true)?,
                (State::BoundWait, SocksVersion::V5) => self.command_reply()?,
                (_, _) => return Err(Error::Internal),
            }
        }
    }

    /// Queue the opening message for the proxy, and prime `needed`
    /// for its first reply.
    fn send_initial(&mut self, send: &mut Vec<u8>) -> Result<()> {
        match self.version {
            SocksVersion::V4 => {
                self.encode_socks4_request(send)?;
                self.needed = SOCKS4_REPLY_LEN;
            }
            SocksVersion::V5 => {
                send.write_u8(5);
                if let SocksAuth::Username(_, _) = self.auth {
                    send.write_u8(2);
                    send.write_u8(NO_AUTHENTICATION);
                    send.write_u8(USERNAME_PASSWORD);
                } else {
                    send.write_u8(1);
                    send.write_u8(NO_AUTHENTICATION);
                }
                self.needed = 2;
            }
        }
        self.state = State::SentInitial;
        Ok(())
    }

    /// Encode the SOCKS4 request, or its 4a form when the target is a
    /// hostname.
    fn encode_socks4_request(&self, w: &mut Vec<u8>) -> Result<()> {
        w.write_u8(4);
        w.write_u8(self.cmd.into());
        w.write_u16(self.target.port());
        let userid: &[u8] = match &self.auth {
            SocksAuth::Socks4(u) => &u[..],
            _ => &[],
        };
        match self.target.host() {
            SocksAddr::Ip(IpAddr::V4(ip)) => {
                w.write(ip);
                w.write(userid);
                w.write_u8(0);
            }
            SocksAddr::Hostname(h) => {
                // SOCKS4a: the invalid address 0.0.0.1 marks that the
                // real target is the hostname after the user-id.
                w.write_u32(1);
                w.write(userid);
                w.write_u8(0);
                w.write(h.as_ref().as_bytes());
                w.write_u8(0);
            }
            SocksAddr::Ip(IpAddr::V6(_)) => return Err(Error::Internal),
        }
        Ok(())
    }

    /// Parse an 8-byte SOCKS4 reply.  `second` is true when this is
    /// BIND's second reply, announcing the inbound peer.
    fn socks4_reply(&mut self, second: bool) -> Result<()> {
        let (version, status, port, ip) = {
            let mut r = Reader::from_slice(self.buf.peek(SOCKS4_REPLY_LEN)?);
            let version = r.take_u8()?;
            let status = r.take_u8()?;
            let port = r.take_u16()?;
            let ip: Ipv4Addr = r.extract()?;
            (version, status, port, ip)
        };
        self.buf.advance(SOCKS4_REPLY_LEN)?;

        if version != 0 {
            return Err(Error::BadProtocol(version));
        }
        let status: Socks4Status = status.into();
        if status != Socks4Status::GRANTED {
            return Err(Error::RejectedV4(status));
        }

        let addr = TargetAddr::from_parts(SocksAddr::Ip(ip.into()), port);
        if !second && self.cmd == SocksCmd::BIND {
            self.pending_bound = Some(addr);
            self.state = State::BoundWait;
            self.needed = SOCKS4_REPLY_LEN;
        } else {
            self.finish(addr);
        }
        Ok(())
    }

    /// Parse the proxy's 2-byte answer to our SOCKS5 greeting, and
    /// queue whichever message its chosen method calls for.
    fn method_selection(&mut self, send: &mut Vec<u8>) -> Result<()> {
        let (version, method) = {
            let hdr = self.buf.peek(2)?;
            (hdr[0], hdr[1])
        };
        self.buf.advance(2)?;

        if version != 5 {
            return Err(Error::BadProtocol(version));
        }
        match method {
            NO_AUTHENTICATION => self.send_command_request(send),
            USERNAME_PASSWORD => {
                if let SocksAuth::Username(user, pass) = &self.auth {
                    send.write_u8(1);
                    send.write_u8(user.len() as u8);
                    send.write(&user[..]);
                    send.write_u8(pass.len() as u8);
                    send.write(&pass[..]);
                    self.state = State::SentAuth;
                    self.needed = 2;
                    Ok(())
                } else {
                    // We didn't offer username/password; a proxy that
                    // picks it anyway gets the same treatment as one
                    // that rejects every method.
                    Err(Error::NoAcceptedAuth)
                }
            }
            // Includes 0xFF, "no acceptable methods".
            _ => Err(Error::NoAcceptedAuth),
        }
    }

    /// Parse the proxy's 2-byte verdict on our username/password.
    fn auth_reply(&mut self, send: &mut Vec<u8>) -> Result<()> {
        let (version, status) = {
            let hdr = self.buf.peek(2)?;
            (hdr[0], hdr[1])
        };
        self.buf.advance(2)?;

        if version != 1 {
            return Err(Error::BadProtocol(version));
        }
        if status != 0 {
            return Err(Error::AuthRejected);
        }
        self.send_command_request(send)
    }

    /// Queue the SOCKS5 command request, and wait for its reply.
    fn send_command_request(&mut self, send: &mut Vec<u8>) -> Result<()> {
        send.write_u8(5);
        send.write_u8(self.cmd.into());
        send.write_u8(0); // reserved
        send.write(self.target.host());
        send.write_u16(self.target.port());
        self.state = State::SentCommand;
        self.needed = SOCKS5_REPLY_HEADER_LEN;
        Ok(())
    }

    /// Parse a SOCKS5 command reply.
    ///
    /// This is the variable-length case, handled in two phases: peek
    /// at enough header to learn the address type (and, for
    /// hostnames, the length byte), then either raise `needed` to the
    /// computed total and wait, or consume the whole frame at once.
    fn command_reply(&mut self) -> Result<()> {
        let total = {
            let header = self.buf.peek(SOCKS5_REPLY_HEADER_LEN)?;
            match header[3] {
                1 => 4 + 4 + 2,
                4 => 4 + 16 + 2,
                3 => 4 + 1 + header[4] as usize + 2,
                _ => return Err(Error::Syntax),
            }
        };
        if self.buf.len() < total {
            self.needed = total;
            return Ok(());
        }

        let (version, status, addr, port) = {
            let mut r = Reader::from_slice(self.buf.peek(total)?);
            let version = r.take_u8()?;
            let status = r.take_u8()?;
            let _reserved = r.take_u8()?;
            let addr: SocksAddr = r.extract()?;
            let port = r.take_u16()?;
            r.should_be_exhausted()?;
            (version, status, addr, port)
        };
        self.buf.advance(total)?;

        if version != 5 {
            return Err(Error::BadProtocol(version));
        }
        let status: SocksStatus = status.into();
        if status != SocksStatus::SUCCEEDED {
            return Err(Error::Rejected(status));
        }

        let addr = TargetAddr::from_parts(addr, port);
        if self.state == State::SentCommand && self.cmd == SocksCmd::BIND {
            self.pending_bound = Some(addr);
            self.state = State::BoundWait;
            self.needed = SOCKS5_REPLY_HEADER_LEN;
        } else {
            self.finish(addr);
        }
        Ok(())
    }

    /// Enter the successful terminal state.
    fn finish(&mut self, peer: TargetAddr) {
        self.reply = Some(SocksReply {
            peer: Some(peer),
            leftover: Vec::new(),
        });
        self.state = State::Done;
    }

    /// Return true if this handshake is finished, successfully.
    pub fn finished(&self) -> bool {
        self.state == State::Done
    }

    /// Consume this handshake's state; if it finished successfully,
    /// return its product.
    pub fn into_reply(self) -> Option<SocksReply> {
        let SocksClientHandshake { buf, reply, .. } = self;
        reply.map(|mut r| {
            r.leftover = buf.into_rest();
            r
        })
    }
}

impl SocksReply {
    /// Return the address the proxy reported in its final reply, if
    /// it reported a usable one.
    pub fn peer_addr(&self) -> Option<&TargetAddr> {
        self.peer.as_ref()
    }

    /// Split this reply into the proxy-reported address and the bytes
    /// that arrived after the final protocol frame.
    pub fn into_parts(self) -> (Option<TargetAddr>, Vec<u8>) {
        (self.peer, self.leftover)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;

    /// Shorthand for a NoAuth CONNECT handshake.
    fn connect_handshake(version: SocksVersion, host: &str, port: u16) -> SocksClientHandshake {
        SocksClientHandshake::new(
            version,
            SocksCmd::CONNECT,
            TargetAddr::new(host, port).unwrap(),
            SocksAuth::NoAuth,
        )
        .unwrap()
    }

    /// Drive `hs` by feeding `input` split into the given chunks,
    /// after the opening message; return the final reply.
    fn run_to_completion(mut hs: SocksClientHandshake, chunks: &[&[u8]]) -> SocksReply {
        let first = hs.handshake(&[]).unwrap();
        assert!(!first.reply.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            let action = hs.handshake(chunk).unwrap();
            if i + 1 == chunks.len() {
                assert!(action.finished);
            }
        }
        assert!(hs.finished());
        hs.into_reply().unwrap()
    }

    #[test]
    fn socks5_noauth_connect() {
        // CONNECT to 93.184.216.34:80 through a SOCKS5 proxy, no
        // authentication.
        let mut hs = connect_handshake(SocksVersion::V5, "93.184.216.34", 80);

        let action = hs.handshake(&[]).unwrap();
        assert_eq!(action.reply, [5, 1, 0]);
        assert!(!action.finished);

        let action = hs.handshake(&[5, 0]).unwrap();
        assert_eq!(
            action.reply,
            [5, 1, 0, 1, 0x5d, 0xb8, 0xd8, 0x22, 0x00, 0x50]
        );
        assert!(!action.finished);

        let action = hs.handshake(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).unwrap();
        assert!(action.reply.is_empty());
        assert!(action.finished);

        let reply = hs.into_reply().unwrap();
        assert_eq!(
            reply.peer_addr().unwrap(),
            &TargetAddr::new("0.0.0.0", 0).unwrap()
        );
    }

    #[test]
    fn socks5_connect_hostname() {
        let mut hs = connect_handshake(SocksVersion::V5, "example.com", 80);

        let action = hs.handshake(&[]).unwrap();
        assert_eq!(action.reply, [5, 1, 0]);

        let action = hs.handshake(&[5, 0]).unwrap();
        let mut expected = vec![5, 1, 0, 3, 11];
        expected.extend_from_slice(b"example.com");
        expected.extend_from_slice(&[0, 80]);
        assert_eq!(action.reply, expected);
    }

    #[test]
    fn fragmentation_byte_at_a_time() {
        // Delivering a whole transcript one byte at a time reaches
        // the same outcome as delivering it in one piece.
        let transcript: Vec<u8> = vec![
            5, 0, // method selection
            5, 0, 0, 1, 10, 0, 0, 1, 0x1f, 0x90, // command reply
        ];

        let mut hs = connect_handshake(SocksVersion::V5, "93.184.216.34", 80);
        hs.handshake(&[]).unwrap();
        let mut finished_at = None;
        for (i, b) in transcript.iter().enumerate() {
            let action = hs.handshake(&[*b]).unwrap();
            if action.finished {
                assert!(finished_at.is_none());
                finished_at = Some(i);
            }
        }
        assert_eq!(finished_at, Some(transcript.len() - 1));
        let (peer_bytewise, _) = hs.into_reply().unwrap().into_parts();

        let mut hs = connect_handshake(SocksVersion::V5, "93.184.216.34", 80);
        hs.handshake(&[]).unwrap();
        let action = hs.handshake(&transcript).unwrap();
        assert!(action.finished);
        let (peer_whole, _) = hs.into_reply().unwrap().into_parts();

        assert_eq!(peer_bytewise, peer_whole);
        assert_eq!(
            peer_whole.unwrap(),
            TargetAddr::new("10.0.0.1", 8080).unwrap()
        );
    }

    #[test]
    fn fragmentation_every_split() {
        // Every two-chunk split of the transcript reaches the same
        // terminal outcome.
        let transcript: Vec<u8> = {
            let mut t = vec![5, 0];
            t.extend_from_slice(&[5, 0, 0, 3, 11]);
            t.extend_from_slice(b"example.com");
            t.extend_from_slice(&[0, 80]);
            t
        };
        let expected = TargetAddr::new("example.com", 80).unwrap();

        for split in 0..=transcript.len() {
            let hs = connect_handshake(SocksVersion::V5, "interior.example", 4022);
            let (head, tail) = transcript.split_at(split);
            let chunks: Vec<&[u8]> = if head.is_empty() {
                vec![tail]
            } else if tail.is_empty() {
                vec![head]
            } else {
                vec![head, tail]
            };
            let reply = run_to_completion(hs, &chunks);
            assert_eq!(reply.peer_addr().unwrap(), &expected, "split at {}", split);
        }
    }

    #[test]
    fn pipelined_replies() {
        // An eager proxy may send its method selection and command
        // reply in one burst; both are handled in a single call.
        let mut hs = connect_handshake(SocksVersion::V5, "192.0.2.9", 22);
        hs.handshake(&[]).unwrap();

        let burst = [5, 0, 5, 0, 0, 1, 192, 0, 2, 9, 0, 22];
        let action = hs.handshake(&burst).unwrap();
        // The command request went out in the same action.
        assert_eq!(action.reply, [5, 1, 0, 1, 192, 0, 2, 9, 0, 22]);
        assert!(action.finished);
    }

    #[test]
    fn socks4a_connect() {
        let mut hs = SocksClientHandshake::new(
            SocksVersion::V4,
            SocksCmd::CONNECT,
            TargetAddr::new("example.com", 80).unwrap(),
            SocksAuth::NoAuth,
        )
        .unwrap();

        let action = hs.handshake(&[]).unwrap();
        let mut expected = vec![4, 1, 0x00, 0x50, 0, 0, 0, 1, 0];
        expected.extend_from_slice(b"example.com");
        expected.push(0);
        assert_eq!(action.reply, expected);

        let action = hs.handshake(&[0, 0x5a, 0x1f, 0x90, 10, 1, 2, 3]).unwrap();
        assert!(action.finished);
        let reply = hs.into_reply().unwrap();
        assert_eq!(
            reply.peer_addr().unwrap(),
            &TargetAddr::new("10.1.2.3", 8080).unwrap()
        );
    }

    #[test]
    fn socks4_userid_and_rejection() {
        let mut hs = SocksClientHandshake::new(
            SocksVersion::V4,
            SocksCmd::CONNECT,
            TargetAddr::new("192.0.2.1", 443).unwrap(),
            SocksAuth::Socks4(b"fred".to_vec()),
        )
        .unwrap();

        let action = hs.handshake(&[]).unwrap();
        assert_eq!(
            action.reply,
            [4, 1, 0x01, 0xbb, 192, 0, 2, 1, b'f', b'r', b'e', b'd', 0]
        );

        let err = hs
            .handshake(&[0, 0x5b, 0, 0, 0, 0, 0, 0])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RejectedV4(s) if s == Socks4Status::REJECTED
        ));
    }

    #[test]
    fn no_acceptable_auth_method() {
        let mut hs = connect_handshake(SocksVersion::V5, "192.0.2.1", 80);
        hs.handshake(&[]).unwrap();

        let err = hs.handshake(&[5, 0xFF]).unwrap_err();
        assert!(matches!(err, Error::NoAcceptedAuth));

        // The failure state is absorbing: more input changes nothing.
        assert!(matches!(
            hs.handshake(&[5, 0]),
            Err(Error::AlreadyFinished)
        ));
        assert!(matches!(
            hs.handshake(&[1, 2, 3, 4]),
            Err(Error::AlreadyFinished)
        ));
        assert!(!hs.finished());
        assert!(hs.into_reply().is_none());
    }

    #[test]
    fn unoffered_method_selected() {
        // We offered NoAuth only; a proxy choosing username/password
        // anyway is as good as one accepting nothing.
        let mut hs = connect_handshake(SocksVersion::V5, "192.0.2.1", 80);
        let action = hs.handshake(&[]).unwrap();
        assert_eq!(action.reply, [5, 1, 0]);

        let err = hs.handshake(&[5, 2]).unwrap_err();
        assert!(matches!(err, Error::NoAcceptedAuth));
    }

    #[test]
    fn username_password_success() {
        let mut hs = SocksClientHandshake::new(
            SocksVersion::V5,
            SocksCmd::CONNECT,
            TargetAddr::new("192.0.2.77", 22).unwrap(),
            SocksAuth::Username(b"user".to_vec(), b"pass".to_vec()),
        )
        .unwrap();

        let action = hs.handshake(&[]).unwrap();
        // Both methods offered, username/password included.
        assert_eq!(action.reply, [5, 2, 0, 2]);

        let action = hs.handshake(&[5, 2]).unwrap();
        assert_eq!(
            action.reply,
            [1, 4, b'u', b's', b'e', b'r', 4, b'p', b'a', b's', b's']
        );

        let action = hs.handshake(&[1, 0]).unwrap();
        assert_eq!(action.reply[..4], [5, 1, 0, 1]);

        let action = hs.handshake(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).unwrap();
        assert!(action.finished);
    }

    #[test]
    fn username_password_rejected() {
        let mut hs = SocksClientHandshake::new(
            SocksVersion::V5,
            SocksCmd::CONNECT,
            TargetAddr::new("192.0.2.77", 22).unwrap(),
            SocksAuth::Username(b"user".to_vec(), b"nope".to_vec()),
        )
        .unwrap();
        hs.handshake(&[]).unwrap();
        hs.handshake(&[5, 2]).unwrap();

        let err = hs.handshake(&[1, 1]).unwrap_err();
        assert!(matches!(err, Error::AuthRejected));
    }

    #[test]
    fn command_rejected_with_status() {
        let mut hs = connect_handshake(SocksVersion::V5, "203.0.113.1", 80);
        hs.handshake(&[]).unwrap();
        hs.handshake(&[5, 0]).unwrap();

        let err = hs
            .handshake(&[5, 5, 0, 1, 0, 0, 0, 0, 0, 0])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Rejected(s) if s == SocksStatus::CONNECTION_REFUSED
        ));
    }

    #[test]
    fn hostname_reply_two_phase() {
        // A hostname in the reply means the total length is only
        // knowable after the fifth byte.
        let mut hs = connect_handshake(SocksVersion::V5, "example.com", 80);
        hs.handshake(&[]).unwrap();
        hs.handshake(&[5, 0]).unwrap();

        // Four header bytes: not even the length byte yet.
        let action = hs.handshake(&[5, 0, 0, 3]).unwrap();
        assert!(!action.finished && action.reply.is_empty());

        // Length byte plus part of the name: still waiting.
        let action = hs.handshake(&[10, b'f', b'a', b'r']).unwrap();
        assert!(!action.finished && action.reply.is_empty());

        // The rest of the name and the port.
        let action = hs.handshake(b"away.io\x00\x50").unwrap();
        assert!(action.finished);

        let reply = hs.into_reply().unwrap();
        assert_eq!(
            reply.peer_addr().unwrap(),
            &TargetAddr::new("faraway.io", 80).unwrap()
        );
    }

    #[test]
    fn ipv6_reply() {
        let mut hs = connect_handshake(SocksVersion::V5, "example.com", 443);
        hs.handshake(&[]).unwrap();
        hs.handshake(&[5, 0]).unwrap();

        let mut frame = vec![5, 0, 0, 4];
        frame.extend_from_slice(&"2001:db8::44".parse::<std::net::Ipv6Addr>().unwrap().octets());
        frame.extend_from_slice(&[0x01, 0xbb]);
        let action = hs.handshake(&frame).unwrap();
        assert!(action.finished);
        let reply = hs.into_reply().unwrap();
        assert_eq!(
            reply.peer_addr().unwrap(),
            &TargetAddr::new("2001:db8::44", 443).unwrap()
        );
    }

    #[test]
    fn socks5_bind_two_phase() {
        let mut hs = SocksClientHandshake::new(
            SocksVersion::V5,
            SocksCmd::BIND,
            TargetAddr::new("203.0.113.9", 20).unwrap(),
            SocksAuth::NoAuth,
        )
        .unwrap();
        hs.handshake(&[]).unwrap();
        let action = hs.handshake(&[5, 0]).unwrap();
        assert_eq!(action.reply[..2], [5, 2]);

        // First reply: the proxy is listening.
        let action = hs.handshake(&[5, 0, 0, 1, 198, 51, 100, 4, 0x10, 0x92]).unwrap();
        assert!(!action.finished);
        assert_eq!(
            action.bound.unwrap(),
            TargetAddr::new("198.51.100.4", 4242).unwrap()
        );

        // Second reply: the peer has connected.
        let action = hs.handshake(&[5, 0, 0, 1, 203, 0, 113, 9, 0x30, 0x39]).unwrap();
        assert!(action.finished);
        assert!(action.bound.is_none());
        let reply = hs.into_reply().unwrap();
        assert_eq!(
            reply.peer_addr().unwrap(),
            &TargetAddr::new("203.0.113.9", 12345).unwrap()
        );
    }

    #[test]
    fn socks4_bind_two_phase() {
        let mut hs = SocksClientHandshake::new(
            SocksVersion::V4,
            SocksCmd::BIND,
            TargetAddr::new("192.0.2.99", 21).unwrap(),
            SocksAuth::NoAuth,
        )
        .unwrap();
        hs.handshake(&[]).unwrap();

        let action = hs.handshake(&[0, 0x5a, 0x00, 0x15, 198, 51, 100, 4]).unwrap();
        assert!(!action.finished);
        assert_eq!(
            action.bound.unwrap(),
            TargetAddr::new("198.51.100.4", 21).unwrap()
        );

        let action = hs.handshake(&[0, 0x5a, 0xd4, 0x31, 192, 0, 2, 99]).unwrap();
        assert!(action.finished);
        let reply = hs.into_reply().unwrap();
        assert_eq!(
            reply.peer_addr().unwrap(),
            &TargetAddr::new("192.0.2.99", 54321).unwrap()
        );
    }

    #[test]
    fn udp_associate() {
        let mut hs = SocksClientHandshake::new(
            SocksVersion::V5,
            SocksCmd::UDP_ASSOCIATE,
            TargetAddr::new("0.0.0.0", 0).unwrap(),
            SocksAuth::NoAuth,
        )
        .unwrap();
        hs.handshake(&[]).unwrap();
        let action = hs.handshake(&[5, 0]).unwrap();
        assert_eq!(action.reply, [5, 3, 0, 1, 0, 0, 0, 0, 0, 0]);

        // The reply names the UDP relay endpoint.
        let action = hs.handshake(&[5, 0, 0, 1, 203, 0, 113, 1, 0x04, 0x38]).unwrap();
        assert!(action.finished);
        let reply = hs.into_reply().unwrap();
        assert_eq!(
            reply.peer_addr().unwrap(),
            &TargetAddr::new("203.0.113.1", 1080).unwrap()
        );
    }

    #[test]
    fn leftover_bytes_preserved() {
        let mut hs = connect_handshake(SocksVersion::V5, "192.0.2.5", 22);
        hs.handshake(&[]).unwrap();
        hs.handshake(&[5, 0]).unwrap();

        // The server's banner rides in right behind the final frame.
        let mut burst = vec![5, 0, 0, 1, 192, 0, 2, 5, 0, 22];
        burst.extend_from_slice(b"SSH-2.0-OpenSSH_8.9\r\n");
        let action = hs.handshake(&burst).unwrap();
        assert!(action.finished);

        let (_, leftover) = hs.into_reply().unwrap().into_parts();
        assert_eq!(leftover, b"SSH-2.0-OpenSSH_8.9\r\n");
    }

    #[test]
    fn success_is_terminal_too() {
        let mut hs = connect_handshake(SocksVersion::V5, "192.0.2.5", 22);
        hs.handshake(&[]).unwrap();
        hs.handshake(&[5, 0]).unwrap();
        let action = hs.handshake(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).unwrap();
        assert!(action.finished);
        assert!(matches!(hs.handshake(&[0]), Err(Error::AlreadyFinished)));
    }

    #[test]
    fn bad_version_in_reply() {
        let mut hs = connect_handshake(SocksVersion::V5, "192.0.2.5", 22);
        hs.handshake(&[]).unwrap();
        let err = hs.handshake(&[4, 0]).unwrap_err();
        assert!(matches!(err, Error::BadProtocol(4)));
    }

    #[test]
    fn unsupported_combinations() {
        // SOCKS4 has no UDP relay.
        assert!(SocksClientHandshake::new(
            SocksVersion::V4,
            SocksCmd::UDP_ASSOCIATE,
            TargetAddr::new("192.0.2.1", 53).unwrap(),
            SocksAuth::NoAuth,
        )
        .is_err());

        // SOCKS4 cannot express an IPv6 target.
        assert!(SocksClientHandshake::new(
            SocksVersion::V4,
            SocksCmd::CONNECT,
            TargetAddr::new("2001:db8::1", 80).unwrap(),
            SocksAuth::NoAuth,
        )
        .is_err());

        // SOCKS4 has no username/password subnegotiation.
        assert!(SocksClientHandshake::new(
            SocksVersion::V4,
            SocksCmd::CONNECT,
            TargetAddr::new("192.0.2.1", 80).unwrap(),
            SocksAuth::Username(b"u".to_vec(), b"p".to_vec()),
        )
        .is_err());

        // Port zero only makes sense for UDP_ASSOCIATE.
        assert!(SocksClientHandshake::new(
            SocksVersion::V5,
            SocksCmd::CONNECT,
            TargetAddr::new("192.0.2.1", 0).unwrap(),
            SocksAuth::NoAuth,
        )
        .is_err());

        // Credentials longer than a length byte can describe.
        assert!(SocksClientHandshake::new(
            SocksVersion::V5,
            SocksCmd::CONNECT,
            TargetAddr::new("192.0.2.1", 80).unwrap(),
            SocksAuth::Username(vec![b'x'; 256], b"p".to_vec()),
        )
        .is_err());
    }
}
