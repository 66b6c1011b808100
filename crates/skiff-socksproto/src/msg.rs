//! Structures that represent SOCKS messages

use crate::{Error, Result};

use caret::caret_int;
use std::convert::TryFrom;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use skiff_bytes::Error as BytesError;
use skiff_bytes::Result as BytesResult;
use skiff_bytes::{Readable, Reader, Writeable, Writer};

/// A version of the SOCKS protocol that we can speak with a proxy.
///
/// (SOCKS4a is not listed separately: it is SOCKS4 with a hostname
/// target, and the request encoder picks the right form by itself.)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum SocksVersion {
    /// SOCKS4 or SOCKS4a.
    V4,
    /// SOCKS5.
    V5,
}

impl TryFrom<u8> for SocksVersion {
    type Error = Error;
    fn try_from(v: u8) -> Result<SocksVersion> {
        match v {
            4 => Ok(SocksVersion::V4),
            5 => Ok(SocksVersion::V5),
            _ => Err(Error::BadProtocol(v)),
        }
    }
}

impl fmt::Display for SocksVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksVersion::V4 => write!(f, "SOCKS4"),
            SocksVersion::V5 => write!(f, "SOCKS5"),
        }
    }
}

/// An address sent or received as part of a SOCKS handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum SocksAddr {
    /// A hostname, to be resolved by the proxy.
    Hostname(SocksHostname),
    /// An IP address literal.
    Ip(IpAddr),
}

/// A hostname for use with SOCKS.  It is limited in length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocksHostname(String);

/// A host and port, as understood by a SOCKS proxy.
///
/// Hosts given as strings are classified once, on construction: an
/// IPv4 or IPv6 literal becomes [`SocksAddr::Ip`], and anything else
/// is passed through to the proxy as a hostname.  No name resolution
/// happens on our side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetAddr {
    /// Where to connect (or bind, or relay).
    host: SocksAddr,
    /// The TCP or UDP port at `host`.
    port: u16,
}

/// Authentication material to present to a proxy.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SocksAuth {
    /// Don't authenticate.
    NoAuth,
    /// A SOCKS4 user-id string.
    Socks4(Vec<u8>),
    /// SOCKS5 username/password authentication (RFC 1929).
    Username(Vec<u8>, Vec<u8>),
}

caret_int! {
    /// A command to request from a proxy.
    pub struct SocksCmd(u8) {
        /// Connect to a remote TCP address:port.
        CONNECT = 1,
        /// Ask the proxy to listen for one inbound TCP connection on
        /// our behalf.
        BIND = 2,
        /// Set up a UDP relay.  (SOCKS5 only.)
        UDP_ASSOCIATE = 3,
    }
}

caret_int! {
    /// Possible reply status values from a SOCKS5 proxy.
    ///
    /// Note that the documentation for these values is kind of scant,
    /// and is limited to what the RFC says.
    pub struct SocksStatus(u8) {
        /// RFC 1928: "succeeded"
        SUCCEEDED = 0x00,
        /// RFC 1928: "general SOCKS server failure"
        GENERAL_FAILURE = 0x01,
        /// RFC 1928: "connection not allowable by ruleset"
        NOT_ALLOWED = 0x02,
        /// RFC 1928: "Network unreachable"
        NETWORK_UNREACHABLE = 0x03,
        /// RFC 1928: "Host unreachable"
        HOST_UNREACHABLE = 0x04,
        /// RFC 1928: "Connection refused"
        CONNECTION_REFUSED = 0x05,
        /// RFC 1928: "TTL expired"
        TTL_EXPIRED = 0x06,
        /// RFC 1928: "Command not supported"
        COMMAND_NOT_SUPPORTED = 0x07,
        /// RFC 1928: "Address type not supported"
        ADDRTYPE_NOT_SUPPORTED = 0x08,
    }
}

caret_int! {
    /// Possible reply status values from a SOCKS4 proxy.
    pub struct Socks4Status(u8) {
        /// Request granted.
        GRANTED = 0x5A,
        /// Request rejected or failed.
        REJECTED = 0x5B,
        /// Request failed: the proxy could not reach the client's
        /// identd service.
        NO_IDENT = 0x5C,
        /// Request failed: identd reported a different user-id.
        IDENT_MISMATCH = 0x5D,
    }
}

impl SocksCmd {
    /// Return true if this is a command we know about.
    pub(crate) fn recognized(self) -> bool {
        matches!(
            self,
            SocksCmd::CONNECT | SocksCmd::BIND | SocksCmd::UDP_ASSOCIATE
        )
    }
}

impl TryFrom<String> for SocksHostname {
    type Error = Error;
    fn try_from(s: String) -> Result<SocksHostname> {
        if s.len() > 255 {
            // The wire format stores hostname length in one byte.
            Err(Error::Syntax)
        } else {
            Ok(SocksHostname(s))
        }
    }
}

impl AsRef<str> for SocksHostname {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl From<SocksHostname> for String {
    fn from(s: SocksHostname) -> String {
        s.0
    }
}

impl TargetAddr {
    /// Construct a TargetAddr from a host string and a port.
    ///
    /// `host` may be an IPv4 literal, an IPv6 literal, or a hostname
    /// of at most 255 bytes.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let host = match host.parse::<IpAddr>() {
            Ok(ip) => SocksAddr::Ip(ip),
            Err(_) => SocksAddr::Hostname(SocksHostname::try_from(host.to_string())?),
        };
        Ok(TargetAddr { host, port })
    }

    /// Construct a TargetAddr from an already-classified address.
    pub fn from_parts(host: SocksAddr, port: u16) -> Self {
        TargetAddr { host, port }
    }

    /// Return the host part of this address.
    pub fn host(&self) -> &SocksAddr {
        &self.host
    }

    /// Return the port part of this address.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(sa: SocketAddr) -> TargetAddr {
        TargetAddr {
            host: SocksAddr::Ip(sa.ip()),
            port: sa.port(),
        }
    }
}

impl Readable for SocksAddr {
    fn take_from(r: &mut Reader<'_>) -> BytesResult<SocksAddr> {
        let atype = r.take_u8()?;
        match atype {
            1 => {
                let ip4: std::net::Ipv4Addr = r.extract()?;
                Ok(SocksAddr::Ip(ip4.into()))
            }
            3 => {
                let hlen = r.take_u8()?;
                let hostname = r.take(hlen as usize)?;
                let hostname = std::str::from_utf8(hostname)
                    .map_err(|_| BytesError::BadMessage("bad utf8 on hostname"))?
                    .to_string();
                // Cannot exceed 255 bytes: the length came from one byte.
                Ok(SocksAddr::Hostname(SocksHostname(hostname)))
            }
            4 => {
                let ip6: std::net::Ipv6Addr = r.extract()?;
                Ok(SocksAddr::Ip(ip6.into()))
            }
            _ => Err(BytesError::BadMessage("unrecognized address type.")),
        }
    }
}

impl Writeable for SocksAddr {
    fn write_onto<W: Writer + ?Sized>(&self, w: &mut W) {
        match self {
            SocksAddr::Ip(IpAddr::V4(ip)) => {
                w.write_u8(1);
                w.write(ip);
            }
            SocksAddr::Ip(IpAddr::V6(ip)) => {
                w.write_u8(4);
                w.write(ip);
            }
            SocksAddr::Hostname(h) => {
                // Guaranteed to fit: SocksHostname is at most 255 bytes.
                let hlen = h.0.len() as u8;
                w.write_u8(3);
                w.write_u8(hlen);
                w.write(h.0.as_bytes());
            }
        }
    }
}

impl fmt::Display for SocksAddr {
    /// Format a string (a hostname or IP address) corresponding to
    /// this SocksAddr.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksAddr::Ip(a) => write!(f, "{}", a),
            SocksAddr::Hostname(h) => write!(f, "{}", h.0),
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            SocksAddr::Ip(IpAddr::V6(a)) => write!(f, "[{}]:{}", a, self.port),
            other => write!(f, "{}:{}", other, self.port),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryInto;

    #[test]
    fn display_sa() {
        let a = SocksAddr::Ip(IpAddr::V4("127.0.0.1".parse().unwrap()));
        assert_eq!(a.to_string(), "127.0.0.1");

        let a = SocksAddr::Ip(IpAddr::V6("f00::9999".parse().unwrap()));
        assert_eq!(a.to_string(), "f00::9999");

        let a = SocksAddr::Hostname("www.example.com".to_string().try_into().unwrap());
        assert_eq!(a.to_string(), "www.example.com");
    }

    #[test]
    fn display_target() {
        let t = TargetAddr::new("198.51.100.7", 22).unwrap();
        assert_eq!(t.to_string(), "198.51.100.7:22");

        let t = TargetAddr::new("f00::9999", 443).unwrap();
        assert_eq!(t.to_string(), "[f00::9999]:443");

        let t = TargetAddr::new("files.example.com", 2022).unwrap();
        assert_eq!(t.to_string(), "files.example.com:2022");
    }

    #[test]
    fn classify_literals() {
        let t = TargetAddr::new("192.0.2.33", 80).unwrap();
        assert!(matches!(t.host(), SocksAddr::Ip(IpAddr::V4(_))));

        let t = TargetAddr::new("2001:db8::1", 80).unwrap();
        assert!(matches!(t.host(), SocksAddr::Ip(IpAddr::V6(_))));

        let t = TargetAddr::new("2001:db8::1.example.com", 80).unwrap();
        assert!(matches!(t.host(), SocksAddr::Hostname(_)));
    }

    #[test]
    fn long_hostname_rejected() {
        let long = "x".repeat(256);
        assert!(TargetAddr::new(&long, 80).is_err());
        let almost = "x".repeat(255);
        assert!(TargetAddr::new(&almost, 80).is_ok());
    }

    #[test]
    fn from_socket_addr() {
        let sa: SocketAddr = "203.0.113.5:1080".parse().unwrap();
        let t: TargetAddr = sa.into();
        assert_eq!(t.port(), 1080);
        assert_eq!(t.to_string(), "203.0.113.5:1080");
    }

    #[test]
    fn addr_wire_round_trip() {
        for addr in [
            SocksAddr::Ip("10.1.2.3".parse().unwrap()),
            SocksAddr::Ip("2001:db8::44".parse().unwrap()),
            SocksAddr::Hostname("example.com".to_string().try_into().unwrap()),
        ]
        .iter()
        {
            let mut v: Vec<u8> = Vec::new();
            v.write(addr);
            let mut r = Reader::from_slice(&v[..]);
            let out: SocksAddr = r.extract().unwrap();
            r.should_be_exhausted().unwrap();
            assert_eq!(&out, addr);
        }
    }

    #[test]
    fn version_from_byte() {
        assert_eq!(SocksVersion::try_from(4).unwrap(), SocksVersion::V4);
        assert_eq!(SocksVersion::try_from(5).unwrap(), SocksVersion::V5);
        assert!(matches!(
            SocksVersion::try_from(6),
            Err(Error::BadProtocol(6))
        ));
    }
}
