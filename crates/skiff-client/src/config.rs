//! Configuration for tunnels and proxy chains.
//!
//! All of these types validate on construction: holding a
//! [`HandshakeOptions`] or [`ChainOptions`] means the combination has
//! already been checked against what the chosen SOCKS version can
//! express, and no socket will be opened for options that would fail.

use skiff_socksproto::{
    SocksAddr, SocksAuth, SocksClientHandshake, SocksCmd, SocksVersion, TargetAddr,
};

use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Handshake timeout applied when the caller doesn't pick one.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// A problem with caller-supplied options, reported before any I/O
/// begins.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The proxy host string is empty.
    #[error("proxy host is empty")]
    EmptyProxyHost,
    /// The proxy port is zero.
    #[error("proxy port is zero")]
    ZeroProxyPort,
    /// A hostname is longer than the SOCKS wire format can carry.
    #[error("hostname is too long for the SOCKS wire format")]
    HostnameTooLong,
    /// Username/password authentication was requested of a proxy
    /// version that cannot do it.
    #[error("username/password authentication requires SOCKS5")]
    AuthNeedsV5,
    /// A user-id string was given for a proxy version that has no
    /// use for one.
    #[error("a user-id is only meaningful for SOCKS4")]
    UseridNeedsV4,
    /// A username or password is longer than its length byte can
    /// describe.
    #[error("credentials are too long for the SOCKS wire format")]
    CredentialsTooLong,
    /// A SOCKS4 string field would contain its own terminator.
    #[error("NUL byte in a SOCKS4 string field")]
    EmbeddedNul,
    /// The requested command is not supported by the chosen proxy
    /// version.
    #[error("command {0} is not supported by {1}")]
    UnsupportedCommand(SocksCmd, SocksVersion),
    /// SOCKS4 was asked to reach an IPv6 target.
    #[error("SOCKS4 cannot reach an IPv6 target")]
    V4NoIpv6,
    /// The target port is zero for a command that needs a real one.
    #[error("target port is zero")]
    ZeroTargetPort,
    /// A proxy chain was given fewer than two proxies.
    #[error("a proxy chain needs at least two proxies")]
    ChainTooShort,
}

/// Authentication material configured for a proxy.
#[derive(Debug, Clone)]
enum ProxyAuth {
    /// Nothing configured.
    None,
    /// A SOCKS4 user-id.
    Userid(Vec<u8>),
    /// SOCKS5 username and password.
    UserPass(Vec<u8>, Vec<u8>),
}

/// Description of a single SOCKS proxy server.
///
/// Immutable once a handshake starts: the driver takes these by
/// reference and never writes them back.
#[derive(Debug, Clone)]
pub struct ProxyServer {
    /// Host to dial: an IP literal or a resolvable name.
    host: String,
    /// TCP port the proxy listens on.
    port: u16,
    /// Which protocol version this proxy speaks.
    version: SocksVersion,
    /// Authentication material, if any.
    auth: ProxyAuth,
}

impl ProxyServer {
    /// Describe a proxy at `host`:`port` speaking `version`.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        version: SocksVersion,
    ) -> Result<Self, ConfigError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ConfigError::EmptyProxyHost);
        }
        if host.len() > 255 {
            return Err(ConfigError::HostnameTooLong);
        }
        if port == 0 {
            return Err(ConfigError::ZeroProxyPort);
        }
        Ok(ProxyServer {
            host,
            port,
            version,
            auth: ProxyAuth::None,
        })
    }

    /// Add SOCKS5 username/password credentials.
    pub fn with_auth(mut self, username: &str, password: &str) -> Result<Self, ConfigError> {
        if self.version != SocksVersion::V5 {
            return Err(ConfigError::AuthNeedsV5);
        }
        if username.len() > 255 || password.len() > 255 {
            return Err(ConfigError::CredentialsTooLong);
        }
        self.auth = ProxyAuth::UserPass(username.as_bytes().to_vec(), password.as_bytes().to_vec());
        Ok(self)
    }

    /// Add a SOCKS4 user-id.
    pub fn with_userid(mut self, userid: &str) -> Result<Self, ConfigError> {
        if self.version != SocksVersion::V4 {
            return Err(ConfigError::UseridNeedsV4);
        }
        if userid.as_bytes().contains(&0) {
            // The wire format terminates the user-id with a NUL.
            return Err(ConfigError::EmbeddedNul);
        }
        self.auth = ProxyAuth::Userid(userid.as_bytes().to_vec());
        Ok(self)
    }

    /// Return the host this proxy is dialed at.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Return the port this proxy is dialed at.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Return the SOCKS version this proxy speaks.
    pub fn version(&self) -> SocksVersion {
        self.version
    }

    /// Return this proxy's address in the form another proxy could
    /// connect to: the destination of the previous hop in a chain.
    pub fn target_addr(&self) -> Result<TargetAddr, ConfigError> {
        TargetAddr::new(&self.host, self.port).map_err(|_| ConfigError::HostnameTooLong)
    }

    /// Produce the authentication material for a handshake with this
    /// proxy.
    fn socks_auth(&self) -> SocksAuth {
        match &self.auth {
            ProxyAuth::None => SocksAuth::NoAuth,
            ProxyAuth::Userid(u) => SocksAuth::Socks4(u.clone()),
            ProxyAuth::UserPass(u, p) => SocksAuth::Username(u.clone(), p.clone()),
        }
    }
}

/// Check that `proxy` can be asked to run `cmd` against `target`.
fn validate_combo(
    proxy: &ProxyServer,
    target: &TargetAddr,
    cmd: SocksCmd,
) -> Result<(), ConfigError> {
    if target.port() == 0 && cmd != SocksCmd::UDP_ASSOCIATE {
        return Err(ConfigError::ZeroTargetPort);
    }
    if proxy.version == SocksVersion::V4 {
        if cmd == SocksCmd::UDP_ASSOCIATE {
            return Err(ConfigError::UnsupportedCommand(cmd, proxy.version));
        }
        match target.host() {
            SocksAddr::Ip(IpAddr::V6(_)) => return Err(ConfigError::V4NoIpv6),
            SocksAddr::Hostname(h) => {
                if h.as_ref().as_bytes().contains(&0) {
                    return Err(ConfigError::EmbeddedNul);
                }
            }
            SocksAddr::Ip(IpAddr::V4(_)) => (),
        }
    }
    Ok(())
}

/// Options for establishing a tunnel through a single proxy.
#[derive(Debug, Clone)]
pub struct HandshakeOptions {
    /// The proxy to negotiate with.
    proxy: ProxyServer,
    /// Where we want the proxy to connect, bind, or relay.
    target: TargetAddr,
    /// The command to request.
    cmd: SocksCmd,
    /// Deadline for the whole dial-and-handshake operation.
    timeout: Duration,
}

impl HandshakeOptions {
    /// Construct options for a CONNECT tunnel to `target` via
    /// `proxy`.
    pub fn new(proxy: ProxyServer, target: TargetAddr) -> Result<Self, ConfigError> {
        validate_combo(&proxy, &target, SocksCmd::CONNECT)?;
        Ok(HandshakeOptions {
            proxy,
            target,
            cmd: SocksCmd::CONNECT,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Request a different command; the combination is re-validated.
    pub fn with_command(mut self, cmd: SocksCmd) -> Result<Self, ConfigError> {
        validate_combo(&self.proxy, &self.target, cmd)?;
        self.cmd = cmd;
        Ok(self)
    }

    /// Replace the default 30-second handshake timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return the proxy these options negotiate with.
    pub fn proxy(&self) -> &ProxyServer {
        &self.proxy
    }

    /// Return the target of the tunnel.
    pub fn target(&self) -> &TargetAddr {
        &self.target
    }

    /// Return the command that will be requested.
    pub fn command(&self) -> SocksCmd {
        self.cmd
    }

    /// Return the handshake deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the protocol machine for one run of these options.
    pub(crate) fn make_handshake(&self) -> skiff_socksproto::Result<SocksClientHandshake> {
        SocksClientHandshake::new(
            self.proxy.version,
            self.cmd,
            self.target.clone(),
            self.proxy.socks_auth(),
        )
    }
}

/// Options for establishing a tunnel through an ordered chain of
/// proxies.
///
/// Chains always use CONNECT: each hop's job is to reach the next
/// hop, and only the final destination sees anything else.
#[derive(Debug, Clone)]
pub struct ChainOptions {
    /// The proxies to traverse, in order (unless randomized).
    proxies: Vec<ProxyServer>,
    /// The final destination, reached through the last proxy.
    target: TargetAddr,
    /// Deadline applied to each hop's handshake.
    timeout: Duration,
    /// Shuffle the hop order before connecting.
    randomize_order: bool,
}

impl ChainOptions {
    /// Construct options for a tunnel to `target` through every
    /// proxy in `proxies`.
    pub fn new(proxies: Vec<ProxyServer>, target: TargetAddr) -> Result<Self, ConfigError> {
        if proxies.len() < 2 {
            return Err(ConfigError::ChainTooShort);
        }
        // Every hop must be able to CONNECT onward to every other
        // hop, since randomization may reorder them arbitrarily.
        for hop in &proxies {
            for next in &proxies {
                validate_combo(hop, &next.target_addr()?, SocksCmd::CONNECT)?;
            }
            validate_combo(hop, &target, SocksCmd::CONNECT)?;
        }
        Ok(ChainOptions {
            proxies,
            target,
            timeout: DEFAULT_TIMEOUT,
            randomize_order: false,
        })
    }

    /// Replace the default 30-second per-hop timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shuffle the proxy order before connecting.
    pub fn with_randomized_order(mut self, randomize: bool) -> Self {
        self.randomize_order = randomize;
        self
    }

    /// Return the configured proxies, in configuration order.
    pub fn proxies(&self) -> &[ProxyServer] {
        &self.proxies
    }

    /// Return the final destination of the chain.
    pub fn target(&self) -> &TargetAddr {
        &self.target
    }

    /// Return the per-hop handshake deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Return true if the hop order should be shuffled.
    pub fn randomize_order(&self) -> bool {
        self.randomize_order
    }
}
