//! A minimal command-line client for the skiff tunnel suite.
//!
//! Opens a tunnel through one SOCKS proxy (or a chain of them, read
//! from a configuration file) and splices it onto stdin/stdout,
//! netcat-style.  That makes it usable directly as an OpenSSH
//! `ProxyCommand`:
//!
//! ```text
//! ProxyCommand skiff -p 127.0.0.1:1080 %h %p
//! ```

#![warn(missing_docs)]

mod pipe;

use skiff_client::{
    establish, establish_chain, ChainOptions, Established, HandshakeOptions, ProxyServer,
};
use skiff_rtcompat::SpawnBlocking;
use skiff_socksproto::{SocksVersion, TargetAddr};

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use argh::FromArgs;
use serde::Deserialize;
use tracing::info;

#[derive(FromArgs, Debug, Clone)]
/// Open a tunnel to HOST:PORT through one or more SOCKS proxies, and
/// splice it onto stdin/stdout.
struct Args {
    /// override the default location(s) for the configuration file
    #[argh(option, short = 'f')]
    rc: Vec<String>,
    /// a single proxy to use, as host:port (overrides the config
    /// file's proxy list)
    #[argh(option, short = 'p')]
    proxy: Option<String>,
    /// speak SOCKS4 to the proxy given with -p
    #[argh(switch)]
    socks4: bool,
    /// username for SOCKS5 authentication (SOCKS4: used as the
    /// user-id)
    #[argh(option)]
    username: Option<String>,
    /// password for SOCKS5 authentication
    #[argh(option)]
    password: Option<String>,
    /// destination host
    #[argh(positional)]
    host: String,
    /// destination port
    #[argh(positional)]
    port: u16,
}

/// Default options to use for our configuration.
const SKIFF_DEFAULTS: &str = include_str!("./skiff_defaults.toml");

/// Structure to hold our configuration options, whether from a
/// configuration file or the defaults.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct SkiffConfig {
    /// Whether to log at trace level.
    trace: bool,
    /// Handshake deadline per proxy hop, in milliseconds.
    timeout_ms: u64,
    /// Shuffle the proxy order before connecting a chain.
    shuffle: bool,
    /// The proxies to tunnel through, in order.
    #[serde(default)]
    proxy: Vec<ProxyConfig>,
}

/// One proxy entry in the configuration file.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct ProxyConfig {
    /// Host to dial.
    host: String,
    /// Port to dial.
    port: u16,
    /// SOCKS protocol version: 4 or 5.
    #[serde(default = "default_version")]
    version: u8,
    /// SOCKS5 username.
    username: Option<String>,
    /// SOCKS5 password.
    password: Option<String>,
    /// SOCKS4 user-id.
    userid: Option<String>,
}

/// The proxy version assumed when a config entry doesn't name one.
fn default_version() -> u8 {
    5
}

impl ProxyConfig {
    /// Turn this entry into a validated proxy description.
    fn to_server(&self) -> Result<ProxyServer> {
        let version = match self.version {
            4 => SocksVersion::V4,
            5 => SocksVersion::V5,
            v => bail!("unsupported SOCKS version {} for {}", v, self.host),
        };
        let mut server = ProxyServer::new(self.host.clone(), self.port, version)?;
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            server = server.with_auth(user, pass)?;
        }
        if let Some(userid) = &self.userid {
            server = server.with_userid(userid)?;
        }
        Ok(server)
    }
}

/// Split a "host:port" string, tolerating a bracketed IPv6 literal.
fn parse_host_port(spec: &str) -> Result<(String, u16)> {
    let (host, port) = spec
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("expected host:port, got {:?}", spec))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        bail!("expected host:port, got {:?}", spec);
    }
    Ok((host.to_string(), port.parse()?))
}

/// Build the proxy named by `-p` and the related flags.
fn proxy_from_args(spec: &str, args: &Args) -> Result<ProxyServer> {
    let (host, port) = parse_host_port(spec)?;
    let version = if args.socks4 {
        SocksVersion::V4
    } else {
        SocksVersion::V5
    };
    let mut server = ProxyServer::new(host, port, version)?;
    match version {
        SocksVersion::V5 => {
            if let (Some(user), Some(pass)) = (&args.username, &args.password) {
                server = server.with_auth(user, pass)?;
            }
        }
        SocksVersion::V4 => {
            if let Some(user) = &args.username {
                server = server.with_userid(user)?;
            }
        }
    }
    Ok(server)
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let mut cfg = config::Config::new();
    cfg.merge(config::File::from_str(
        SKIFF_DEFAULTS,
        config::FileFormat::Toml,
    ))?;
    for f in &args.rc {
        cfg.merge(config::File::with_name(f))?;
    }
    let config: SkiffConfig = cfg.try_into()?;

    let level = if config.trace {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let proxies: Vec<ProxyServer> = match &args.proxy {
        Some(spec) => vec![proxy_from_args(spec, &args)?],
        None => config
            .proxy
            .iter()
            .map(ProxyConfig::to_server)
            .collect::<Result<Vec<_>>>()?,
    };
    if proxies.is_empty() {
        bail!("no proxy configured; use -p host:port or a configuration file");
    }

    let target = TargetAddr::new(&args.host, args.port)?;
    let timeout = Duration::from_millis(config.timeout_ms);

    let runtime = skiff_rtcompat::tokio::create_runtime()?;
    let rt = runtime.clone();
    runtime.block_on(async move {
        let tunnel = if proxies.len() == 1 {
            let proxy = proxies.into_iter().next().expect("length checked above");
            let options = HandshakeOptions::new(proxy, target)?.with_timeout(timeout);
            match establish(&rt, &options).await? {
                Established::Ready(tunnel) => tunnel,
                Established::Bound(_) => unreachable!("CONNECT never binds"),
            }
        } else {
            let options = ChainOptions::new(proxies, target)?
                .with_timeout(timeout)
                .with_randomized_order(config.shuffle);
            establish_chain(&rt, &options).await?
        };
        if let Some(peer) = tunnel.peer_addr() {
            info!("tunnel established (proxy reports {})", peer);
        } else {
            info!("tunnel established");
        }
        pipe::splice(tunnel).await
    })
}
