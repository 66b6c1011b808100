//! Declare an error type for skiff_socksproto

use crate::msg::{Socks4Status, SocksStatus};
use thiserror::Error;

/// An error that occurs while negotiating a SOCKS handshake with a
/// proxy.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The proxy's response didn't follow the SOCKS protocol.
    ///
    /// (Or, possibly, we didn't account for its behavior.)
    #[error("SOCKS protocol syntax violation")]
    Syntax,

    /// A response carried a protocol version number other than the
    /// one we were speaking.
    #[error("unexpected SOCKS protocol version {0} in response")]
    BadProtocol(u8),

    /// The SOCKS5 proxy accepted none of the authentication methods
    /// we offered, or selected one that we did not offer.
    #[error("no acceptable authentication method")]
    NoAcceptedAuth,

    /// The SOCKS5 proxy rejected our username/password credentials.
    #[error("authentication rejected by proxy")]
    AuthRejected,

    /// The SOCKS5 proxy refused our request.
    #[error("request rejected by proxy: {0}")]
    Rejected(SocksStatus),

    /// The SOCKS4 proxy refused our request.
    #[error("request rejected by proxy: {0}")]
    RejectedV4(Socks4Status),

    /// We were asked to negotiate a combination of features that the
    /// requested protocol version cannot express.
    #[error("SOCKS feature not supported")]
    NoSupport,

    /// Tried to progress the SOCKS handshake when it was already
    /// finished or failed.  This is a programming error.
    #[error("SOCKS handshake was finished; no need to call this again")]
    AlreadyFinished,

    /// Something went wrong with the programming of this module.
    #[error("internal programming error while handling SOCKS handshake")]
    Internal,
}

impl From<skiff_bytes::Error> for Error {
    fn from(e: skiff_bytes::Error) -> Error {
        use skiff_bytes::Error as E;
        match e {
            // The handshake confirms byte counts before it parses, so
            // running dry mid-parse means our own accounting is wrong.
            E::Truncated => Error::Internal,
            _ => Error::Syntax,
        }
    }
}
