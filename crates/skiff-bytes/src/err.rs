//! Internal: error type for decoding failures.

use thiserror::Error;

/// Error type for decoding SOCKS objects from bytes.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The object is truncated, or not fully present yet.
    #[error("object truncated (or not fully present)")]
    Truncated,
    /// The object was decoded, but bytes were left over.
    #[error("extra bytes at end of object")]
    ExtraneousBytes,
    /// The bytes cannot represent the requested object.
    #[error("bad object: {0}")]
    BadMessage(&'static str),
    /// An assumption inside this crate was violated.
    #[error("internal programming error")]
    Internal,
}
