//! `skiff-bytes`: Utilities to decode/encode things into bytes.
//!
//! # Overview
//!
//! This crate is part of skiff, a SOCKS tunneling suite for routing
//! interactive file-transfer sessions through proxies.  The other
//! skiff crates use it to build and parse the byte-encoded frames of
//! the SOCKS protocol.
//!
//! It is generally useful for byte-oriented formats that are too
//! irregular for serde but too simple to deserve a full parsing
//! framework, and it is only meant for objects that fit comfortably
//! in memory.
//!
//! # Contents and concepts
//!
//! This crate is structured around five key types:
//!
//! * [`Reader`]: A view of a byte slice, from which data can be decoded.
//! * [`ByteQueue`]: An owned, append-only accumulator with a read
//!   cursor, for protocols whose input arrives in arbitrary fragments.
//! * [`Writer`]: Trait to represent a growable buffer of bytes.
//!   (`Vec<u8>` and [`bytes::BytesMut`] implement this.)
//! * [`Writeable`]: Trait for an object that can be encoded onto a [`Writer`].
//! * [`Readable`]: Trait for an object that can be decoded from a [`Reader`].
//!
//! Unlike the Read/Write traits in std::io, none of these types
//! perform I/O or report I/O failures: they handle bytes that are
//! already in memory, and the only things that can go wrong are
//! running out of input or meeting ill-formed input.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]

mod err;
mod impls;
mod queue;
mod reader;
mod writer;

pub use err::Error;
pub use queue::ByteQueue;
pub use reader::Reader;
pub use writer::Writer;

/// Result type returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for an object that can be encoded onto a Writer by reference.
///
/// Implement this trait in order to make an object writeable.
///
/// Most code won't need to call this directly, but will instead use
/// it implicitly via the Writer::write() method.
///
/// # Example
///
/// ```
/// use skiff_bytes::{Writeable, Writer};
/// #[derive(Debug, Eq, PartialEq)]
/// struct Endpoint {
///   port: u16,
///   proto: u8,
/// }
///
/// impl Writeable for Endpoint {
///     fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
///         // An "Endpoint" is encoded as a port, then a protocol.
///         b.write_u16(self.port);
///         b.write_u8(self.proto);
///     }
/// }
///
/// let e = Endpoint { port: 1080, proto: 5 };
/// let mut writer: Vec<u8> = Vec::new();
/// writer.write(&e);
/// assert_eq!(writer, &[0x04, 0x38, 0x05]);
/// ```
pub trait Writeable {
    /// Encode this object into the writer `b`.
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B);
}

/// Trait for an object that can be extracted from a Reader.
///
/// Implement this trait in order to make an object that can (maybe)
/// be decoded from a reader.
///
/// Most code won't need to call this directly, but will instead use
/// it implicitly via the Reader::extract() method.
///
/// # Example
///
/// ```
/// use skiff_bytes::{Readable, Reader, Result};
/// #[derive(Debug, Eq, PartialEq)]
/// struct Endpoint {
///   port: u16,
///   proto: u8,
/// }
///
/// impl Readable for Endpoint {
///     fn take_from(r: &mut Reader<'_>) -> Result<Self> {
///         let port = r.take_u16()?;
///         let proto = r.take_u8()?;
///         Ok(Endpoint { port, proto })
///     }
/// }
///
/// let encoded = [0x04, 0x38, 0x05];
/// let mut reader = Reader::from_slice(&encoded);
/// let e: Endpoint = reader.extract()?;
/// assert_eq!(e, Endpoint { port: 1080, proto: 5 });
/// reader.should_be_exhausted()?;
/// # Result::Ok(())
/// ```
pub trait Readable: Sized {
    /// Try to extract an object of this type from a Reader.
    fn take_from(b: &mut Reader<'_>) -> Result<Self>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn writer() {
        let mut v: Vec<u8> = Vec::new();
        v.write_u8(0x05);
        v.write_u16(0x0150);
        v.write_u32(0x5db8d822);
        v.write_all(b"example.com");
        v.write_zeros(2);
        assert_eq!(
            &v[..],
            &b"\x05\x01\x50\x5d\xb8\xd8\x22example.com\0\0"[..]
        );
    }
}
