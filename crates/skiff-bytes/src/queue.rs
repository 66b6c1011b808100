//! Internal: Declare the ByteQueue type for skiff-bytes

use crate::{Error, Result};

/// An owned, append-only byte accumulator with a read cursor.
///
/// A [`crate::Reader`] borrows a complete slice; a `ByteQueue` instead
/// collects input that arrives in arbitrary fragments, and lets the
/// caller inspect or consume a prefix once enough of it is present.
/// It has no knowledge of any protocol: deciding *when* enough bytes
/// are buffered is the caller's job, and calling [`ByteQueue::peek`]
/// or [`ByteQueue::take`] early is reported as [`Error::Truncated`]
/// without consuming anything.
///
/// # Example
///
/// ```
/// use skiff_bytes::ByteQueue;
/// let mut q = ByteQueue::new();
/// q.append(b"\x05\x00ex");
/// assert_eq!(q.len(), 4);
/// assert_eq!(q.peek(2).unwrap(), b"\x05\x00");
/// q.advance(2).unwrap();
/// q.append(b"tra");
/// assert_eq!(q.take(5).unwrap(), b"extra");
/// assert!(q.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ByteQueue {
    /// Accumulated bytes, including an already-consumed prefix.
    buf: Vec<u8>,
    /// Index of the first unread byte in `buf`.
    start: usize,
}

/// Once the consumed prefix grows past this many bytes, `append`
/// shifts the unread tail down to reclaim the space.
const COMPACT_THRESHOLD: usize = 4096;

impl ByteQueue {
    /// Construct a new, empty ByteQueue.
    pub fn new() -> Self {
        ByteQueue::default()
    }

    /// Return the number of unread bytes in this queue.
    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Return true if there are no unread bytes in this queue.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `bytes` at the end of this queue.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        } else if self.start > COMPACT_THRESHOLD {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Try to return the next `n` unread bytes without consuming them.
    ///
    /// If fewer than `n` bytes are unread, returns
    /// Err(Error::Truncated).
    pub fn peek(&self, n: usize) -> Result<&[u8]> {
        if self.len() < n {
            return Err(Error::Truncated);
        }
        Ok(&self.buf[self.start..self.start + n])
    }

    /// Skip the next `n` unread bytes.
    ///
    /// If fewer than `n` bytes are unread, returns
    /// Err(Error::Truncated) and consumes nothing.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if self.len() < n {
            return Err(Error::Truncated);
        }
        self.start += n;
        Ok(())
    }

    /// Try to consume and return the next `n` unread bytes.
    ///
    /// If fewer than `n` bytes are unread, returns
    /// Err(Error::Truncated) and consumes nothing.
    pub fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.len() < n {
            return Err(Error::Truncated);
        }
        let start = self.start;
        self.start += n;
        Ok(&self.buf[start..start + n])
    }

    /// Consume this queue, returning any unread bytes.
    pub fn into_rest(mut self) -> Vec<u8> {
        if self.start == 0 {
            self.buf
        } else {
            self.buf.split_off(self.start)
        }
    }
}
