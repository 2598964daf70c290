//! Splitting a read buffer into individual event records.

use crate::event::RawEvent;
use thiserror::Error;

/// Error type for record stream violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A non-empty read returned fewer bytes than one record header.
    #[error("short read: got {len} bytes, expected at least {}", RawEvent::HEADER_SIZE)]
    ShortRead {
        /// Number of bytes actually delivered.
        len: usize,
    },
}

/// One complete record from a read buffer.
///
/// Only [`Records`] hands these out, so the header and the full name field
/// are always present.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    header: RawEvent,
    bytes: &'a [u8],
}

impl<'a> Record<'a> {
    /// The parsed fixed-size header.
    #[must_use]
    pub const fn header(&self) -> &RawEvent {
        &self.header
    }

    /// The name field, padding included.
    #[must_use]
    pub fn name_bytes(&self) -> &'a [u8] {
        &self.bytes[RawEvent::HEADER_SIZE..]
    }

    /// The whole record as it appeared in the buffer.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Lazy iterator over the records packed into one read buffer.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Records<'a> {
    /// Bytes not yet yielded. Non-empty after iteration ends only when the
    /// buffer finished with a truncated record.
    #[must_use]
    pub fn remainder(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.remainder();
        let header = RawEvent::from_bytes(rest)?;
        let bytes = rest.get(..header.total_size()?)?;

        self.pos += bytes.len();
        Some(Record { header, bytes })
    }
}

/// Segment the bytes returned by a single read.
///
/// An empty buffer yields no records. A non-empty buffer smaller than one
/// header cannot hold anything meaningful and is rejected. A record cut off
/// at the end of the buffer stops iteration; it is never reassembled with a
/// later read.
pub fn segment(buf: &[u8]) -> Result<Records<'_>, ProtocolError> {
    if !buf.is_empty() && buf.len() < RawEvent::HEADER_SIZE {
        return Err(ProtocolError::ShortRead { len: buf.len() });
    }

    Ok(Records { buf, pos: 0 })
}
