//! Growable byte sink used for message assembly.

use bytes::BytesMut;

use crate::status::Result;

/// The write surface the codec needs from a serialization sink.
///
/// `BinVector` is the everyday heap-backed implementation;
/// [`KeeperVector`](crate::keeper::KeeperVector) trades growth for a
/// caller-supplied fixed region.
pub trait SerSink {
    /// Append raw bytes. Fails with `ErrorNoMemory` when the sink cannot
    /// take them.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result;

    /// Logical size so far, which is also the offset the next write lands
    /// at. Pointer-map bookkeeping depends on this.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// Append-only byte buffer backing one serialization pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BinVector {
    buf: BytesMut,
}

impl BinVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn push_back(&mut self, byte: u8) {
        self.buf.extend_from_slice(&[byte]);
    }

    pub fn push_back_n(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Transfer the accumulated storage out, leaving the vector empty.
    pub fn release(&mut self) -> BytesMut {
        std::mem::take(&mut self.buf)
    }
}

impl SerSink for BinVector {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn clear(&mut self) {
        self.buf.clear();
    }
}

impl std::ops::Deref for BinVector {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl From<&[u8]> for BinVector {
    fn from(bytes: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(bytes),
        }
    }
}
