//! Positional reader over received message bytes.

use bytes::Bytes;

use crate::status::{Result, Status};
use crate::vector::BinVector;

/// Cursored read view of one message. All reads advance the cursor; any
/// read past the end fails with `ErrorOverflow` and leaves the cursor
/// where it was.
#[derive(Debug, Default, Clone)]
pub struct BinWalker {
    data: Bytes,
    pos: usize,
}

impl BinWalker {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Current read offset.
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Move the cursor. Seeking past the end is allowed; the next read
    /// fails instead.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Borrow the next `n` bytes and advance.
    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        if n > self.remaining() {
            return Err(Status::ErrorOverflow);
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..start + n])
    }

    /// Read exactly `N` bytes into a fixed array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Fill the destination slice from the cursor.
    pub fn read_into(&mut self, dest: &mut [u8]) -> Result {
        let src = self.read_bytes(dest.len())?;
        dest.copy_from_slice(src);
        Ok(())
    }
}

impl From<Vec<u8>> for BinWalker {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&BinVector> for BinWalker {
    fn from(vec: &BinVector) -> Self {
        Self::new(Bytes::copy_from_slice(vec.data()))
    }
}
