//! Fixed-region serialization sink.

use crate::status::{Result, Status};
use crate::vector::SerSink;

/// Byte sink over a caller-supplied region. Writing past the end of the
/// region fails with `ErrorNoMemory` instead of growing, which makes
/// encoding memory-constant: useful in allocation-free environments and
/// for exercising out-of-memory paths in tests.
#[derive(Debug)]
pub struct KeeperVector<'a> {
    region: &'a mut [u8],
    len: usize,
}

impl<'a> KeeperVector<'a> {
    pub fn new(region: &'a mut [u8]) -> Self {
        Self { region, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// How many whole elements of `elem_size` bytes the region can hold.
    /// Scaling truncates: a region viewed at a wider element size loses the
    /// trailing partial element.
    pub fn element_capacity(&self, elem_size: usize) -> usize {
        if elem_size == 0 {
            return 0;
        }
        self.region.len() / elem_size
    }

    pub fn data(&self) -> &[u8] {
        &self.region[..self.len]
    }
}

impl SerSink for KeeperVector<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result {
        let end = self.len.checked_add(bytes.len()).ok_or(Status::ErrorNoMemory)?;
        if end > self.region.len() {
            return Err(Status::ErrorNoMemory);
        }
        self.region[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}
