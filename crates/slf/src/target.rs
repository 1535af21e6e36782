//! Destination memory for the loader.
//!
//! The loader writes segments through [`TargetMemory`] rather than raw
//! pointers, so the same load path serves real target RAM, a staging
//! buffer, or a test harness.

/// Writable memory the loader places segments into.
pub trait TargetMemory {
    /// Returns the writable window for `size` bytes at target address
    /// `addr`, or `None` when the region is not entirely within this
    /// memory.
    fn region_mut(&mut self, addr: u32, size: u32) -> Option<&mut [u8]>;
}

/// A contiguous RAM region backed by a host buffer.
#[derive(Debug)]
pub struct RamRegion {
    base: u32,
    bytes: Vec<u8>,
}

impl RamRegion {
    /// Creates a zero-filled region of `size` bytes starting at target
    /// address `base`.
    #[must_use]
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0; size],
        }
    }

    /// Returns the region's base target address.
    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Returns the region's contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the region's contents mutably.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl TargetMemory for RamRegion {
    fn region_mut(&mut self, addr: u32, size: u32) -> Option<&mut [u8]> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(size as usize)?;
        self.bytes.get_mut(start..end)
    }
}
