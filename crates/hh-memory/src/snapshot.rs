//! Point-in-time memory snapshots

use crate::search::{self, Encoding, Operator, Width};
use crate::set::AddressSet;
use std::sync::Arc;

/// Immutable copy of a memory region, tagged with its base address
///
/// Cloning is cheap; clones share the captured bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    address: u32,
    bytes: Arc<[u8]>,
}

impl Snapshot {
    /// Copy `bytes` into a new snapshot based at `address`
    pub fn capture(address: u32, bytes: &[u8]) -> Self {
        Self {
            address,
            bytes: Arc::from(bytes),
        }
    }

    /// Copy `size` bytes starting at `source`
    ///
    /// # Safety
    ///
    /// `source` must be valid for reads of `size` bytes for the duration of
    /// the call. A null `source` or zero `size` yields an empty snapshot.
    pub unsafe fn capture_raw(address: u32, source: *const u8, size: usize) -> Self {
        if source.is_null() || size == 0 {
            return Self::capture(address, &[]);
        }

        // SAFETY: guaranteed by the caller
        let bytes = unsafe { std::slice::from_raw_parts(source, size) };
        Self::capture(address, bytes)
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Addresses whose value compares true against `constant`
    pub fn filter(&self, width: Width, encoding: Encoding, op: Operator, constant: u32) -> AddressSet {
        let offsets = search::scan_constant(&self.bytes, width, encoding, op, constant);
        self.to_addresses(offsets)
    }

    /// Addresses whose value compares true against the value at the same
    /// address in `other`
    ///
    /// Returns an empty set when the snapshots differ in base address or size.
    pub fn filter_snapshot(
        &self,
        width: Width,
        encoding: Encoding,
        op: Operator,
        other: &Snapshot,
    ) -> AddressSet {
        if self.address != other.address || self.size() != other.size() {
            tracing::debug!(
                "Snapshot mismatch: 0x{:08X}/{} vs 0x{:08X}/{}",
                self.address,
                self.size(),
                other.address,
                other.size()
            );
            return AddressSet::new();
        }

        let offsets = search::scan_pair(&self.bytes, &other.bytes, width, encoding, op);
        self.to_addresses(offsets)
    }

    fn to_addresses(&self, offsets: Vec<usize>) -> AddressSet {
        let wraps = self.address as u64 + self.size() as u64 > u64::from(u32::MAX) + 1;
        let addresses = offsets
            .into_iter()
            .map(|offset| self.address.wrapping_add(offset as u32))
            .collect();

        if wraps {
            AddressSet::from_unsorted(addresses)
        } else {
            AddressSet::from_sorted(addresses)
        }
    }
}
