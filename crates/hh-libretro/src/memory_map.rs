//! Memory map canonicalization
//!
//! Cores describe their address space with descriptors that may leave
//! `select`, `len` or `disconnect` partially specified. Canonicalization
//! fills them in so that for every descriptor:
//!
//! * an address `a` belongs to it iff `a & select == start`
//! * its byte offset is `offset + reduce(a & !select, disconnect)`
//!
//! A single bad descriptor rejects the whole map.

use crate::ffi::{retro_memory_descriptor, retro_memory_map};
use crate::types::{c_slice, c_string};
use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// `RETRO_MEMDESC_*` flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryFlags: u64 {
        const CONST = 1 << 0;
        const BIGENDIAN = 1 << 1;
        const SYSTEM_RAM = 1 << 2;
        const SAVE_RAM = 1 << 3;
        const VIDEO_RAM = 1 << 4;
        const ALIGN_2 = 1 << 16;
        const ALIGN_4 = 2 << 16;
        const ALIGN_8 = 3 << 16;
        const MINSIZE_2 = 1 << 24;
        const MINSIZE_4 = 2 << 24;
        const MINSIZE_8 = 3 << 24;
    }
}

impl MemoryFlags {
    /// Required access alignment in bytes
    pub fn alignment(self) -> u32 {
        1 << ((self.bits() >> 16) & 3)
    }

    /// Minimum access size in bytes
    pub fn min_size(self) -> u32 {
        1 << ((self.bits() >> 24) & 3)
    }

    /// Compact form for logs, e.g. `M1A2bc`
    pub fn summary(self) -> String {
        format!(
            "M{}A{}{}{}",
            self.min_size(),
            self.alignment(),
            if self.contains(Self::BIGENDIAN) { 'B' } else { 'b' },
            if self.contains(Self::CONST) { 'C' } else { 'c' },
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizeError {
    #[error("descriptor {index}: length 0x{len:X} must be a power of two when select is missing")]
    LengthNotPowerOfTwo { index: usize, len: usize },

    #[error("descriptor {index}: start 0x{start:X} has bits outside select 0x{select:X}")]
    StartOutsideSelect {
        index: usize,
        start: usize,
        select: usize,
    },

    #[error("descriptor {index}: cannot fit the address range into length 0x{len:X}")]
    DisconnectOverflow { index: usize, len: usize },

    #[error("descriptor {index}: derived length does not fit in the address space")]
    LengthOverflow { index: usize },
}

/// One region of the emulated address space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDescriptor {
    pub flags: MemoryFlags,
    /// Host pointer to the backing memory, may be null
    pub ptr: *mut u8,
    pub offset: usize,
    pub start: usize,
    pub select: usize,
    pub disconnect: usize,
    pub len: usize,
    pub addrspace: String,
}

impl Default for MemoryDescriptor {
    fn default() -> Self {
        Self {
            flags: MemoryFlags::empty(),
            ptr: std::ptr::null_mut(),
            offset: 0,
            start: 0,
            select: 0,
            disconnect: 0,
            len: 0,
            addrspace: String::new(),
        }
    }
}

impl MemoryDescriptor {
    /// # Safety
    ///
    /// `raw.addrspace` must be null or a valid C string.
    pub(crate) unsafe fn from_raw(raw: &retro_memory_descriptor) -> Self {
        Self {
            flags: MemoryFlags::from_bits_retain(raw.flags),
            ptr: raw.ptr.cast(),
            offset: raw.offset,
            start: raw.start,
            select: raw.select,
            disconnect: raw.disconnect,
            len: raw.len,
            addrspace: unsafe { c_string(raw.addrspace) },
        }
    }

    pub fn contains(&self, address: usize) -> bool {
        address & self.select == self.start
    }

    /// Byte offset of `address` in the backing memory
    ///
    /// Mirrors that survive the disconnect mask are folded back into `len`.
    pub fn offset_of(&self, address: usize) -> usize {
        let mut offset = reduce(address & !self.select, self.disconnect);
        while self.len != 0 && offset >= self.len {
            offset -= highest_bit(offset);
        }
        self.offset + offset
    }
}

/// A canonical set of memory descriptors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryMap {
    descriptors: Vec<MemoryDescriptor>,
}

impl MemoryMap {
    /// Copy and canonicalize a map handed over by a core
    ///
    /// # Safety
    ///
    /// `raw.descriptors` must be valid for `raw.num_descriptors` entries.
    pub(crate) unsafe fn from_raw(raw: &retro_memory_map) -> Result<Self, CanonicalizeError> {
        let descriptors: Vec<MemoryDescriptor> =
            unsafe { c_slice(raw.descriptors, raw.num_descriptors as usize) }
                .iter()
                .map(|d| unsafe { MemoryDescriptor::from_raw(d) })
                .collect();
        Self::new(&descriptors)
    }

    pub fn new(descriptors: &[MemoryDescriptor]) -> Result<Self, CanonicalizeError> {
        Ok(Self {
            descriptors: canonicalize(descriptors)?,
        })
    }

    pub fn descriptors(&self) -> &[MemoryDescriptor] {
        &self.descriptors
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptor whose region starts exactly at `start`
    pub fn find_start(&self, start: usize) -> Option<&MemoryDescriptor> {
        self.descriptors.iter().find(|d| d.start == start)
    }

    /// Index of the first descriptor containing `address` and the offset in it
    pub fn translate(&self, address: usize) -> Option<(usize, usize)> {
        self.descriptors
            .iter()
            .position(|d| d.contains(address))
            .map(|index| (index, self.descriptors[index].offset_of(address)))
    }
}

/// Set every bit below the highest set bit
pub fn add_bits_down(mut n: usize) -> usize {
    let mut shift = 1;
    while shift < usize::BITS {
        n |= n >> shift;
        shift <<= 1;
    }
    n
}

/// Insert a zero into `address` at every set bit of `mask`
pub fn inflate(mut address: usize, mut mask: usize) -> usize {
    while mask != 0 {
        let low = (mask - 1) & !mask;
        address = ((address & !low) << 1) | (address & low);
        mask &= mask - 1;
    }
    address
}

/// Remove the bits of `address` at every set bit of `mask`
pub fn reduce(mut address: usize, mut mask: usize) -> usize {
    while mask != 0 {
        let low = (mask - 1) & !mask;
        address = (address & low) | ((address >> 1) & !low);
        mask = (mask & (mask - 1)) >> 1;
    }
    address
}

pub fn highest_bit(n: usize) -> usize {
    let n = add_bits_down(n);
    n ^ (n >> 1)
}

/// Fill in the missing fields of a batch of descriptors
pub fn canonicalize(input: &[MemoryDescriptor]) -> Result<Vec<MemoryDescriptor>, CanonicalizeError> {
    let mut descriptors = input.to_vec();

    let mut top_addr = 1usize;
    for desc in &descriptors {
        top_addr |= if desc.select != 0 {
            desc.select
        } else {
            desc.start.wrapping_add(desc.len).wrapping_sub(1)
        };
    }
    let top_addr = add_bits_down(top_addr);

    for (index, desc) in descriptors.iter_mut().enumerate() {
        if desc.select == 0 {
            if !desc.len.is_power_of_two() {
                return Err(CanonicalizeError::LengthNotPowerOfTwo {
                    index,
                    len: desc.len,
                });
            }
            desc.select = top_addr & !inflate(add_bits_down(desc.len - 1), desc.disconnect);
        }

        // A derived select always has a power of two length, so only a
        // supplied select can leave len at 0 here
        if desc.len == 0 {
            desc.len = add_bits_down(reduce(top_addr & !desc.select, desc.disconnect))
                .checked_add(1)
                .ok_or(CanonicalizeError::LengthOverflow { index })?;
        }

        if desc.start & !desc.select != 0 {
            return Err(CanonicalizeError::StartOutsideSelect {
                index,
                start: desc.start,
                select: desc.select,
            });
        }

        // Every pass claims a new bit of top_addr & !select and the loop ends
        // once none is left, so the cap below is never the deciding exit
        let mut grown = 0;
        while reduce(top_addr & !desc.select, desc.disconnect) >> 1 > desc.len - 1 {
            let bit = highest_bit(top_addr & !desc.select & !desc.disconnect);
            if bit == 0 || grown == usize::BITS {
                return Err(CanonicalizeError::DisconnectOverflow {
                    index,
                    len: desc.len,
                });
            }
            desc.disconnect |= bit;
            grown += 1;
        }

        let mut mask = add_bits_down(desc.len - 1);
        desc.disconnect &= mask;
        while (!mask >> 1) & desc.disconnect != 0 {
            mask >>= 1;
            desc.disconnect &= mask;
        }
    }

    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(start: usize, select: usize, len: usize) -> MemoryDescriptor {
        MemoryDescriptor {
            start,
            select,
            len,
            ..Default::default()
        }
    }

    #[test]
    fn test_bit_helpers() {
        assert_eq!(add_bits_down(0), 0);
        assert_eq!(add_bits_down(0x4000), 0x7FFF);
        assert_eq!(add_bits_down(usize::MAX), usize::MAX);
        assert_eq!(highest_bit(0x6123), 0x4000);
        assert_eq!(highest_bit(0), 0);
        assert_eq!(inflate(0b1111, 0b0100), 0b11011);
        assert_eq!(reduce(0b11011, 0b0100), 0b1111);
        assert_eq!(reduce(0xFFFF, 0), 0xFFFF);
    }

    #[test]
    fn test_reduce_inverts_inflate() {
        for mask in [0usize, 0x10, 0x1100, 0x8001] {
            for address in [0usize, 1, 0x7F, 0x1234] {
                assert_eq!(reduce(inflate(address, mask), mask), address);
            }
        }
    }

    #[test]
    fn test_two_ram_regions() {
        let map = MemoryMap::new(&[desc(0, 0, 0x800), desc(0x6000, 0, 0x2000)]).unwrap();
        let descs = map.descriptors();

        assert_eq!(descs[0].select, 0x7800);
        assert_eq!(descs[1].select, 0x6000);
        for d in descs {
            assert_eq!(d.start & !d.select, 0);
            assert!(d.len.is_power_of_two());
        }

        for address in 0..0x8000usize {
            let owners = descs.iter().filter(|d| d.contains(address)).count();
            assert!(owners <= 1, "address 0x{:X} claimed {} times", address, owners);
        }

        assert_eq!(map.translate(0x0123), Some((0, 0x123)));
        assert_eq!(map.translate(0x6001), Some((1, 1)));
        assert_eq!(map.translate(0x7FFF), Some((1, 0x1FFF)));
        assert_eq!(map.translate(0x1000), None);
    }

    #[test]
    fn test_offset_within_len() {
        // 2 KiB of RAM mirrored across an 8 KiB window
        let map = MemoryMap::new(&[desc(0, 0xE000, 0x800)]).unwrap();
        let d = &map.descriptors()[0];

        for address in 0..0x2000usize {
            assert!(d.contains(address));
            let offset = d.offset_of(address);
            assert!(offset < d.len);
            assert_eq!(offset, address & 0x7FF);
        }
    }

    #[test]
    fn test_missing_len_is_derived() {
        let map = MemoryMap::new(&[desc(0x8000, 0x8000, 0), desc(0, 0x8000, 0x8000)]).unwrap();
        assert_eq!(map.descriptors()[0].len, 0x8000);
    }

    #[test]
    fn test_offset_is_added() {
        let mut d = desc(0x7E0000, 0xFE0000, 0x20000);
        d.offset = 0x100;
        let map = MemoryMap::new(&[d]).unwrap();
        assert_eq!(map.translate(0x7E0010), Some((0, 0x110)));
        assert!(map.find_start(0x7E0000).is_some());
        assert!(map.find_start(0x7F0000).is_none());
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let err = MemoryMap::new(&[desc(0, 0, 0x800), desc(0x1000, 0, 0x300)]).unwrap_err();
        assert_eq!(
            err,
            CanonicalizeError::LengthNotPowerOfTwo {
                index: 1,
                len: 0x300
            }
        );
        assert!(MemoryMap::new(&[desc(0, 0, 0)]).is_err());
    }

    #[test]
    fn test_rejects_start_outside_select() {
        let err = MemoryMap::new(&[desc(0x1234, 0xF000, 0x1000)]).unwrap_err();
        assert!(matches!(err, CanonicalizeError::StartOutsideSelect { index: 0, .. }));
    }

    #[test]
    fn test_length_overflow_rejected() {
        // The first select spans the whole address space, the second one
        // leaves len to be derived from it
        let err = MemoryMap::new(&[desc(0, usize::MAX, 1), desc(0, 1, 0)]).unwrap_err();
        assert_eq!(err, CanonicalizeError::LengthOverflow { index: 1 });
        assert_eq!(
            err.to_string(),
            "descriptor 1: derived length does not fit in the address space"
        );
    }

    #[test]
    fn test_disconnect_growth_is_bounded() {
        // One byte behind a single select bit, with the top bit claimed by a
        // sibling. Growth has to claim every other address bit.
        let high = 1usize << (usize::BITS - 1);
        let map = MemoryMap::new(&[desc(0, 1, 1), desc(high, high, 1)]).unwrap();

        for d in map.descriptors() {
            assert_eq!(d.len, 1);
            assert_eq!(d.disconnect, 0);
        }
        assert_eq!(map.translate(0x1234_5678), Some((0, 0)));
        assert_eq!(map.translate(usize::MAX), Some((1, 0)));
        assert_eq!(map.translate(0x1234_5679), None);
    }

    #[test]
    fn test_flags_summary() {
        let flags = MemoryFlags::SYSTEM_RAM | MemoryFlags::ALIGN_2 | MemoryFlags::MINSIZE_4;
        assert_eq!(flags.alignment(), 2);
        assert_eq!(flags.min_size(), 4);
        assert_eq!(flags.summary(), "M4A2bc");

        let flags = MemoryFlags::BIGENDIAN | MemoryFlags::CONST | MemoryFlags::ALIGN_8;
        assert_eq!(flags.summary(), "M1A8BC");
    }
}
