//! Named memory regions of well-known platforms
//!
//! Regions are located through the core's memory map when it describes every
//! block of the platform, and through `retro_get_memory_data` otherwise.

use crate::ffi::{RETRO_MEMORY_SAVE_RAM, RETRO_MEMORY_SYSTEM_RAM};
use crate::memory_map::MemoryMap;
use crate::types::SystemInfo;
use hh_memory::Snapshot;
use std::fmt;

/// SMS cores expose more work RAM than the console has
const SMS_WORK_RAM_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Nes,
    Snes,
    Sms,
    Other,
}

/// A memory area every core of a platform is expected to expose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlock {
    /// `RETRO_MEMORY_*` id used when the memory map is unavailable
    pub id: u32,
    /// Address of the block in the emulated address space
    pub base: u32,
    pub name: &'static str,
}

const NES_BLOCKS: &[MemoryBlock] = &[
    MemoryBlock {
        id: RETRO_MEMORY_SYSTEM_RAM,
        base: 0x0000,
        name: "Work RAM",
    },
    MemoryBlock {
        id: RETRO_MEMORY_SAVE_RAM,
        base: 0x6000,
        name: "Save RAM",
    },
];

const SNES_BLOCKS: &[MemoryBlock] = &[
    MemoryBlock {
        id: RETRO_MEMORY_SYSTEM_RAM,
        base: 0x000000,
        name: "Work RAM",
    },
    MemoryBlock {
        id: RETRO_MEMORY_SAVE_RAM,
        base: 0x700000,
        name: "Save RAM",
    },
];

const SMS_BLOCKS: &[MemoryBlock] = &[MemoryBlock {
    id: RETRO_MEMORY_SYSTEM_RAM,
    base: 0xC000,
    name: "Work RAM",
}];

const OTHER_BLOCKS: &[MemoryBlock] = &[
    MemoryBlock {
        id: RETRO_MEMORY_SYSTEM_RAM,
        base: 0,
        name: "System RAM",
    },
    MemoryBlock {
        id: RETRO_MEMORY_SAVE_RAM,
        base: 0,
        name: "Save RAM",
    },
];

impl Platform {
    /// Guess the emulated platform from the core's library name
    pub fn identify(info: &SystemInfo) -> Self {
        match info.library_name.as_str() {
            "bnes" | "emux nes" | "FCEUmm" | "Nestopia" | "QuickNES" => Self::Nes,
            "bsnes" | "bSNES" | "bsnes-mercury" | "Snes9x" | "Snes9x 2005" | "Snes9x 2010"
            | "Mednafen bSNES" => Self::Snes,
            "Genesis Plus GX" | "PicoDrive" => Self::Sms,
            _ => Self::Other,
        }
    }

    pub fn blocks(self) -> &'static [MemoryBlock] {
        match self {
            Self::Nes => NES_BLOCKS,
            Self::Snes => SNES_BLOCKS,
            Self::Sms => SMS_BLOCKS,
            Self::Other => OTHER_BLOCKS,
        }
    }

    /// Whether the memory map may be used to locate the blocks
    fn uses_memory_map(self) -> bool {
        self != Self::Other
    }

    fn clamp(self, block: &MemoryBlock, len: usize) -> usize {
        match self {
            Self::Sms if block.base == 0xC000 => len.min(SMS_WORK_RAM_SIZE),
            _ => len,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nes => "NES",
            Self::Snes => "SNES",
            Self::Sms => "Master System",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Core memory exposed under a name, valid while the host is not stepped
pub struct MemoryRegion<'host> {
    name: &'static str,
    base: u32,
    data: &'host [u8],
}

impl<'host> MemoryRegion<'host> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &'host [u8] {
        self.data
    }

    /// Copy the current contents
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.base, self.data)
    }
}

impl fmt::Debug for MemoryRegion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRegion")
            .field("name", &self.name)
            .field("base", &format_args!("0x{:06X}", self.base))
            .field("len", &self.data.len())
            .finish()
    }
}

/// # Safety
///
/// `ptr` must be valid for reads of `len` bytes for `'host`.
unsafe fn region<'host>(block: &MemoryBlock, ptr: *const u8, len: usize) -> MemoryRegion<'host> {
    MemoryRegion {
        name: block.name,
        base: block.base,
        data: unsafe { std::slice::from_raw_parts(ptr, len) },
    }
}

/// Locate every block in the memory map, `None` if any is missing
///
/// # Safety
///
/// Descriptor pointers in `map` must stay valid for `'host`.
pub(crate) unsafe fn from_memory_map<'host>(
    platform: Platform,
    map: &MemoryMap,
) -> Option<Vec<MemoryRegion<'host>>> {
    if !platform.uses_memory_map() || map.is_empty() {
        return None;
    }

    platform
        .blocks()
        .iter()
        .map(|block| {
            let desc = map.find_start(block.base as usize)?;
            if desc.ptr.is_null() {
                return None;
            }
            let len = platform.clamp(block, desc.len);
            Some(unsafe { region(block, desc.ptr.add(desc.offset), len) })
        })
        .collect()
}

/// Locate every block through `memory(id)`, `None` if any is missing
///
/// # Safety
///
/// Pointers returned by `memory` must stay valid for `'host`.
pub(crate) unsafe fn from_memory_ids<'host>(
    platform: Platform,
    memory: impl Fn(u32) -> Option<(*mut u8, usize)>,
) -> Option<Vec<MemoryRegion<'host>>> {
    platform
        .blocks()
        .iter()
        .map(|block| {
            let (ptr, len) = memory(block.id)?;
            let len = platform.clamp(block, len);
            Some(unsafe { region(block, ptr, len) })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_map::MemoryDescriptor;

    fn info(name: &str) -> SystemInfo {
        SystemInfo {
            library_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_identify() {
        assert_eq!(Platform::identify(&info("QuickNES")), Platform::Nes);
        assert_eq!(Platform::identify(&info("Snes9x 2010")), Platform::Snes);
        assert_eq!(Platform::identify(&info("Genesis Plus GX")), Platform::Sms);
        assert_eq!(Platform::identify(&info("mGBA")), Platform::Other);
        assert_eq!(Platform::identify(&info("snes9x")), Platform::Other);
    }

    #[test]
    fn test_memory_map_lookup() {
        let mut wram = vec![0u8; 0x800];
        let mut sram = vec![0u8; 0x2000];
        wram[3] = 7;

        let map = MemoryMap::new(&[
            MemoryDescriptor {
                ptr: wram.as_mut_ptr(),
                start: 0,
                len: 0x800,
                ..Default::default()
            },
            MemoryDescriptor {
                ptr: sram.as_mut_ptr(),
                start: 0x6000,
                len: 0x2000,
                ..Default::default()
            },
        ])
        .unwrap();

        let regions = unsafe { from_memory_map(Platform::Nes, &map) }.unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name(), "Work RAM");
        assert_eq!(regions[0].len(), 0x800);
        assert_eq!(regions[0].bytes()[3], 7);
        assert_eq!(regions[1].base(), 0x6000);

        // SNES blocks are not in this map
        assert!(unsafe { from_memory_map(Platform::Snes, &map) }.is_none());
        assert!(unsafe { from_memory_map(Platform::Other, &map) }.is_none());
    }

    #[test]
    fn test_memory_id_lookup_clamps_sms() {
        let mut ram = vec![1u8; 0x10000];
        let ptr = ram.as_mut_ptr();

        let regions = unsafe {
            from_memory_ids(Platform::Sms, |id| (id == RETRO_MEMORY_SYSTEM_RAM).then_some((ptr, 0x10000)))
        }
        .unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].len(), SMS_WORK_RAM_SIZE);
        assert_eq!(regions[0].snapshot().address(), 0xC000);

        // NES also wants save RAM
        assert!(unsafe {
            from_memory_ids(Platform::Nes, |id| (id == RETRO_MEMORY_SYSTEM_RAM).then_some((ptr, 0x800)))
        }
        .is_none());
    }
}
