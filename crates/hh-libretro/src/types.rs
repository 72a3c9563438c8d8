//! Owned copies of the data a core negotiates with the host
//!
//! Every mirror is copied out of core-owned memory as soon as it is received,
//! so nothing here borrows from the core.

use crate::ffi::*;
use std::ffi::{c_char, CStr};

/// Copy a C string, null pointers become the empty string
///
/// # Safety
///
/// `ptr` must be null or point to a NUL terminated string.
pub(crate) unsafe fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Borrow a counted C array, null or empty arrays become an empty slice
///
/// # Safety
///
/// `ptr` must be null or valid for reads of `count` elements.
pub(crate) unsafe fn c_slice<'a, T>(ptr: *const T, count: usize) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        return &[];
    }
    unsafe { std::slice::from_raw_parts(ptr, count) }
}

/// Borrow a C array that ends at the first element matching `is_end`
///
/// # Safety
///
/// `ptr` must be null or point to an array terminated by such an element.
pub(crate) unsafe fn c_terminated<'a, T>(ptr: *const T, is_end: impl Fn(&T) -> bool) -> &'a [T] {
    if ptr.is_null() {
        return &[];
    }
    let mut count = 0;
    while !is_end(unsafe { &*ptr.add(count) }) {
        count += 1;
    }
    unsafe { std::slice::from_raw_parts(ptr, count) }
}

/// Pixel layout of software-rendered frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// Deprecated libretro default
    #[default]
    Rgb1555,
    Xrgb8888,
    Rgb565,
}

impl PixelFormat {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            RETRO_PIXEL_FORMAT_0RGB1555 => Some(Self::Rgb1555),
            RETRO_PIXEL_FORMAT_XRGB8888 => Some(Self::Xrgb8888),
            RETRO_PIXEL_FORMAT_RGB565 => Some(Self::Rgb565),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb1555 | Self::Rgb565 => 2,
            Self::Xrgb8888 => 4,
        }
    }
}

/// Static information about the loaded core
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemInfo {
    pub library_name: String,
    pub library_version: String,
    /// `|` separated list, without dots
    pub valid_extensions: String,
    pub need_fullpath: bool,
    pub block_extract: bool,
}

impl SystemInfo {
    /// # Safety
    ///
    /// String pointers in `raw` must be null or valid C strings.
    pub(crate) unsafe fn from_raw(raw: &retro_system_info) -> Self {
        unsafe {
            Self {
                library_name: c_string(raw.library_name),
                library_version: c_string(raw.library_version),
                valid_extensions: c_string(raw.valid_extensions),
                need_fullpath: raw.need_fullpath,
                block_extract: raw.block_extract,
            }
        }
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.valid_extensions.split('|').filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub aspect_ratio: f32,
}

impl Geometry {
    /// Replace a non-positive aspect ratio by `base_width / base_height`
    pub fn normalized(mut self) -> Self {
        if self.aspect_ratio <= 0.0 && self.base_height != 0 {
            self.aspect_ratio = self.base_width as f32 / self.base_height as f32;
        }
        self
    }
}

impl From<&retro_game_geometry> for Geometry {
    fn from(raw: &retro_game_geometry) -> Self {
        Self {
            base_width: raw.base_width,
            base_height: raw.base_height,
            max_width: raw.max_width,
            max_height: raw.max_height,
            aspect_ratio: raw.aspect_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timing {
    pub fps: f64,
    pub sample_rate: f64,
}

/// Geometry and timing of the loaded content
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemAvInfo {
    pub geometry: Geometry,
    pub timing: Timing,
}

impl From<&retro_system_av_info> for SystemAvInfo {
    fn from(raw: &retro_system_av_info) -> Self {
        Self {
            geometry: Geometry::from(&raw.geometry),
            timing: Timing {
                fps: raw.timing.fps,
                sample_rate: raw.timing.sample_rate,
            },
        }
    }
}

/// A core option as declared by the core
///
/// `value` has the form `"Description; first|second|third"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub key: String,
    pub value: String,
}

impl Variable {
    /// Human readable part of the declaration
    pub fn description(&self) -> &str {
        self.value.split_once(';').map_or(self.value.as_str(), |(desc, _)| desc.trim())
    }

    /// Allowed values, the first one being the default
    pub fn choices(&self) -> impl Iterator<Item = &str> {
        self.value
            .split_once(';')
            .map_or("", |(_, choices)| choices.trim())
            .split('|')
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    pub port: u32,
    pub device: u32,
    pub index: u32,
    pub id: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerDescription {
    pub desc: String,
    pub id: u32,
}

/// Device types a core accepts on one port
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerInfo {
    pub types: Vec<ControllerDescription>,
}

impl ControllerInfo {
    /// # Safety
    ///
    /// `raw.types` must be valid for `raw.num_types` descriptions.
    pub(crate) unsafe fn from_raw(raw: &retro_controller_info) -> Self {
        let types = unsafe { c_slice(raw.types, raw.num_types as usize) };
        Self {
            types: types
                .iter()
                .map(|t| ControllerDescription {
                    desc: unsafe { c_string(t.desc) },
                    id: t.id,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemMemoryInfo {
    pub extension: String,
    pub memory_type: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemRomInfo {
    pub desc: String,
    pub valid_extensions: String,
    pub need_fullpath: bool,
    pub block_extract: bool,
    pub required: bool,
    pub memory: Vec<SubsystemMemoryInfo>,
}

/// A special content type, loaded through `retro_load_game_special`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemInfo {
    pub desc: String,
    pub ident: String,
    pub roms: Vec<SubsystemRomInfo>,
    pub id: u32,
}

impl SubsystemInfo {
    /// # Safety
    ///
    /// All pointers in `raw` must be valid for their declared counts.
    pub(crate) unsafe fn from_raw(raw: &retro_subsystem_info) -> Self {
        unsafe {
            let roms = c_slice(raw.roms, raw.num_roms as usize)
                .iter()
                .map(|rom| SubsystemRomInfo {
                    desc: c_string(rom.desc),
                    valid_extensions: c_string(rom.valid_extensions),
                    need_fullpath: rom.need_fullpath,
                    block_extract: rom.block_extract,
                    required: rom.required,
                    memory: c_slice(rom.memory, rom.num_memory as usize)
                        .iter()
                        .map(|m| SubsystemMemoryInfo {
                            extension: c_string(m.extension),
                            memory_type: m.type_,
                        })
                        .collect(),
                })
                .collect();

            Self {
                desc: c_string(raw.desc),
                ident: c_string(raw.ident),
                roms,
                id: raw.id,
            }
        }
    }
}
