//! libretro core hosting
//!
//! This crate loads libretro cores, answers their environment requests and
//! routes their audio, video and input callbacks to pluggable
//! [`Components`]. It also exposes the core's memory for inspection.

mod callbacks;
pub mod components;
mod environment;
pub mod ffi;
pub mod host;
pub mod memory_map;
pub mod module;
pub mod regions;
pub mod types;

pub use components::{
    Audio, Components, CoreConfig, Input, Loader, LogLevel, Logger, Video, VideoFrame,
};
pub use host::{CoreHost, LifecycleState, AUDIO_BUFFER_SAMPLES, MAX_RUNS_PER_STEP};
pub use memory_map::{CanonicalizeError, MemoryDescriptor, MemoryFlags, MemoryMap};
pub use module::{CoreApi, NativeModule};
pub use regions::{MemoryBlock, MemoryRegion, Platform};
pub use types::{
    ControllerDescription, ControllerInfo, Geometry, InputDescriptor, PixelFormat,
    SubsystemInfo, SubsystemMemoryInfo, SubsystemRomInfo, SystemAvInfo, SystemInfo, Timing,
    Variable,
};
