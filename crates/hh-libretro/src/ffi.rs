//! libretro ABI definitions
//!
//! Only the subset of `libretro.h` the host negotiates is mirrored here.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_uint, c_void};

pub const RETRO_API_VERSION: c_uint = 1;

// Devices
pub const RETRO_DEVICE_NONE: c_uint = 0;
pub const RETRO_DEVICE_JOYPAD: c_uint = 1;
pub const RETRO_DEVICE_MOUSE: c_uint = 2;
pub const RETRO_DEVICE_KEYBOARD: c_uint = 3;
pub const RETRO_DEVICE_LIGHTGUN: c_uint = 4;
pub const RETRO_DEVICE_ANALOG: c_uint = 5;
pub const RETRO_DEVICE_POINTER: c_uint = 6;

// Memory ids for retro_get_memory_data/size
pub const RETRO_MEMORY_SAVE_RAM: c_uint = 0;
pub const RETRO_MEMORY_RTC: c_uint = 1;
pub const RETRO_MEMORY_SYSTEM_RAM: c_uint = 2;
pub const RETRO_MEMORY_VIDEO_RAM: c_uint = 3;

// Regions
pub const RETRO_REGION_NTSC: c_uint = 0;
pub const RETRO_REGION_PAL: c_uint = 1;

pub const RETRO_LANGUAGE_ENGLISH: c_uint = 0;

// Pixel formats
pub const RETRO_PIXEL_FORMAT_0RGB1555: c_uint = 0;
pub const RETRO_PIXEL_FORMAT_XRGB8888: c_uint = 1;
pub const RETRO_PIXEL_FORMAT_RGB565: c_uint = 2;

// Log levels
pub const RETRO_LOG_DEBUG: c_uint = 0;
pub const RETRO_LOG_INFO: c_uint = 1;
pub const RETRO_LOG_WARN: c_uint = 2;
pub const RETRO_LOG_ERROR: c_uint = 3;

/// Frame pointer value a hardware-rendering core passes instead of pixels
pub const RETRO_HW_FRAME_BUFFER_VALID: *const c_void = usize::MAX as *const c_void;

// Environment commands
pub const RETRO_ENVIRONMENT_EXPERIMENTAL: c_uint = 0x10000;
pub const RETRO_ENVIRONMENT_PRIVATE: c_uint = 0x20000;

pub const RETRO_ENVIRONMENT_SET_ROTATION: c_uint = 1;
pub const RETRO_ENVIRONMENT_GET_OVERSCAN: c_uint = 2;
pub const RETRO_ENVIRONMENT_GET_CAN_DUPE: c_uint = 3;
pub const RETRO_ENVIRONMENT_SET_MESSAGE: c_uint = 6;
pub const RETRO_ENVIRONMENT_SHUTDOWN: c_uint = 7;
pub const RETRO_ENVIRONMENT_SET_PERFORMANCE_LEVEL: c_uint = 8;
pub const RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY: c_uint = 9;
pub const RETRO_ENVIRONMENT_SET_PIXEL_FORMAT: c_uint = 10;
pub const RETRO_ENVIRONMENT_SET_INPUT_DESCRIPTORS: c_uint = 11;
pub const RETRO_ENVIRONMENT_SET_KEYBOARD_CALLBACK: c_uint = 12;
pub const RETRO_ENVIRONMENT_SET_DISK_CONTROL_INTERFACE: c_uint = 13;
pub const RETRO_ENVIRONMENT_SET_HW_RENDER: c_uint = 14;
pub const RETRO_ENVIRONMENT_GET_VARIABLE: c_uint = 15;
pub const RETRO_ENVIRONMENT_SET_VARIABLES: c_uint = 16;
pub const RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE: c_uint = 17;
pub const RETRO_ENVIRONMENT_SET_SUPPORT_NO_GAME: c_uint = 18;
pub const RETRO_ENVIRONMENT_GET_LIBRETRO_PATH: c_uint = 19;
pub const RETRO_ENVIRONMENT_SET_FRAME_TIME_CALLBACK: c_uint = 21;
pub const RETRO_ENVIRONMENT_SET_AUDIO_CALLBACK: c_uint = 22;
pub const RETRO_ENVIRONMENT_GET_RUMBLE_INTERFACE: c_uint = 23;
pub const RETRO_ENVIRONMENT_GET_INPUT_DEVICE_CAPABILITIES: c_uint = 24;
pub const RETRO_ENVIRONMENT_GET_SENSOR_INTERFACE: c_uint = 25 | RETRO_ENVIRONMENT_EXPERIMENTAL;
pub const RETRO_ENVIRONMENT_GET_CAMERA_INTERFACE: c_uint = 26 | RETRO_ENVIRONMENT_EXPERIMENTAL;
pub const RETRO_ENVIRONMENT_GET_LOG_INTERFACE: c_uint = 27;
pub const RETRO_ENVIRONMENT_GET_PERF_INTERFACE: c_uint = 28;
pub const RETRO_ENVIRONMENT_GET_LOCATION_INTERFACE: c_uint = 29;
pub const RETRO_ENVIRONMENT_GET_CORE_ASSETS_DIRECTORY: c_uint = 30;
pub const RETRO_ENVIRONMENT_GET_SAVE_DIRECTORY: c_uint = 31;
pub const RETRO_ENVIRONMENT_SET_SYSTEM_AV_INFO: c_uint = 32;
pub const RETRO_ENVIRONMENT_SET_PROC_ADDRESS_CALLBACK: c_uint = 33;
pub const RETRO_ENVIRONMENT_SET_SUBSYSTEM_INFO: c_uint = 34;
pub const RETRO_ENVIRONMENT_SET_CONTROLLER_INFO: c_uint = 35;
pub const RETRO_ENVIRONMENT_SET_MEMORY_MAPS: c_uint = 36 | RETRO_ENVIRONMENT_EXPERIMENTAL;
pub const RETRO_ENVIRONMENT_SET_GEOMETRY: c_uint = 37;
pub const RETRO_ENVIRONMENT_GET_USERNAME: c_uint = 38;
pub const RETRO_ENVIRONMENT_GET_LANGUAGE: c_uint = 39;
pub const RETRO_ENVIRONMENT_GET_CURRENT_SOFTWARE_FRAMEBUFFER: c_uint =
    40 | RETRO_ENVIRONMENT_EXPERIMENTAL;
pub const RETRO_ENVIRONMENT_GET_HW_RENDER_INTERFACE: c_uint = 41 | RETRO_ENVIRONMENT_EXPERIMENTAL;
pub const RETRO_ENVIRONMENT_SET_SUPPORT_ACHIEVEMENTS: c_uint = 42 | RETRO_ENVIRONMENT_EXPERIMENTAL;
pub const RETRO_ENVIRONMENT_GET_AUDIO_VIDEO_ENABLE: c_uint = 47 | RETRO_ENVIRONMENT_EXPERIMENTAL;
pub const RETRO_ENVIRONMENT_GET_INPUT_BITMASKS: c_uint = 51 | RETRO_ENVIRONMENT_EXPERIMENTAL;
pub const RETRO_ENVIRONMENT_GET_CORE_OPTIONS_VERSION: c_uint = 52;

// Callback signatures
pub type retro_environment_t = unsafe extern "C" fn(cmd: c_uint, data: *mut c_void) -> bool;
pub type retro_video_refresh_t =
    unsafe extern "C" fn(data: *const c_void, width: c_uint, height: c_uint, pitch: usize);
pub type retro_audio_sample_t = unsafe extern "C" fn(left: i16, right: i16);
pub type retro_audio_sample_batch_t = unsafe extern "C" fn(data: *const i16, frames: usize) -> usize;
pub type retro_input_poll_t = unsafe extern "C" fn();
pub type retro_input_state_t =
    unsafe extern "C" fn(port: c_uint, device: c_uint, index: c_uint, id: c_uint) -> i16;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_system_info {
    pub library_name: *const c_char,
    pub library_version: *const c_char,
    pub valid_extensions: *const c_char,
    pub need_fullpath: bool,
    pub block_extract: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct retro_game_geometry {
    pub base_width: c_uint,
    pub base_height: c_uint,
    pub max_width: c_uint,
    pub max_height: c_uint,
    pub aspect_ratio: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct retro_system_timing {
    pub fps: f64,
    pub sample_rate: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct retro_system_av_info {
    pub geometry: retro_game_geometry,
    pub timing: retro_system_timing,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_game_info {
    pub path: *const c_char,
    pub data: *const c_void,
    pub size: usize,
    pub meta: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_variable {
    pub key: *const c_char,
    pub value: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_message {
    pub msg: *const c_char,
    pub frames: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_input_descriptor {
    pub port: c_uint,
    pub device: c_uint,
    pub index: c_uint,
    pub id: c_uint,
    pub description: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_controller_description {
    pub desc: *const c_char,
    pub id: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_controller_info {
    pub types: *const retro_controller_description,
    pub num_types: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_subsystem_memory_info {
    pub extension: *const c_char,
    pub type_: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_subsystem_rom_info {
    pub desc: *const c_char,
    pub valid_extensions: *const c_char,
    pub need_fullpath: bool,
    pub block_extract: bool,
    pub required: bool,
    pub memory: *const retro_subsystem_memory_info,
    pub num_memory: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_subsystem_info {
    pub desc: *const c_char,
    pub ident: *const c_char,
    pub roms: *const retro_subsystem_rom_info,
    pub num_roms: c_uint,
    pub id: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_memory_descriptor {
    pub flags: u64,
    pub ptr: *mut c_void,
    pub offset: usize,
    pub start: usize,
    pub select: usize,
    pub disconnect: usize,
    pub len: usize,
    pub addrspace: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_memory_map {
    pub descriptors: *const retro_memory_descriptor,
    pub num_descriptors: c_uint,
}

/// Name of an environment command, for log lines
pub fn environment_name(cmd: c_uint) -> &'static str {
    match cmd {
        RETRO_ENVIRONMENT_SET_ROTATION => "SET_ROTATION",
        RETRO_ENVIRONMENT_GET_OVERSCAN => "GET_OVERSCAN",
        RETRO_ENVIRONMENT_GET_CAN_DUPE => "GET_CAN_DUPE",
        RETRO_ENVIRONMENT_SET_MESSAGE => "SET_MESSAGE",
        RETRO_ENVIRONMENT_SHUTDOWN => "SHUTDOWN",
        RETRO_ENVIRONMENT_SET_PERFORMANCE_LEVEL => "SET_PERFORMANCE_LEVEL",
        RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY => "GET_SYSTEM_DIRECTORY",
        RETRO_ENVIRONMENT_SET_PIXEL_FORMAT => "SET_PIXEL_FORMAT",
        RETRO_ENVIRONMENT_SET_INPUT_DESCRIPTORS => "SET_INPUT_DESCRIPTORS",
        RETRO_ENVIRONMENT_SET_KEYBOARD_CALLBACK => "SET_KEYBOARD_CALLBACK",
        RETRO_ENVIRONMENT_SET_DISK_CONTROL_INTERFACE => "SET_DISK_CONTROL_INTERFACE",
        RETRO_ENVIRONMENT_SET_HW_RENDER => "SET_HW_RENDER",
        RETRO_ENVIRONMENT_GET_VARIABLE => "GET_VARIABLE",
        RETRO_ENVIRONMENT_SET_VARIABLES => "SET_VARIABLES",
        RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE => "GET_VARIABLE_UPDATE",
        RETRO_ENVIRONMENT_SET_SUPPORT_NO_GAME => "SET_SUPPORT_NO_GAME",
        RETRO_ENVIRONMENT_GET_LIBRETRO_PATH => "GET_LIBRETRO_PATH",
        RETRO_ENVIRONMENT_SET_FRAME_TIME_CALLBACK => "SET_FRAME_TIME_CALLBACK",
        RETRO_ENVIRONMENT_SET_AUDIO_CALLBACK => "SET_AUDIO_CALLBACK",
        RETRO_ENVIRONMENT_GET_RUMBLE_INTERFACE => "GET_RUMBLE_INTERFACE",
        RETRO_ENVIRONMENT_GET_INPUT_DEVICE_CAPABILITIES => "GET_INPUT_DEVICE_CAPABILITIES",
        RETRO_ENVIRONMENT_GET_SENSOR_INTERFACE => "GET_SENSOR_INTERFACE",
        RETRO_ENVIRONMENT_GET_CAMERA_INTERFACE => "GET_CAMERA_INTERFACE",
        RETRO_ENVIRONMENT_GET_LOG_INTERFACE => "GET_LOG_INTERFACE",
        RETRO_ENVIRONMENT_GET_PERF_INTERFACE => "GET_PERF_INTERFACE",
        RETRO_ENVIRONMENT_GET_LOCATION_INTERFACE => "GET_LOCATION_INTERFACE",
        RETRO_ENVIRONMENT_GET_CORE_ASSETS_DIRECTORY => "GET_CORE_ASSETS_DIRECTORY",
        RETRO_ENVIRONMENT_GET_SAVE_DIRECTORY => "GET_SAVE_DIRECTORY",
        RETRO_ENVIRONMENT_SET_SYSTEM_AV_INFO => "SET_SYSTEM_AV_INFO",
        RETRO_ENVIRONMENT_SET_PROC_ADDRESS_CALLBACK => "SET_PROC_ADDRESS_CALLBACK",
        RETRO_ENVIRONMENT_SET_SUBSYSTEM_INFO => "SET_SUBSYSTEM_INFO",
        RETRO_ENVIRONMENT_SET_CONTROLLER_INFO => "SET_CONTROLLER_INFO",
        RETRO_ENVIRONMENT_SET_MEMORY_MAPS => "SET_MEMORY_MAPS",
        RETRO_ENVIRONMENT_SET_GEOMETRY => "SET_GEOMETRY",
        RETRO_ENVIRONMENT_GET_USERNAME => "GET_USERNAME",
        RETRO_ENVIRONMENT_GET_LANGUAGE => "GET_LANGUAGE",
        RETRO_ENVIRONMENT_GET_CURRENT_SOFTWARE_FRAMEBUFFER => "GET_CURRENT_SOFTWARE_FRAMEBUFFER",
        RETRO_ENVIRONMENT_GET_HW_RENDER_INTERFACE => "GET_HW_RENDER_INTERFACE",
        RETRO_ENVIRONMENT_SET_SUPPORT_ACHIEVEMENTS => "SET_SUPPORT_ACHIEVEMENTS",
        RETRO_ENVIRONMENT_GET_AUDIO_VIDEO_ENABLE => "GET_AUDIO_VIDEO_ENABLE",
        RETRO_ENVIRONMENT_GET_INPUT_BITMASKS => "GET_INPUT_BITMASKS",
        RETRO_ENVIRONMENT_GET_CORE_OPTIONS_VERSION => "GET_CORE_OPTIONS_VERSION",
        _ => "UNKNOWN",
    }
}
