//! Environment command dispatcher
//!
//! Handles `RETRO_ENVIRONMENT_*` requests made by the core. Commands the host
//! does not implement are logged and answered with `false`.

use crate::components::LogLevel;
use crate::ffi::*;
use crate::host::HostState;
use crate::memory_map::MemoryMap;
use crate::types::*;
use std::ffi::{c_char, c_uint, c_void, CString};
use std::path::Path;

/// Handle one environment request
///
/// # Safety
///
/// `data` must point to the structure libretro.h associates with `cmd`.
pub(crate) unsafe fn dispatch(state: &mut HostState, cmd: c_uint, data: *mut c_void) -> bool {
    unsafe {
        match cmd {
            RETRO_ENVIRONMENT_SET_ROTATION => state.set_rotation(data.cast()),
            RETRO_ENVIRONMENT_GET_OVERSCAN => false,
            RETRO_ENVIRONMENT_GET_CAN_DUPE => write(data.cast::<bool>(), true),
            RETRO_ENVIRONMENT_SET_MESSAGE => state.set_message(data.cast()),
            RETRO_ENVIRONMENT_SHUTDOWN => state.shutdown(),
            RETRO_ENVIRONMENT_SET_PERFORMANCE_LEVEL => state.set_performance_level(data.cast()),
            RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY => {
                let dir = state.components.config.system_directory().to_path_buf();
                state.directory(&dir, Slot::System, data.cast())
            }
            RETRO_ENVIRONMENT_GET_CORE_ASSETS_DIRECTORY => {
                let dir = state.components.config.assets_directory().to_path_buf();
                state.directory(&dir, Slot::Assets, data.cast())
            }
            RETRO_ENVIRONMENT_GET_SAVE_DIRECTORY => {
                let dir = state.components.config.save_directory().to_path_buf();
                state.directory(&dir, Slot::Save, data.cast())
            }
            RETRO_ENVIRONMENT_SET_PIXEL_FORMAT => state.set_pixel_format(data.cast()),
            RETRO_ENVIRONMENT_SET_INPUT_DESCRIPTORS => state.set_input_descriptors(data.cast()),
            RETRO_ENVIRONMENT_GET_VARIABLE => state.get_variable(data.cast()),
            RETRO_ENVIRONMENT_SET_VARIABLES => state.set_variables(data.cast()),
            RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE => {
                let updated = state.components.config.variables_updated();
                write(data.cast::<bool>(), updated)
            }
            RETRO_ENVIRONMENT_SET_SUPPORT_NO_GAME => {
                state.supports_no_game = read(data.cast::<bool>()).unwrap_or(false);
                state.log(LogLevel::Debug, format_args!("supports_no_game: {}", state.supports_no_game));
                true
            }
            RETRO_ENVIRONMENT_GET_LIBRETRO_PATH => state.libretro_path(data.cast()),
            RETRO_ENVIRONMENT_SET_SYSTEM_AV_INFO => state.set_system_av_info(data.cast()),
            RETRO_ENVIRONMENT_SET_SUBSYSTEM_INFO => state.set_subsystem_info(data.cast()),
            RETRO_ENVIRONMENT_SET_CONTROLLER_INFO => state.set_controller_info(data.cast()),
            RETRO_ENVIRONMENT_SET_MEMORY_MAPS => state.set_memory_maps(data.cast()),
            RETRO_ENVIRONMENT_SET_GEOMETRY => state.set_geometry(data.cast()),
            RETRO_ENVIRONMENT_GET_LANGUAGE => write(data.cast::<c_uint>(), RETRO_LANGUAGE_ENGLISH),
            RETRO_ENVIRONMENT_SET_SUPPORT_ACHIEVEMENTS => {
                state.supports_achievements = read(data.cast::<bool>()).unwrap_or(false);
                state.log(
                    LogLevel::Debug,
                    format_args!("supports_achievements: {}", state.supports_achievements),
                );
                true
            }
            // Bit 0 enables video, bit 1 enables audio
            RETRO_ENVIRONMENT_GET_AUDIO_VIDEO_ENABLE => write(data.cast::<i32>(), 3),
            RETRO_ENVIRONMENT_GET_CORE_OPTIONS_VERSION => write(data.cast::<c_uint>(), 0),
            _ => {
                state.log(
                    LogLevel::Error,
                    format_args!(
                        "Unimplemented env call: {} ({})",
                        environment_name(cmd),
                        cmd & !RETRO_ENVIRONMENT_EXPERIMENTAL
                    ),
                );
                false
            }
        }
    }
}

unsafe fn write<T>(ptr: *mut T, value: T) -> bool {
    if ptr.is_null() {
        return false;
    }
    unsafe { ptr.write(value) };
    true
}

unsafe fn read<T: Copy>(ptr: *const T) -> Option<T> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { ptr.read() })
    }
}

#[derive(Clone, Copy)]
enum Slot {
    System,
    Assets,
    Save,
}

impl HostState {
    unsafe fn set_rotation(&mut self, data: *const c_uint) -> bool {
        let Some(rotation) = (unsafe { read(data) }) else {
            return false;
        };
        self.rotation = rotation;
        self.log(LogLevel::Debug, format_args!("Rotation set to {} degrees", rotation * 90));
        true
    }

    unsafe fn set_message(&mut self, data: *const retro_message) -> bool {
        let Some(message) = (unsafe { read(data) }) else {
            return false;
        };
        let text = unsafe { c_string(message.msg) };
        self.log(LogLevel::Info, format_args!("OSD message: {}", text));
        self.components.video.show_message(&text, message.frames);
        true
    }

    fn shutdown(&mut self) -> bool {
        self.log(LogLevel::Info, format_args!("Core requested shutdown"));
        self.shutdown_requested = true;
        true
    }

    unsafe fn set_performance_level(&mut self, data: *const c_uint) -> bool {
        let Some(level) = (unsafe { read(data) }) else {
            return false;
        };
        self.performance_level = level;
        self.log(LogLevel::Debug, format_args!("Performance level: {}", level));
        true
    }

    unsafe fn directory(&mut self, dir: &Path, slot: Slot, data: *mut *const c_char) -> bool {
        let cache = match slot {
            Slot::System => &mut self.strings.system,
            Slot::Assets => &mut self.strings.assets,
            Slot::Save => &mut self.strings.save,
        };

        match intern(cache, &dir.to_string_lossy()) {
            Some(ptr) => unsafe { write(data, ptr) },
            None => false,
        }
    }

    unsafe fn libretro_path(&mut self, data: *mut *const c_char) -> bool {
        let Some(path) = self.core_path.as_ref().map(|p| p.to_string_lossy().into_owned()) else {
            return false;
        };
        match intern(&mut self.strings.libretro_path, &path) {
            Some(ptr) => unsafe { write(data, ptr) },
            None => false,
        }
    }

    unsafe fn set_pixel_format(&mut self, data: *const c_uint) -> bool {
        let Some(raw) = (unsafe { read(data) }) else {
            return false;
        };

        match PixelFormat::from_raw(raw) {
            Some(format) => {
                if format == PixelFormat::Rgb1555 {
                    self.log(LogLevel::Warn, format_args!("Deprecated pixel format 0RGB1555"));
                }
                self.log(LogLevel::Debug, format_args!("Pixel format: {:?}", format));
                self.pixel_format = format;
                true
            }
            None => {
                self.log(LogLevel::Error, format_args!("Invalid pixel format: {}", raw));
                false
            }
        }
    }

    unsafe fn set_input_descriptors(&mut self, data: *const retro_input_descriptor) -> bool {
        let raw = unsafe { c_terminated(data, |d| d.description.is_null()) };

        self.input_descriptors = raw
            .iter()
            .map(|d| InputDescriptor {
                port: d.port,
                device: d.device,
                index: d.index,
                id: d.id,
                description: unsafe { c_string(d.description) },
            })
            .collect();

        for d in &self.input_descriptors {
            self.log(LogLevel::Debug, format_args!(
                "Input descriptor {}/{}/{}/{}: {}",
                d.port,
                d.device,
                d.index,
                d.id,
                d.description
            ));
        }

        self.components.input.set_input_descriptors(&self.input_descriptors);
        true
    }

    unsafe fn get_variable(&mut self, data: *mut retro_variable) -> bool {
        if data.is_null() {
            return false;
        }

        let variable = unsafe { &mut *data };
        let key = unsafe { c_string(variable.key) };
        variable.value = std::ptr::null();

        let Some(value) = self.components.config.variable(&key).map(str::to_owned) else {
            self.log(LogLevel::Warn, format_args!("Unknown variable \"{}\"", key));
            return false;
        };

        if value.is_empty() {
            return false;
        }

        let slot = self.strings.variables.entry(key).or_default();
        match intern(slot, &value) {
            Some(ptr) => {
                variable.value = ptr;
                true
            }
            None => false,
        }
    }

    unsafe fn set_variables(&mut self, data: *const retro_variable) -> bool {
        let raw = unsafe { c_terminated(data, |v| v.key.is_null()) };

        self.variables = raw
            .iter()
            .map(|v| unsafe {
                Variable {
                    key: c_string(v.key),
                    value: c_string(v.value),
                }
            })
            .collect();

        for v in &self.variables {
            self.log(LogLevel::Debug, format_args!("Variable {} = \"{}\"", v.key, v.value));
        }

        self.strings.variables.clear();
        self.components.config.set_variables(&self.variables);
        true
    }

    unsafe fn set_system_av_info(&mut self, data: *const retro_system_av_info) -> bool {
        let Some(raw) = (unsafe { read(data) }) else {
            return false;
        };

        let previous_rate = self.av_info.timing.sample_rate;
        let mut av_info = SystemAvInfo::from(&raw);
        av_info.geometry = av_info.geometry.normalized();
        self.av_info = av_info;
        self.log(LogLevel::Info, format_args!("System AV info changed: {:?}", av_info));

        let geometry = av_info.geometry;
        let video_ok = self.components.video.set_geometry(
            geometry.base_width,
            geometry.base_height,
            geometry.aspect_ratio,
            self.pixel_format,
        );

        let audio_ok = av_info.timing.sample_rate == previous_rate
            || self.components.audio.set_rate(av_info.timing.sample_rate);

        video_ok && audio_ok
    }

    unsafe fn set_subsystem_info(&mut self, data: *const retro_subsystem_info) -> bool {
        let raw = unsafe { c_terminated(data, |s| s.desc.is_null()) };
        self.subsystems = raw.iter().map(|s| unsafe { SubsystemInfo::from_raw(s) }).collect();

        for s in &self.subsystems {
            self.log(LogLevel::Debug, format_args!("Subsystem {} ({}) id {}, {} roms", s.desc, s.ident, s.id, s.roms.len()));
        }
        true
    }

    unsafe fn set_controller_info(&mut self, data: *const retro_controller_info) -> bool {
        let raw = unsafe { c_terminated(data, |c| c.types.is_null()) };
        self.controller_info = raw.iter().map(|c| unsafe { ControllerInfo::from_raw(c) }).collect();

        self.ports.clear();
        self.ports.resize(self.controller_info.len(), RETRO_DEVICE_NONE);

        for (port, info) in self.controller_info.iter().enumerate() {
            for t in &info.types {
                self.log(LogLevel::Debug, format_args!("Port {}: {} ({})", port, t.desc, t.id));
            }
        }

        self.components.input.set_controller_info(&self.controller_info);
        true
    }

    unsafe fn set_memory_maps(&mut self, data: *const retro_memory_map) -> bool {
        let Some(raw) = (unsafe { read(data) }) else {
            return false;
        };

        match unsafe { MemoryMap::from_raw(&raw) } {
            Ok(map) => {
                for (index, d) in map.descriptors().iter().enumerate() {
                    self.log(LogLevel::Debug, format_args!(
                        "Descriptor {}: {} start 0x{:08X} select 0x{:08X} disconnect 0x{:08X} len 0x{:X} offset 0x{:X} {}",
                        index,
                        d.flags.summary(),
                        d.start,
                        d.select,
                        d.disconnect,
                        d.len,
                        d.offset,
                        d.addrspace
                    ));
                }
                self.memory_map = map;
            }
            Err(e) => {
                self.log(LogLevel::Error, format_args!("Memory map rejected: {}", e));
                self.memory_map = MemoryMap::default();
            }
        }
        true
    }

    unsafe fn set_geometry(&mut self, data: *const retro_game_geometry) -> bool {
        let Some(raw) = (unsafe { read(data) }) else {
            return false;
        };

        let geometry = &mut self.av_info.geometry;
        geometry.base_width = raw.base_width;
        geometry.base_height = raw.base_height;
        geometry.aspect_ratio = raw.aspect_ratio;
        *geometry = geometry.normalized();
        let geometry = *geometry;

        self.log(
            LogLevel::Debug,
            format_args!(
                "Geometry set to {}x{} ({})",
                geometry.base_width, geometry.base_height, geometry.aspect_ratio
            ),
        );

        self.components.video.set_geometry(
            geometry.base_width,
            geometry.base_height,
            geometry.aspect_ratio,
            self.pixel_format,
        )
    }
}

/// Keep `value` alive in `slot` and return a pointer to it
///
/// The cached string is only replaced when the value changes, so pointers
/// handed out earlier stay valid as long as possible.
fn intern(slot: &mut Option<CString>, value: &str) -> Option<*const c_char> {
    if slot.as_ref().map(|s| s.as_bytes()) != Some(value.as_bytes()) {
        *slot = Some(CString::new(value).ok()?);
    }
    slot.as_ref().map(|s| s.as_ptr())
}
