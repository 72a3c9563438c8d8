//! Native core module loading
//!
//! A [`NativeModule`] owns a dynamically loaded libretro core together with
//! its resolved entry points. Binding is all-or-nothing: either every entry
//! point resolves or the library is released again.

use crate::ffi::*;
use hh_core::ModuleError;
use libloading::Library;
use std::ffi::{c_char, c_uint, c_void, CString};
use std::path::{Path, PathBuf};

/// Resolved libretro entry points
///
/// Also used to bind in-process cores through [`NativeModule::from_api`].
#[derive(Clone, Copy)]
pub struct CoreApi {
    pub init: unsafe extern "C" fn(),
    pub deinit: unsafe extern "C" fn(),
    pub api_version: unsafe extern "C" fn() -> c_uint,
    pub get_system_info: unsafe extern "C" fn(info: *mut retro_system_info),
    pub get_system_av_info: unsafe extern "C" fn(info: *mut retro_system_av_info),
    pub set_environment: unsafe extern "C" fn(cb: retro_environment_t),
    pub set_video_refresh: unsafe extern "C" fn(cb: retro_video_refresh_t),
    pub set_audio_sample: unsafe extern "C" fn(cb: retro_audio_sample_t),
    pub set_audio_sample_batch: unsafe extern "C" fn(cb: retro_audio_sample_batch_t),
    pub set_input_poll: unsafe extern "C" fn(cb: retro_input_poll_t),
    pub set_input_state: unsafe extern "C" fn(cb: retro_input_state_t),
    pub set_controller_port_device: unsafe extern "C" fn(port: c_uint, device: c_uint),
    pub reset: unsafe extern "C" fn(),
    pub run: unsafe extern "C" fn(),
    pub serialize_size: unsafe extern "C" fn() -> usize,
    pub serialize: unsafe extern "C" fn(data: *mut c_void, size: usize) -> bool,
    pub unserialize: unsafe extern "C" fn(data: *const c_void, size: usize) -> bool,
    pub cheat_reset: unsafe extern "C" fn(),
    pub cheat_set: unsafe extern "C" fn(index: c_uint, enabled: bool, code: *const c_char),
    pub load_game: unsafe extern "C" fn(game: *const retro_game_info) -> bool,
    pub load_game_special:
        unsafe extern "C" fn(game_type: c_uint, info: *const retro_game_info, num_info: usize) -> bool,
    pub unload_game: unsafe extern "C" fn(),
    pub get_region: unsafe extern "C" fn() -> c_uint,
    pub get_memory_data: unsafe extern "C" fn(id: c_uint) -> *mut c_void,
    pub get_memory_size: unsafe extern "C" fn(id: c_uint) -> usize,
}

/// A loaded libretro core
pub struct NativeModule {
    api: CoreApi,
    path: Option<PathBuf>,
    // Dropped after `api` is last used; the function pointers point into it
    library: Option<Library>,
}

impl NativeModule {
    /// Open a core library and resolve all of its entry points
    pub fn load(path: &Path) -> Result<Self, ModuleError> {
        let shown = path.display().to_string();

        // SAFETY: loading a library runs its initializers; a libretro core
        // is trusted to be a well-behaved shared object
        let library = unsafe { Library::new(path) }.map_err(|e| ModuleError::Open {
            path: shown.clone(),
            message: e.to_string(),
        })?;

        macro_rules! bind {
            ($name:literal) => {{
                // SAFETY: the symbol type is the one declared by libretro.h
                let symbol = unsafe { library.get(concat!($name, "\0").as_bytes()) }.map_err(|e| {
                    ModuleError::MissingSymbol {
                        path: shown.clone(),
                        symbol: $name,
                        message: e.to_string(),
                    }
                })?;
                *symbol
            }};
        }

        let api = CoreApi {
            init: bind!("retro_init"),
            deinit: bind!("retro_deinit"),
            api_version: bind!("retro_api_version"),
            get_system_info: bind!("retro_get_system_info"),
            get_system_av_info: bind!("retro_get_system_av_info"),
            set_environment: bind!("retro_set_environment"),
            set_video_refresh: bind!("retro_set_video_refresh"),
            set_audio_sample: bind!("retro_set_audio_sample"),
            set_audio_sample_batch: bind!("retro_set_audio_sample_batch"),
            set_input_poll: bind!("retro_set_input_poll"),
            set_input_state: bind!("retro_set_input_state"),
            set_controller_port_device: bind!("retro_set_controller_port_device"),
            reset: bind!("retro_reset"),
            run: bind!("retro_run"),
            serialize_size: bind!("retro_serialize_size"),
            serialize: bind!("retro_serialize"),
            unserialize: bind!("retro_unserialize"),
            cheat_reset: bind!("retro_cheat_reset"),
            cheat_set: bind!("retro_cheat_set"),
            load_game: bind!("retro_load_game"),
            load_game_special: bind!("retro_load_game_special"),
            unload_game: bind!("retro_unload_game"),
            get_region: bind!("retro_get_region"),
            get_memory_data: bind!("retro_get_memory_data"),
            get_memory_size: bind!("retro_get_memory_size"),
        };

        tracing::debug!("Resolved libretro entry points in {}", shown);

        Ok(Self {
            api,
            path: Some(path.to_path_buf()),
            library: Some(library),
        })
    }

    /// Bind a core that is linked into the current process
    pub fn from_api(api: CoreApi) -> Self {
        Self {
            api,
            path: None,
            library: None,
        }
    }

    /// Path the module was loaded from, if it came from a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Release the library
    pub fn unload(self) {
        if let Some(path) = &self.path {
            tracing::debug!("Unloading core {}", path.display());
        }
    }

    // The wrappers below trust the core to honour the libretro ABI for the
    // pointers the host hands it.

    pub fn init(&self) {
        unsafe { (self.api.init)() }
    }

    pub fn deinit(&self) {
        unsafe { (self.api.deinit)() }
    }

    pub fn api_version(&self) -> u32 {
        unsafe { (self.api.api_version)() }
    }

    pub fn system_info(&self) -> retro_system_info {
        let mut info = retro_system_info {
            library_name: std::ptr::null(),
            library_version: std::ptr::null(),
            valid_extensions: std::ptr::null(),
            need_fullpath: false,
            block_extract: false,
        };
        unsafe { (self.api.get_system_info)(&mut info) };
        info
    }

    pub fn system_av_info(&self) -> retro_system_av_info {
        let mut info = retro_system_av_info::default();
        unsafe { (self.api.get_system_av_info)(&mut info) };
        info
    }

    pub fn set_environment(&self, cb: retro_environment_t) {
        unsafe { (self.api.set_environment)(cb) }
    }

    pub fn set_video_refresh(&self, cb: retro_video_refresh_t) {
        unsafe { (self.api.set_video_refresh)(cb) }
    }

    pub fn set_audio_sample(&self, cb: retro_audio_sample_t) {
        unsafe { (self.api.set_audio_sample)(cb) }
    }

    pub fn set_audio_sample_batch(&self, cb: retro_audio_sample_batch_t) {
        unsafe { (self.api.set_audio_sample_batch)(cb) }
    }

    pub fn set_input_poll(&self, cb: retro_input_poll_t) {
        unsafe { (self.api.set_input_poll)(cb) }
    }

    pub fn set_input_state(&self, cb: retro_input_state_t) {
        unsafe { (self.api.set_input_state)(cb) }
    }

    pub fn set_controller_port_device(&self, port: u32, device: u32) {
        unsafe { (self.api.set_controller_port_device)(port, device) }
    }

    pub fn reset(&self) {
        unsafe { (self.api.reset)() }
    }

    pub fn run(&self) {
        unsafe { (self.api.run)() }
    }

    pub fn serialize_size(&self) -> usize {
        unsafe { (self.api.serialize_size)() }
    }

    /// Save the core state, `None` if the core has no state or refused
    pub fn serialize(&self) -> Option<Vec<u8>> {
        let size = self.serialize_size();
        if size == 0 {
            return None;
        }

        let mut data = vec![0u8; size];
        let ok = unsafe { (self.api.serialize)(data.as_mut_ptr().cast(), size) };
        ok.then_some(data)
    }

    pub fn unserialize(&self, data: &[u8]) -> bool {
        unsafe { (self.api.unserialize)(data.as_ptr().cast(), data.len()) }
    }

    pub fn cheat_reset(&self) {
        unsafe { (self.api.cheat_reset)() }
    }

    /// Returns false when `code` contains an interior NUL
    pub fn cheat_set(&self, index: u32, enabled: bool, code: &str) -> bool {
        let Ok(code) = CString::new(code) else {
            return false;
        };
        unsafe { (self.api.cheat_set)(index, enabled, code.as_ptr()) };
        true
    }

    /// # Safety
    ///
    /// Pointers inside `game` must stay valid for the duration of the call.
    pub unsafe fn load_game(&self, game: Option<&retro_game_info>) -> bool {
        let game = game.map_or(std::ptr::null(), |g| g as *const retro_game_info);
        unsafe { (self.api.load_game)(game) }
    }

    /// # Safety
    ///
    /// Pointers inside every entry of `games` must stay valid for the
    /// duration of the call.
    pub unsafe fn load_game_special(&self, game_type: u32, games: &[retro_game_info]) -> bool {
        unsafe { (self.api.load_game_special)(game_type, games.as_ptr(), games.len()) }
    }

    pub fn unload_game(&self) {
        unsafe { (self.api.unload_game)() }
    }

    pub fn region(&self) -> u32 {
        unsafe { (self.api.get_region)() }
    }

    /// Pointer and size of a memory area, `None` if the core does not expose it
    pub fn memory(&self, id: u32) -> Option<(*mut u8, usize)> {
        let data = unsafe { (self.api.get_memory_data)(id) };
        let size = unsafe { (self.api.get_memory_size)(id) };
        (!data.is_null() && size != 0).then_some((data.cast(), size))
    }
}

impl std::fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeModule")
            .field("path", &self.path)
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}
