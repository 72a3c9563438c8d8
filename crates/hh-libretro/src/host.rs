//! libretro core host
//!
//! [`CoreHost`] drives one core through its lifecycle:
//!
//! ```text
//! Unloaded -> CoreLoaded -> GameLoaded -> Running
//!     ^___________|______________|___________|   (destroy / failure)
//! ```
//!
//! Every call into the core binds the host to the calling thread through a
//! [`CallbackScope`], so the core's callbacks reach this instance.

use crate::callbacks::{self, CallbackScope};
use crate::components::{Components, LogLevel};
use crate::ffi::{retro_game_info, RETRO_API_VERSION, RETRO_DEVICE_NONE};
use crate::memory_map::MemoryMap;
use crate::module::NativeModule;
use crate::regions::{self, MemoryRegion, Platform};
use crate::types::*;
use hh_core::{ContentError, HostError, Result};
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::ffi::{c_char, CString};
use std::fmt;
use std::path::{Path, PathBuf};

/// Interleaved samples buffered during one step
pub const AUDIO_BUFFER_SAMPLES: usize = 8192;

/// Upper bound on `retro_run` calls made by one step while waiting for audio
pub const MAX_RUNS_PER_STEP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    CoreLoaded,
    GameLoaded,
    Running,
}

impl LifecycleState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Unloaded => "Unloaded",
            Self::CoreLoaded => "CoreLoaded",
            Self::GameLoaded => "GameLoaded",
            Self::Running => "Running",
        }
    }

    pub fn has_game(self) -> bool {
        matches!(self, Self::GameLoaded | Self::Running)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed capacity buffer for the samples of one step
pub(crate) struct SampleBuffer {
    samples: Vec<i16>,
}

impl SampleBuffer {
    fn new() -> Self {
        Self {
            samples: Vec::with_capacity(AUDIO_BUFFER_SAMPLES),
        }
    }

    /// Append one stereo frame, false if it did not fit
    pub(crate) fn push_frame(&mut self, left: i16, right: i16) -> bool {
        if self.samples.len() + 2 > AUDIO_BUFFER_SAMPLES {
            return false;
        }
        self.samples.extend_from_slice(&[left, right]);
        true
    }

    /// Append as many whole frames of `samples` as fit, returns the frame count
    pub(crate) fn push_batch(&mut self, samples: &[i16]) -> usize {
        let room = (AUDIO_BUFFER_SAMPLES - self.samples.len()) / 2;
        let frames = (samples.len() / 2).min(room);
        self.samples.extend_from_slice(&samples[..frames * 2]);
        frames
    }

    fn clear(&mut self) {
        self.samples.clear();
    }

    fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn as_slice(&self) -> &[i16] {
        &self.samples
    }
}

/// C strings handed to the core, kept alive until replaced
#[derive(Default)]
pub(crate) struct HostStrings {
    pub(crate) system: Option<CString>,
    pub(crate) assets: Option<CString>,
    pub(crate) save: Option<CString>,
    pub(crate) libretro_path: Option<CString>,
    pub(crate) variables: HashMap<String, Option<CString>>,
}

/// Everything the core's callbacks may touch
pub(crate) struct HostState {
    pub(crate) components: Components,
    pub(crate) core_path: Option<PathBuf>,
    pub(crate) strings: HostStrings,
    pub(crate) system_info: SystemInfo,
    pub(crate) av_info: SystemAvInfo,
    pub(crate) pixel_format: PixelFormat,
    pub(crate) performance_level: u32,
    pub(crate) rotation: u32,
    pub(crate) supports_no_game: bool,
    pub(crate) supports_achievements: bool,
    pub(crate) shutdown_requested: bool,
    pub(crate) input_descriptors: Vec<InputDescriptor>,
    pub(crate) variables: Vec<Variable>,
    pub(crate) subsystems: Vec<SubsystemInfo>,
    pub(crate) controller_info: Vec<ControllerInfo>,
    pub(crate) memory_map: MemoryMap,
    pub(crate) ports: Vec<u32>,
    pub(crate) samples: SampleBuffer,
}

impl HostState {
    fn new(components: Components) -> Self {
        Self {
            components,
            core_path: None,
            strings: HostStrings::default(),
            system_info: SystemInfo::default(),
            av_info: SystemAvInfo::default(),
            pixel_format: PixelFormat::default(),
            performance_level: 0,
            rotation: 0,
            supports_no_game: false,
            supports_achievements: false,
            shutdown_requested: false,
            input_descriptors: Vec::new(),
            variables: Vec::new(),
            subsystems: Vec::new(),
            controller_info: Vec::new(),
            memory_map: MemoryMap::default(),
            ports: Vec::new(),
            samples: SampleBuffer::new(),
        }
    }

    /// Forget everything negotiated with the previous core
    fn clear(&mut self) {
        self.core_path = None;
        self.strings = HostStrings::default();
        self.system_info = SystemInfo::default();
        self.av_info = SystemAvInfo::default();
        self.pixel_format = PixelFormat::default();
        self.performance_level = 0;
        self.rotation = 0;
        self.supports_no_game = false;
        self.supports_achievements = false;
        self.shutdown_requested = false;
        self.input_descriptors.clear();
        self.variables.clear();
        self.subsystems.clear();
        self.controller_info.clear();
        self.memory_map = MemoryMap::default();
        self.ports.clear();
        self.samples.clear();
    }

    pub(crate) fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.components.logger.log(level, &args.to_string());
    }
}

pub(crate) struct HostContext {
    pub(crate) state: RefCell<HostState>,
}

impl HostContext {
    pub(crate) fn new(components: Components) -> Self {
        Self {
            state: RefCell::new(HostState::new(components)),
        }
    }
}

/// Hosts a single libretro core and its content
pub struct CoreHost {
    lifecycle: LifecycleState,
    context: HostContext,
    module: Option<NativeModule>,
}

impl CoreHost {
    pub fn new(components: Components) -> Self {
        Self {
            lifecycle: LifecycleState::Unloaded,
            context: HostContext::new(components),
            module: None,
        }
    }

    /// Load a core library from disk
    pub fn load_core(&mut self, path: &Path) -> Result<()> {
        self.require(LifecycleState::Unloaded)?;
        self.log(LogLevel::Info, format_args!("Loading core \"{}\"", path.display()));

        let module = NativeModule::load(path).inspect_err(|e| {
            self.log(LogLevel::Error, format_args!("{}", e));
        })?;
        self.install(module)
    }

    /// Start a core that is already bound, e.g. through [`NativeModule::from_api`]
    pub fn load_module(&mut self, module: NativeModule) -> Result<()> {
        self.require(LifecycleState::Unloaded)?;
        self.install(module)
    }

    fn install(&mut self, module: NativeModule) -> Result<()> {
        self.context.state.get_mut().core_path = module.path().map(Path::to_path_buf);

        {
            let _scope = CallbackScope::enter(&self.context);

            let raw = module.system_info();
            // SAFETY: the core returns valid C strings in its system info
            let info = unsafe { SystemInfo::from_raw(&raw) };
            {
                let mut state = self.context.state.borrow_mut();
                state.log(
                    LogLevel::Debug,
                    format_args!(
                        "System info: {} {} (extensions \"{}\", need_fullpath {}, block_extract {})",
                        info.library_name,
                        info.library_version,
                        info.valid_extensions,
                        info.need_fullpath,
                        info.block_extract
                    ),
                );
                state.components.config.set_core(&info);
                state.system_info = info;
            }

            let version = module.api_version();
            if version != RETRO_API_VERSION {
                self.log(LogLevel::Warn, format_args!("Core reports API version {}", version));
            }

            module.set_environment(callbacks::environment);
            module.set_video_refresh(callbacks::video_refresh);
            module.set_audio_sample(callbacks::audio_sample);
            module.set_audio_sample_batch(callbacks::audio_sample_batch);
            module.set_input_poll(callbacks::input_poll);
            module.set_input_state(callbacks::input_state);
            module.init();
        }

        self.module = Some(module);
        self.lifecycle = LifecycleState::CoreLoaded;
        Ok(())
    }

    /// Load content, `None` starts a core that supports running without it
    ///
    /// On failure the core is unloaded and the host is back to
    /// [`LifecycleState::Unloaded`].
    pub fn load_game(&mut self, content: Option<&Path>) -> Result<()> {
        self.require(LifecycleState::CoreLoaded)?;

        let result = self.open_content(content);
        if let Err(e) = &result {
            self.log(LogLevel::Error, format_args!("{}", e));
            self.teardown();
        }
        result
    }

    fn open_content(&mut self, content: Option<&Path>) -> Result<()> {
        let Some(module) = self.module.as_ref() else {
            return Err(self.invalid_state("CoreLoaded"));
        };
        let _scope = CallbackScope::enter(&self.context);
        let state = &self.context.state;

        let loaded = match content {
            None => {
                if !state.borrow().supports_no_game {
                    return Err(ContentError::ContentRequired.into());
                }
                state.borrow().log(LogLevel::Info, format_args!("Starting core with no content"));
                // SAFETY: no game info is passed
                unsafe { module.load_game(None) }
            }
            Some(path) => {
                let display = path.display().to_string();
                let c_path = CString::new(path.to_string_lossy().into_owned())
                    .map_err(|_| ContentError::InvalidPath(display.clone()))?;

                let need_fullpath = state.borrow().system_info.need_fullpath;
                let data = if need_fullpath {
                    None
                } else {
                    let bytes = state
                        .borrow_mut()
                        .components
                        .loader
                        .load(path)
                        .map_err(|source| ContentError::Read {
                            path: display.clone(),
                            source,
                        })?;
                    Some(bytes)
                };

                state.borrow().log(LogLevel::Info, format_args!("Opening content \"{}\"", display));

                let game = retro_game_info {
                    path: c_path.as_ptr(),
                    data: data.as_ref().map_or(std::ptr::null(), |d| d.as_ptr().cast()),
                    size: data.as_ref().map_or(0, Vec::len),
                    meta: std::ptr::null::<c_char>(),
                };

                // SAFETY: `c_path` and `data` outlive the call
                unsafe { module.load_game(Some(&game)) }
            }
        };

        if !loaded {
            let name = content.map_or_else(|| "<no content>".to_string(), |p| p.display().to_string());
            return Err(ContentError::Rejected(name).into());
        }

        self.lifecycle = LifecycleState::GameLoaded;

        let av_info = SystemAvInfo::from(&module.system_av_info());
        let ports = {
            let mut state = state.borrow_mut();
            negotiate_av(&mut state, av_info)?;
            state.ports.fill(RETRO_DEVICE_NONE);
            state.ports.len()
        };

        for port in 0..ports {
            module.set_controller_port_device(port as u32, RETRO_DEVICE_NONE);
        }

        Ok(())
    }

    /// Run the core until it produced audio, then hand the samples over
    ///
    /// Does nothing unless content is loaded.
    pub fn step(&mut self) {
        if !self.lifecycle.has_game() {
            return;
        }
        let Some(module) = self.module.as_ref() else {
            return;
        };
        let _scope = CallbackScope::enter(&self.context);
        let state = &self.context.state;

        let changed: Vec<(u32, u32)> = {
            let mut state = state.borrow_mut();
            let state = &mut *state;
            if state.components.input.controllers_updated() {
                let input = &state.components.input;
                state
                    .ports
                    .iter_mut()
                    .enumerate()
                    .filter_map(|(port, current)| {
                        let device = input.controller(port as u32);
                        (device != *current).then(|| {
                            *current = device;
                            (port as u32, device)
                        })
                    })
                    .collect()
            } else {
                Vec::new()
            }
        };

        for (port, device) in changed {
            module.set_controller_port_device(port, device);
        }

        state.borrow_mut().samples.clear();

        let mut runs = 0;
        loop {
            module.run();
            runs += 1;

            if !state.borrow().samples.is_empty() {
                break;
            }
            if runs == MAX_RUNS_PER_STEP {
                state
                    .borrow()
                    .log(LogLevel::Warn, format_args!("No audio after {} runs", runs));
                break;
            }
        }

        {
            let mut state = state.borrow_mut();
            let HostState {
                components,
                samples,
                ..
            } = &mut *state;
            components.audio.mix(samples.as_slice());
        }

        self.lifecycle = LifecycleState::Running;
    }

    /// Unload everything; safe to call in any state
    pub fn destroy(&mut self) {
        if self.lifecycle != LifecycleState::Unloaded {
            self.teardown();
        }
    }

    fn teardown(&mut self) {
        if let Some(module) = self.module.take() {
            {
                let _scope = CallbackScope::enter(&self.context);
                if self.lifecycle.has_game() {
                    module.unload_game();
                }
                module.deinit();
            }
            module.unload();
        }

        self.context.state.get_mut().clear();
        self.lifecycle = LifecycleState::Unloaded;
    }

    /// Soft reset of the running content
    pub fn reset(&mut self) -> Result<()> {
        let module = self.game_module()?;
        let _scope = CallbackScope::enter(&self.context);
        module.reset();
        Ok(())
    }

    /// Save state, `None` when the core cannot serialize
    pub fn serialize(&mut self) -> Result<Option<Vec<u8>>> {
        let module = self.game_module()?;
        let _scope = CallbackScope::enter(&self.context);
        Ok(module.serialize())
    }

    pub fn unserialize(&mut self, data: &[u8]) -> Result<bool> {
        let module = self.game_module()?;
        let _scope = CallbackScope::enter(&self.context);
        Ok(module.unserialize(data))
    }

    pub fn cheat_reset(&mut self) -> Result<()> {
        let module = self.game_module()?;
        let _scope = CallbackScope::enter(&self.context);
        module.cheat_reset();
        Ok(())
    }

    pub fn cheat_set(&mut self, index: u32, enabled: bool, code: &str) -> Result<bool> {
        let module = self.game_module()?;
        let _scope = CallbackScope::enter(&self.context);
        Ok(module.cheat_set(index, enabled, code))
    }

    /// Plug `device` into `port`
    pub fn set_controller_port_device(&mut self, port: u32, device: u32) -> Result<()> {
        let module = self.game_module()?;
        let _scope = CallbackScope::enter(&self.context);
        if let Some(slot) = self.context.state.borrow_mut().ports.get_mut(port as usize) {
            *slot = device;
        }
        module.set_controller_port_device(port, device);
        Ok(())
    }

    /// API version reported by the loaded core
    pub fn api_version(&self) -> Option<u32> {
        let module = self.module.as_ref()?;
        let _scope = CallbackScope::enter(&self.context);
        Some(module.api_version())
    }

    /// `RETRO_REGION_*` of the loaded content
    pub fn region(&self) -> Option<u32> {
        let module = self.game_module().ok()?;
        let _scope = CallbackScope::enter(&self.context);
        Some(module.region())
    }

    /// Memory area `id` (`RETRO_MEMORY_*`) of the loaded content
    pub fn memory_data(&self, id: u32) -> Option<&[u8]> {
        let module = self.game_module().ok()?;
        let _scope = CallbackScope::enter(&self.context);
        let (ptr, len) = module.memory(id)?;
        // SAFETY: the memory belongs to the core, which cannot run or be
        // unloaded while `self` is borrowed
        Some(unsafe { std::slice::from_raw_parts(ptr, len) })
    }

    /// Named regions of `platform`, empty when they cannot be located
    pub fn memory_regions(&self, platform: Platform) -> Vec<MemoryRegion<'_>> {
        let Ok(module) = self.game_module() else {
            return Vec::new();
        };

        // SAFETY: as for memory_data, the regions cannot outlive the borrow
        let from_map = unsafe { regions::from_memory_map(platform, &self.context.state.borrow().memory_map) };
        if let Some(found) = from_map {
            return found;
        }

        let _scope = CallbackScope::enter(&self.context);
        let found = unsafe { regions::from_memory_ids(platform, |id| module.memory(id)) };
        found.unwrap_or_else(|| {
            self.log(LogLevel::Warn, format_args!("No {} memory regions found", platform));
            Vec::new()
        })
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn core_path(&self) -> Option<PathBuf> {
        self.context.state.borrow().core_path.clone()
    }

    pub fn system_info(&self) -> Ref<'_, SystemInfo> {
        Ref::map(self.context.state.borrow(), |s| &s.system_info)
    }

    pub fn av_info(&self) -> SystemAvInfo {
        self.context.state.borrow().av_info
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.context.state.borrow().pixel_format
    }

    pub fn performance_level(&self) -> u32 {
        self.context.state.borrow().performance_level
    }

    /// Screen rotation in multiples of 90 degrees counter-clockwise
    pub fn rotation(&self) -> u32 {
        self.context.state.borrow().rotation
    }

    pub fn supports_no_game(&self) -> bool {
        self.context.state.borrow().supports_no_game
    }

    pub fn supports_achievements(&self) -> bool {
        self.context.state.borrow().supports_achievements
    }

    /// Whether the core asked the frontend to quit
    pub fn shutdown_requested(&self) -> bool {
        self.context.state.borrow().shutdown_requested
    }

    pub fn input_descriptors(&self) -> Ref<'_, [InputDescriptor]> {
        Ref::map(self.context.state.borrow(), |s| s.input_descriptors.as_slice())
    }

    pub fn variables(&self) -> Ref<'_, [Variable]> {
        Ref::map(self.context.state.borrow(), |s| s.variables.as_slice())
    }

    pub fn subsystems(&self) -> Ref<'_, [SubsystemInfo]> {
        Ref::map(self.context.state.borrow(), |s| s.subsystems.as_slice())
    }

    pub fn controller_info(&self) -> Ref<'_, [ControllerInfo]> {
        Ref::map(self.context.state.borrow(), |s| s.controller_info.as_slice())
    }

    pub fn memory_map(&self) -> Ref<'_, MemoryMap> {
        Ref::map(self.context.state.borrow(), |s| &s.memory_map)
    }

    /// Device currently plugged into each port
    pub fn ports(&self) -> Ref<'_, [u32]> {
        Ref::map(self.context.state.borrow(), |s| s.ports.as_slice())
    }

    pub fn components(&self) -> Ref<'_, Components> {
        Ref::map(self.context.state.borrow(), |s| &s.components)
    }

    pub fn components_mut(&mut self) -> &mut Components {
        &mut self.context.state.get_mut().components
    }

    fn game_module(&self) -> Result<&NativeModule> {
        match &self.module {
            Some(module) if self.lifecycle.has_game() => Ok(module),
            _ => Err(self.invalid_state("GameLoaded")),
        }
    }

    fn require(&self, expected: LifecycleState) -> Result<()> {
        if self.lifecycle == expected {
            Ok(())
        } else {
            Err(self.invalid_state(expected.name()))
        }
    }

    fn invalid_state(&self, expected: &'static str) -> HostError {
        HostError::InvalidState {
            expected,
            actual: self.lifecycle.name(),
        }
    }

    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.context.state.borrow().log(level, args);
    }
}

impl Drop for CoreHost {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Hand the content's geometry and sample rate to the collaborators
fn negotiate_av(state: &mut HostState, mut av_info: SystemAvInfo) -> Result<()> {
    av_info.geometry = av_info.geometry.normalized();
    state.av_info = av_info;

    let g = av_info.geometry;
    state.log(
        LogLevel::Debug,
        format_args!(
            "AV info: {}x{} (max {}x{}), aspect {}, {} fps, {} Hz",
            g.base_width,
            g.base_height,
            g.max_width,
            g.max_height,
            g.aspect_ratio,
            av_info.timing.fps,
            av_info.timing.sample_rate
        ),
    );

    let format = state.pixel_format;
    if !state
        .components
        .video
        .set_geometry(g.base_width, g.base_height, g.aspect_ratio, format)
    {
        return Err(ContentError::AvNegotiation(format!(
            "video refused {}x{} {:?}",
            g.base_width, g.base_height, format
        ))
        .into());
    }

    if !state.components.audio.set_rate(av_info.timing.sample_rate) {
        return Err(ContentError::AvNegotiation(format!(
            "audio refused {} Hz",
            av_info.timing.sample_rate
        ))
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_buffer_truncates() {
        let mut buffer = SampleBuffer::new();
        let batch = vec![1i16; AUDIO_BUFFER_SAMPLES - 2];
        assert_eq!(buffer.push_batch(&batch), (AUDIO_BUFFER_SAMPLES - 2) / 2);

        assert_eq!(buffer.push_batch(&[2, 2, 3, 3]), 1);
        assert_eq!(buffer.as_slice().len(), AUDIO_BUFFER_SAMPLES);
        assert!(!buffer.push_frame(4, 4));
        assert_eq!(buffer.as_slice()[AUDIO_BUFFER_SAMPLES - 1], 2);

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.push_frame(5, 6));
        assert_eq!(buffer.as_slice(), &[5, 6]);
    }

    #[test]
    fn test_lifecycle_names() {
        assert_eq!(LifecycleState::GameLoaded.to_string(), "GameLoaded");
        assert!(LifecycleState::Running.has_game());
        assert!(!LifecycleState::CoreLoaded.has_game());
    }
}
