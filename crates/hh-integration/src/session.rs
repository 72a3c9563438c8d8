//! Session runner
//!
//! A [`Session`] owns a [`CoreHost`] wired to the frontend components, runs
//! the loaded content and exposes its memory for searching.

use crate::audio::AudioComponent;
use crate::input::{InputHandle, ScriptedInput};
use crate::loader::FileLoader;
use crate::logger::TracingLogger;
use crate::options::CoreOptions;
use crate::video::{HeadlessVideo, VideoHandle};
use hh_core::{Config, HostError, Result};
use hh_libretro::{Components, CoreHost, LifecycleState, MemoryRegion, NativeModule, Platform};
use hh_memory::{AddressSet, Encoding, Operator, Snapshot, Width};
use std::path::Path;

/// Addresses of one region matching a search
#[derive(Debug, Clone)]
pub struct RegionMatches {
    pub region: &'static str,
    pub matches: AddressSet,
}

/// A core, its content and the components around them
pub struct Session {
    host: CoreHost,
    video: VideoHandle,
    input: InputHandle,
    platform: Platform,
    steps: u64,
}

impl Session {
    /// Build the components described by `config`
    pub fn new(config: &Config) -> Self {
        let video = HeadlessVideo::new();
        let input = ScriptedInput::new();
        let (video_handle, input_handle) = (video.handle(), input.handle());

        let components = Components {
            logger: Box::new(TracingLogger),
            config: Box::new(CoreOptions::new(config)),
            video: Box::new(video),
            audio: Box::new(AudioComponent::new(&config.audio)),
            input: Box::new(input),
            loader: Box::new(FileLoader),
        };

        Self {
            host: CoreHost::new(components),
            video: video_handle,
            input: input_handle,
            platform: Platform::Other,
            steps: 0,
        }
    }

    /// Load a core from disk and start `content` with it
    pub fn open(&mut self, core: &Path, content: Option<&Path>) -> Result<()> {
        self.host.load_core(core)?;
        self.start(content)
    }

    /// Like [`open`](Self::open) with an already bound core
    pub fn open_module(&mut self, module: NativeModule, content: Option<&Path>) -> Result<()> {
        self.host.load_module(module)?;
        self.start(content)
    }

    fn start(&mut self, content: Option<&Path>) -> Result<()> {
        self.host.load_game(content)?;
        self.platform = Platform::identify(&self.host.system_info());
        self.steps = 0;

        tracing::info!(
            "Running {} ({} platform)",
            self.host.system_info().library_name,
            self.platform
        );
        Ok(())
    }

    /// Step the core `count` times, stopping early if it asks to shut down
    ///
    /// Returns the number of steps taken.
    pub fn run_frames(&mut self, count: u32) -> Result<u32> {
        let state = self.host.lifecycle();
        if !state.has_game() {
            return Err(HostError::InvalidState {
                expected: LifecycleState::GameLoaded.name(),
                actual: state.name(),
            });
        }

        for done in 0..count {
            if self.host.shutdown_requested() {
                tracing::info!("Core requested shutdown after {} steps", done);
                return Ok(done);
            }
            self.host.step();
            self.steps += 1;
        }
        Ok(count)
    }

    /// Named memory regions of the running content
    pub fn regions(&self) -> Vec<MemoryRegion<'_>> {
        self.host.memory_regions(self.platform)
    }

    /// Copy every region, paired with its name
    pub fn snapshot_all(&self) -> Vec<(&'static str, Snapshot)> {
        self.regions()
            .iter()
            .map(|region| (region.name(), region.snapshot()))
            .collect()
    }

    /// Scan every region for values satisfying `op constant`
    pub fn search(
        &self,
        width: Width,
        encoding: Encoding,
        op: Operator,
        constant: u32,
    ) -> Vec<RegionMatches> {
        self.snapshot_all()
            .into_iter()
            .map(|(region, snapshot)| RegionMatches {
                region,
                matches: snapshot.filter(width, encoding, op, constant),
            })
            .collect()
    }

    /// Unload the content and the core
    pub fn close(&mut self) {
        if self.host.lifecycle() != LifecycleState::Unloaded {
            tracing::info!("Closing session after {} steps", self.steps);
        }
        self.host.destroy();
        self.platform = Platform::Other;
    }

    pub fn host(&self) -> &CoreHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut CoreHost {
        &mut self.host
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn video(&self) -> &VideoHandle {
        &self.video
    }

    pub fn input(&self) -> &InputHandle {
        &self.input
    }

    /// Steps run since the content was opened
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
