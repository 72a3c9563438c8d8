//! Collaborators the host drives on behalf of a core
//!
//! The host never talks to a window, a sound card or a file system directly.
//! Everything a core asks for is routed to one of these traits, bundled
//! together in [`Components`].

use crate::types::{ControllerInfo, InputDescriptor, PixelFormat, SystemInfo, Variable};
use std::path::Path;

/// Severity of a message logged through the [`Logger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

pub trait Logger {
    fn log(&self, level: LogLevel, message: &str);
}

/// Directories and core options
pub trait CoreConfig {
    fn system_directory(&self) -> &Path;
    fn assets_directory(&self) -> &Path;
    fn save_directory(&self) -> &Path;

    /// Called once the core's identity is known, before it is initialized
    fn set_core(&mut self, _info: &SystemInfo) {}

    /// Replace the option catalogue declared by the core
    fn set_variables(&mut self, variables: &[Variable]);

    /// Whether any option changed since the last call
    fn variables_updated(&mut self) -> bool;

    /// Current value of an option
    fn variable(&self, key: &str) -> Option<&str>;
}

/// One software-rendered frame, borrowed from the core for the duration of
/// [`Video::refresh`]
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes between the start of two rows
    pub pitch: usize,
    pub format: PixelFormat,
}

impl VideoFrame<'_> {
    /// Pixels of row `y`, without the pitch padding
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        let len = self.width as usize * self.format.bytes_per_pixel();
        &self.data[start..start + len]
    }
}

pub trait Video {
    /// Configure the output, returns false if it cannot be honoured
    fn set_geometry(&mut self, width: u32, height: u32, aspect: f32, format: PixelFormat) -> bool;

    /// Present a frame, `None` repeats the previous one
    fn refresh(&mut self, frame: Option<VideoFrame<'_>>);

    fn show_message(&mut self, message: &str, frames: u32);
}

pub trait Audio {
    /// Configure the core's sample rate, returns false if unsupported
    fn set_rate(&mut self, rate: f64) -> bool;

    /// Interleaved stereo samples produced during one step
    fn mix(&mut self, samples: &[i16]);
}

pub trait Input {
    fn set_input_descriptors(&mut self, descriptors: &[InputDescriptor]);

    /// Device types per port, index is the port number
    fn set_controller_info(&mut self, info: &[ControllerInfo]);

    /// Whether any port assignment changed since the last call
    fn controllers_updated(&mut self) -> bool;

    /// Device id assigned to `port`
    fn controller(&self, port: u32) -> u32;

    fn poll(&mut self);

    fn read(&self, port: u32, device: u32, index: u32, id: u32) -> i16;
}

pub trait Loader {
    fn load(&mut self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// The full set of collaborators a [`CoreHost`](crate::CoreHost) needs
pub struct Components {
    pub logger: Box<dyn Logger>,
    pub config: Box<dyn CoreConfig>,
    pub video: Box<dyn Video>,
    pub audio: Box<dyn Audio>,
    pub input: Box<dyn Input>,
    pub loader: Box<dyn Loader>,
}
