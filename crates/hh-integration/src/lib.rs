//! Frontend integration for hackable-host
//!
//! Concrete implementations of the host's collaborators and a [`Session`]
//! that wires them to a core and to memory inspection.

pub mod audio;
pub mod input;
pub mod loader;
pub mod logger;
pub mod options;
pub mod session;
pub mod video;

pub use audio::AudioComponent;
pub use input::{InputHandle, ScriptedInput};
pub use loader::FileLoader;
pub use logger::TracingLogger;
pub use options::CoreOptions;
pub use session::{RegionMatches, Session};
pub use video::{HeadlessVideo, VideoHandle, VideoRecord};
