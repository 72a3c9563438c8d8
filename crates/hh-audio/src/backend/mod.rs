//! Audio device backends

pub mod cpal_backend;

pub use cpal_backend::CpalAudioBackend;
