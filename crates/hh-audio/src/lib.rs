//! Audio output for hackable-host
//!
//! Cores produce audio on the emulation thread while the device consumes it
//! on its own thread. The two meet in a bounded [`AudioFifo`]: the
//! [`AudioOutput`] stage resamples and blocks when the FIFO is full, the
//! device backend drains it and plays silence on underrun.

pub mod backend;
pub mod fifo;
pub mod output;
pub mod resampler;

pub use backend::CpalAudioBackend;
pub use fifo::AudioFifo;
pub use output::AudioOutput;
pub use resampler::StereoResampler;
