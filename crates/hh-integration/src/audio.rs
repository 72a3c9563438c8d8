//! Audio component
//!
//! Feeds the core's samples to the sound card through the resampling
//! output stage. Without a usable device the component swallows audio, so
//! headless runs are not paced by a FIFO nobody drains.

use hh_audio::{AudioFifo, AudioOutput, CpalAudioBackend};
use hh_core::config::AudioConfig;
use hh_core::AudioError;
use hh_libretro::Audio;
use std::sync::Arc;

struct Device {
    // Keeps the stream alive
    _backend: CpalAudioBackend,
    output: AudioOutput,
}

/// [`Audio`] playing through the default output device
pub struct AudioComponent {
    device: Option<Device>,
    samples_mixed: u64,
}

impl AudioComponent {
    /// Open the default device, or fall back to a silent component
    pub fn new(config: &AudioConfig) -> Self {
        if !config.enable {
            tracing::info!("Audio disabled");
            return Self::disabled();
        }

        match Self::open(config) {
            Ok(device) => Self {
                device: Some(device),
                samples_mixed: 0,
            },
            Err(e) => {
                tracing::warn!("Audio unavailable, running silent: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            device: None,
            samples_mixed: 0,
        }
    }

    fn open(config: &AudioConfig) -> Result<Device, AudioError> {
        let mut backend = CpalAudioBackend::new();
        backend.init()?;

        let rate = backend.sample_rate().unwrap_or(config.sample_rate);
        let fifo = Arc::new(AudioFifo::with_duration(rate, config.buffer_duration_ms));
        backend.start(Arc::clone(&fifo))?;

        let mut output = AudioOutput::new(rate, fifo);
        output.set_mute(config.mute);

        Ok(Device {
            _backend: backend,
            output,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.device.is_some()
    }

    pub fn set_mute(&mut self, mute: bool) {
        if let Some(device) = &mut self.device {
            device.output.set_mute(mute);
        }
    }

    /// Samples received from the core so far
    pub fn samples_mixed(&self) -> u64 {
        self.samples_mixed
    }
}

impl Audio for AudioComponent {
    fn set_rate(&mut self, rate: f64) -> bool {
        match &mut self.device {
            Some(device) => device.output.set_rate(rate),
            None => rate > 0.0,
        }
    }

    fn mix(&mut self, samples: &[i16]) {
        self.samples_mixed += samples.len() as u64;

        if let Some(device) = &mut self.device {
            device.output.mix(samples);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_accepts_everything() {
        let config = AudioConfig {
            enable: false,
            ..Default::default()
        };
        let mut audio = AudioComponent::new(&config);
        assert!(!audio.is_enabled());
        assert!(audio.set_rate(32040.5));
        assert!(!audio.set_rate(0.0));

        audio.mix(&[1, 2, 3, 4]);
        assert_eq!(audio.samples_mixed(), 4);
    }
}
