//! Audio output stage
//!
//! Converts the core's sample stream to the device rate and feeds the FIFO.
//! The conversion ratio is nudged every call so the FIFO hovers around half
//! full, which keeps the emulation paced by the audio device.

use crate::fifo::{AudioFifo, DEFAULT_BACKOFF};
use crate::resampler::StereoResampler;
use std::sync::Arc;
use std::time::Duration;

/// Maximum relative ratio adjustment applied by rate control
pub const RATE_CONTROL_DELTA: f64 = 0.005;

/// Resampling writer in front of an [`AudioFifo`]
pub struct AudioOutput {
    fifo: Arc<AudioFifo>,
    device_rate: f64,
    core_rate: f64,
    original_ratio: f64,
    current_ratio: f64,
    resampler: Option<StereoResampler>,
    mute: bool,
    delta: f64,
    backoff: Duration,
    scratch: Vec<i16>,
}

impl AudioOutput {
    pub fn new(device_rate: u32, fifo: Arc<AudioFifo>) -> Self {
        Self {
            fifo,
            device_rate: device_rate as f64,
            core_rate: 0.0,
            original_ratio: 1.0,
            current_ratio: 1.0,
            resampler: None,
            mute: false,
            delta: RATE_CONTROL_DELTA,
            backoff: DEFAULT_BACKOFF,
            scratch: Vec::new(),
        }
    }

    /// Override the wait used while the FIFO is full
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Configure conversion from `core_rate` to the device rate
    pub fn set_rate(&mut self, core_rate: f64) -> bool {
        if !(core_rate > 0.0 && core_rate.is_finite()) {
            tracing::error!("Invalid core sample rate {}", core_rate);
            return false;
        }

        self.core_rate = core_rate;
        self.original_ratio = self.device_rate / core_rate;
        self.current_ratio = self.original_ratio;
        self.resampler = Some(StereoResampler::new(self.original_ratio));

        tracing::info!(
            "Resampler initialized to convert from {} to {}",
            core_rate,
            self.device_rate
        );
        true
    }

    /// Resample one step's worth of interleaved stereo samples into the FIFO
    ///
    /// Blocks while the FIFO lacks room for the converted block.
    pub fn mix(&mut self, samples: &[i16]) {
        let Some(resampler) = self.resampler.as_mut() else {
            tracing::trace!("Dropping {} samples, no rate configured", samples.len());
            return;
        };

        let half = self.fifo.capacity() as f64 / 2.0;
        if half > 0.0 {
            let direction = (self.fifo.free() as f64 - half) / half;
            self.current_ratio = self.original_ratio * (1.0 + self.delta * direction);
            resampler.set_ratio(self.current_ratio);
        }

        self.scratch.clear();
        resampler.process(samples, &mut self.scratch);

        // Whole frames only
        let len = self.scratch.len() & !1;
        self.scratch.truncate(len);

        if self.mute {
            self.scratch.fill(0);
        }

        self.fifo.write_blocking(&self.scratch, self.backoff);
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn core_rate(&self) -> f64 {
        self.core_rate
    }

    pub fn device_rate(&self) -> f64 {
        self.device_rate
    }

    /// Ratio used by the last [`mix`](Self::mix) call
    pub fn current_ratio(&self) -> f64 {
        self.current_ratio
    }

    pub fn fifo(&self) -> &Arc<AudioFifo> {
        &self.fifo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(device_rate: u32, capacity: usize) -> (AudioOutput, Arc<AudioFifo>) {
        let fifo = Arc::new(AudioFifo::new(capacity));
        (AudioOutput::new(device_rate, Arc::clone(&fifo)), fifo)
    }

    #[test]
    fn test_set_rate() {
        let (mut out, _) = output(48000, 1024);
        assert!(out.set_rate(32000.0));
        assert_eq!(out.current_ratio(), 1.5);
        assert_eq!(out.core_rate(), 32000.0);

        assert!(!out.set_rate(0.0));
        assert!(!out.set_rate(-1.0));
        assert_eq!(out.core_rate(), 32000.0);
    }

    #[test]
    fn test_mix_without_rate_is_dropped() {
        let (mut out, fifo) = output(48000, 1024);
        out.mix(&[1, 2, 3, 4]);
        assert_eq!(fifo.occupied(), 0);
    }

    #[test]
    fn test_rate_control_speeds_up_when_empty() {
        let (mut out, fifo) = output(44100, 4096);
        out.set_rate(44100.0);

        // Empty FIFO: all space free, ratio is raised by the full delta
        out.mix(&[0; 64]);
        assert!((out.current_ratio() - 1.005).abs() < 1e-9);
        assert!(fifo.occupied() > 0);
        assert_eq!(fifo.occupied() % 2, 0);
    }

    #[test]
    fn test_rate_control_slows_down_when_full() {
        let (mut out, fifo) = output(44100, 4096);
        out.set_rate(44100.0);
        fifo.write(&[0; 4000]);

        out.mix(&[]);
        assert!(out.current_ratio() < 1.0);
    }

    #[test]
    fn test_mute_writes_silence() {
        let (mut out, fifo) = output(44100, 4096);
        out.set_rate(44100.0);
        out.set_mute(true);
        assert!(out.is_muted());

        let samples: Vec<i16> = (0..200).map(|i| 1000 + i as i16).collect();
        out.mix(&samples);

        let mut drained = vec![1i16; fifo.occupied()];
        assert!(!drained.is_empty());
        fifo.read(&mut drained);
        assert!(drained.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_mix_blocks_until_consumer_drains() {
        let (out, fifo) = output(44100, 256);
        let mut out = out.with_backoff(Duration::from_millis(1));
        out.set_rate(44100.0);
        fifo.write(&[0; 256]);

        let consumer = {
            let fifo = Arc::clone(&fifo);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                let mut sink = [0i16; 256];
                fifo.read_or_silence(&mut sink);
            })
        };

        out.mix(&[100; 64]);
        consumer.join().unwrap();
        assert!(fifo.occupied() > 0);
    }
}
