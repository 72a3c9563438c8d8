//! cpal audio backend
//!
//! Plays the contents of an [`AudioFifo`] on the default output device.

use crate::fifo::AudioFifo;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};
use hh_core::AudioError;
use std::sync::Arc;

/// cpal audio backend
pub struct CpalAudioBackend {
    host: Host,
    device: Option<Device>,
    config: Option<SupportedStreamConfig>,
    stream: Option<Stream>,
}

impl CpalAudioBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
            device: None,
            config: None,
            stream: None,
        }
    }

    /// Open the default output device
    pub fn init(&mut self) -> Result<(), AudioError> {
        let device = self
            .host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        tracing::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Device(format!("Failed to get output config: {}", e)))?;

        tracing::info!("Audio config: {:?}", config);

        self.device = Some(device);
        self.config = Some(config);

        Ok(())
    }

    /// Start playback, draining `fifo` from the device callback
    ///
    /// The FIFO carries interleaved stereo; other channel layouts are mapped
    /// from it per frame.
    pub fn start(&mut self, fifo: Arc<AudioFifo>) -> Result<(), AudioError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| AudioError::Device("Device not initialized".to_string()))?;
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| AudioError::Device("Config not initialized".to_string()))?;

        let stream_config: StreamConfig = config.clone().into();
        let channels = stream_config.channels as usize;
        let on_error = |err: cpal::StreamError| tracing::error!("Audio stream error: {}", err);

        let stream = match config.sample_format() {
            SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if channels == 2 {
                        fifo.read_f32_or_silence(data);
                    } else {
                        fill_frames(&fifo, data, channels, |s| s as f32 / 32768.0);
                    }
                },
                on_error,
                None,
            ),
            SampleFormat::I16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    if channels == 2 {
                        fifo.read_or_silence(data);
                    } else {
                        fill_frames(&fifo, data, channels, |s| s);
                    }
                },
                on_error,
                None,
            ),
            other => {
                return Err(AudioError::Stream(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| AudioError::Stream(format!("Failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(format!("Failed to play stream: {}", e)))?;

        self.stream = Some(stream);
        tracing::info!("Audio stream started");

        Ok(())
    }

    /// Stop audio playback
    pub fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| AudioError::Stream(format!("Failed to pause stream: {}", e)))?;
            tracing::info!("Audio stream stopped");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.config.as_ref().map(|c| c.sample_rate().0)
    }

    pub fn channels(&self) -> Option<u16> {
        self.config.as_ref().map(|c| c.channels())
    }
}

impl Default for CpalAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CpalAudioBackend {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Map stereo frames from the FIFO onto a device with `channels` channels
///
/// Mono gets the average of both sides; extra channels stay silent.
fn fill_frames<T: Copy + Default>(
    fifo: &AudioFifo,
    data: &mut [T],
    channels: usize,
    convert: impl Fn(i16) -> T,
) {
    let mut frame = [0i16; 2];

    for out in data.chunks_mut(channels.max(1)) {
        if fifo.read(&mut frame) < 2 {
            frame = [0, 0];
        }

        if channels == 1 {
            out[0] = convert(((frame[0] as i32 + frame[1] as i32) / 2) as i16);
        } else {
            for (ch, value) in out.iter_mut().enumerate() {
                *value = match ch {
                    0 | 1 => convert(frame[ch]),
                    _ => T::default(),
                };
            }
        }
    }
}
