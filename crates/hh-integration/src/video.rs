//! Headless video output
//!
//! Nothing is displayed. Frames are counted and the latest one is kept so
//! callers can inspect or dump it.

use hh_libretro::{PixelFormat, Video, VideoFrame};
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything the core sent to the video output
#[derive(Debug, Clone, Default)]
pub struct VideoRecord {
    pub width: u32,
    pub height: u32,
    pub aspect: f32,
    pub format: PixelFormat,
    /// Refreshes, including duplicated frames
    pub frames: u64,
    pub duplicates: u64,
    /// Latest frame with row padding removed
    pub last_frame: Vec<u8>,
    pub last_size: (u32, u32),
    pub messages: Vec<(String, u32)>,
}

/// Shared view of a [`HeadlessVideo`]'s record
#[derive(Debug, Clone, Default)]
pub struct VideoHandle(Arc<Mutex<VideoRecord>>);

impl VideoHandle {
    pub fn with<R>(&self, f: impl FnOnce(&VideoRecord) -> R) -> R {
        f(&self.0.lock())
    }

    pub fn frames(&self) -> u64 {
        self.0.lock().frames
    }

    pub fn geometry(&self) -> (u32, u32, f32) {
        let record = self.0.lock();
        (record.width, record.height, record.aspect)
    }
}

/// [`Video`] that records instead of presenting
#[derive(Debug, Default)]
pub struct HeadlessVideo {
    record: VideoHandle,
}

impl HeadlessVideo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> VideoHandle {
        self.record.clone()
    }
}

impl Video for HeadlessVideo {
    fn set_geometry(&mut self, width: u32, height: u32, aspect: f32, format: PixelFormat) -> bool {
        if width == 0 || height == 0 {
            tracing::error!("Invalid video geometry {}x{}", width, height);
            return false;
        }

        let mut record = self.record.0.lock();
        record.width = width;
        record.height = height;
        record.aspect = aspect;
        record.format = format;
        tracing::info!("Video geometry {}x{} ({:.3}), {:?}", width, height, aspect, format);
        true
    }

    fn refresh(&mut self, frame: Option<VideoFrame<'_>>) {
        let mut record = self.record.0.lock();
        record.frames += 1;

        let Some(frame) = frame else {
            record.duplicates += 1;
            return;
        };

        record.last_frame.clear();
        for y in 0..frame.height {
            record.last_frame.extend_from_slice(frame.row(y));
        }
        record.last_size = (frame.width, frame.height);
    }

    fn show_message(&mut self, message: &str, frames: u32) {
        tracing::info!("OSD: {}", message);
        self.record.0.lock().messages.push((message.to_string(), frames));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_frames() {
        let mut video = HeadlessVideo::new();
        let handle = video.handle();
        assert!(video.set_geometry(4, 2, 2.0, PixelFormat::Rgb565));
        assert_eq!(handle.geometry(), (4, 2, 2.0));

        let data: Vec<u8> = (0..24).collect();
        video.refresh(Some(VideoFrame {
            data: &data,
            width: 4,
            height: 2,
            pitch: 12,
            format: PixelFormat::Rgb565,
        }));
        video.refresh(None);

        assert_eq!(handle.frames(), 2);
        handle.with(|r| {
            assert_eq!(r.duplicates, 1);
            assert_eq!(r.last_size, (4, 2));
            assert_eq!(r.last_frame[..8], [0, 1, 2, 3, 4, 5, 6, 7]);
            assert_eq!(r.last_frame[8..], [12, 13, 14, 15, 16, 17, 18, 19]);
        });
    }

    #[test]
    fn test_rejects_empty_geometry() {
        let mut video = HeadlessVideo::new();
        assert!(!video.set_geometry(0, 224, 1.0, PixelFormat::Xrgb8888));
    }

    #[test]
    fn test_messages() {
        let mut video = HeadlessVideo::new();
        video.show_message("Disk 1 inserted", 180);
        video
            .handle()
            .with(|r| assert_eq!(r.messages, vec![("Disk 1 inserted".to_string(), 180)]));
    }
}
