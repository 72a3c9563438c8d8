//! Bounded sample FIFO shared between the emulation and audio threads
//!
//! The producer blocks while the FIFO is full, the consumer never blocks and
//! plays silence when it runs dry.

use parking_lot::Mutex;
use std::time::Duration;

/// Default wait between two attempts of a blocking write
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(1);

struct Ring {
    buffer: Box<[i16]>,
    /// Index of the oldest sample
    first: usize,
    occupied: usize,
}

impl Ring {
    fn free(&self) -> usize {
        self.buffer.len() - self.occupied
    }

    fn push(&mut self, data: &[i16]) -> usize {
        let size = self.buffer.len();
        let count = data.len().min(self.free());
        let last = (self.first + self.occupied) % size.max(1);

        let head = count.min(size - last);
        self.buffer[last..last + head].copy_from_slice(&data[..head]);
        self.buffer[..count - head].copy_from_slice(&data[head..count]);

        self.occupied += count;
        count
    }

    fn pop(&mut self, out: &mut [i16]) -> usize {
        let size = self.buffer.len();
        let count = out.len().min(self.occupied);

        let head = count.min(size - self.first);
        out[..head].copy_from_slice(&self.buffer[self.first..self.first + head]);
        out[head..count].copy_from_slice(&self.buffer[..count - head]);

        if size != 0 {
            self.first = (self.first + count) % size;
        }
        self.occupied -= count;
        count
    }
}

/// Ring buffer of interleaved `i16` samples
pub struct AudioFifo {
    ring: Mutex<Ring>,
}

impl AudioFifo {
    /// Create a FIFO holding `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(Ring {
                buffer: vec![0; capacity].into_boxed_slice(),
                first: 0,
                occupied: 0,
            }),
        }
    }

    /// FIFO sized for `duration_ms` of stereo audio at `sample_rate`
    pub fn with_duration(sample_rate: u32, duration_ms: u32) -> Self {
        let frames = (sample_rate as u64 * duration_ms as u64 / 1000).max(1) as usize;
        Self::new(frames * 2)
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().buffer.len()
    }

    pub fn occupied(&self) -> usize {
        self.ring.lock().occupied
    }

    pub fn free(&self) -> usize {
        self.ring.lock().free()
    }

    /// Drop everything buffered
    pub fn reset(&self) {
        let mut ring = self.ring.lock();
        ring.first = 0;
        ring.occupied = 0;
    }

    /// Append as much of `data` as fits, returns the number of samples written
    pub fn write(&self, data: &[i16]) -> usize {
        self.ring.lock().push(data)
    }

    /// Remove up to `out.len()` samples, returns the number read
    pub fn read(&self, out: &mut [i16]) -> usize {
        self.ring.lock().pop(out)
    }

    /// Append all of `data`, sleeping `backoff` whenever the FIFO is full
    ///
    /// Data larger than the FIFO is written in capacity sized chunks.
    pub fn write_blocking(&self, data: &[i16], backoff: Duration) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }

        for chunk in data.chunks(capacity) {
            while self.free() < chunk.len() {
                std::thread::sleep(backoff);
            }
            self.write(chunk);
        }
    }

    /// Fill `out` from the FIFO, padding with silence on underrun
    pub fn read_or_silence(&self, out: &mut [i16]) {
        let read = self.read(out);
        if read < out.len() {
            tracing::trace!("Audio underrun: {} of {} samples", read, out.len());
            out[read..].fill(0);
        }
    }

    /// Like [`read_or_silence`](Self::read_or_silence), converting to `f32`
    pub fn read_f32_or_silence(&self, out: &mut [f32]) {
        let mut ring = self.ring.lock();
        let mut sample = [0i16; 1];

        for value in out.iter_mut() {
            *value = if ring.pop(&mut sample) == 1 {
                sample[0] as f32 / 32768.0
            } else {
                0.0
            };
        }
    }
}
