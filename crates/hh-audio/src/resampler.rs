//! Audio resampling
//!
//! Streaming linear interpolation of interleaved stereo `i16` samples. The
//! ratio may change between calls without discontinuities, which is what
//! dynamic rate control needs.

/// Stereo resampler
#[derive(Debug, Clone)]
pub struct StereoResampler {
    /// Output frames per input frame
    ratio: f64,
    /// Fractional read position, relative to `last`
    position: f64,
    /// Last input frame of the previous call
    last: [i16; 2],
}

impl StereoResampler {
    /// Create a resampler producing `ratio` output frames per input frame
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio,
            position: 0.0,
            last: [0, 0],
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Change the ratio, taking effect on the next call
    pub fn set_ratio(&mut self, ratio: f64) {
        if ratio > 0.0 && ratio.is_finite() {
            self.ratio = ratio;
        }
    }

    /// Resample `input` and append the result to `output`
    ///
    /// A trailing odd sample in `input` is ignored.
    pub fn process(&mut self, input: &[i16], output: &mut Vec<i16>) {
        let frames = input.len() / 2;
        if frames == 0 {
            return;
        }

        let frame = |index: usize| -> [i16; 2] {
            if index == 0 {
                self.last
            } else {
                [input[(index - 1) * 2], input[(index - 1) * 2 + 1]]
            }
        };

        let step = 1.0 / self.ratio;
        let mut position = self.position;
        output.reserve((frames as f64 * self.ratio) as usize * 2 + 2);

        while position < frames as f64 {
            let index = position as usize;
            let frac = position - index as f64;
            let a = frame(index);
            let b = frame(index + 1);

            for ch in 0..2 {
                let value = a[ch] as f64 + (b[ch] as f64 - a[ch] as f64) * frac;
                output.push(value.round() as i16);
            }
            position += step;
        }

        let tail = frame(frames);
        self.position = position - frames as f64;
        self.last = tail;
    }

    /// Forget the stream history
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.last = [0, 0];
    }
}
