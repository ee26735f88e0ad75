//! Overlapping window segmentation for batch recognition.
//!
//! A decoded file is cut into windows of `buffer_duration` seconds, each
//! advancing by `buffer_duration - overlap`: the trailing `overlap` seconds
//! of one window replay as the prefix of the next, so words straddling a
//! boundary appear whole in at least one window. Windows whose peak amplitude
//! sits below the silence threshold are gated out before recognition.

use crate::config::{Config, WindowingConfig};

/// Windowing parameters resolved to sample counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmenterConfig {
    pub window_samples: usize,
    pub overlap_samples: usize,
    pub silence_threshold: f32,
}

impl SegmenterConfig {
    /// Resolve second-based settings against a sample rate.
    ///
    /// Assumes the windowing config has been validated (overlap strictly
    /// shorter than the window).
    pub fn from_windowing(windowing: &WindowingConfig, sample_rate: u32) -> Self {
        Self {
            window_samples: (windowing.buffer_duration_secs * sample_rate as f32) as usize,
            overlap_samples: (windowing.overlap_secs * sample_rate as f32) as usize,
            silence_threshold: windowing.silence_threshold,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_windowing(&config.windowing, config.audio.sample_rate)
    }

    /// Step between consecutive window starts.
    fn stride(&self) -> usize {
        self.window_samples - self.overlap_samples
    }
}

/// One window of samples handed to batch recognition.
///
/// Windows borrow from the decoded file: every window is a contiguous slice
/// of the source array, since the overlap prefix is exactly the previous
/// window's tail.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    /// 0-based position in the window sequence.
    pub index: usize,
    /// Offset of the first sample in the source array.
    pub start: usize,
    pub samples: &'a [f32],
}

impl Window<'_> {
    /// Largest absolute sample in the window.
    pub fn peak_amplitude(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    /// True when the window should be dropped without a recognition call.
    pub fn is_silent(&self, threshold: f32) -> bool {
        self.peak_amplitude() < threshold
    }
}

/// Splits a sample array into overlapping windows.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Iterate the windows of `samples` in order.
    pub fn windows<'a>(&self, samples: &'a [f32]) -> WindowIter<'a> {
        WindowIter {
            samples,
            config: self.config,
            start: 0,
            index: 0,
        }
    }

    /// Number of windows a stream of `len` samples produces.
    ///
    /// Equals `ceil((L - O) / (D - O))`: a trailing stretch that adds nothing
    /// beyond the replayed overlap does not get its own window.
    pub fn window_count(&self, len: usize) -> usize {
        if len <= self.config.overlap_samples {
            return 0;
        }
        (len - self.config.overlap_samples).div_ceil(self.config.stride())
    }
}

/// Iterator over the windows of one sample array.
pub struct WindowIter<'a> {
    samples: &'a [f32],
    config: SegmenterConfig,
    start: usize,
    index: usize,
}

impl<'a> Iterator for WindowIter<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Window<'a>> {
        // A window starting here would only replay overlap, nothing new.
        if self.start + self.config.overlap_samples >= self.samples.len() {
            return None;
        }

        let end = (self.start + self.config.window_samples).min(self.samples.len());
        let window = Window {
            index: self.index,
            start: self.start,
            samples: &self.samples[self.start..end],
        };

        self.start += self.config.stride();
        self.index += 1;
        Some(window)
    }
}
