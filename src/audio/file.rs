//! WAV file audio source for batch sessions.
//!
//! Decodes an entire file up front into the shape batch recognition expects:
//! mono `f32` samples at the target rate, peak-normalized to full scale.

use crate::error::{CallscribeError, Result};
use std::io::Read;
use std::path::Path;

/// A fully decoded audio file ready for windowing.
#[derive(Debug, Clone)]
pub struct DecodedFile {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl DecodedFile {
    /// Decode a WAV file from disk.
    pub fn open(path: &Path, target_rate: u32) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| CallscribeError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_reader(Box::new(std::io::Cursor::new(data)), target_rate).map_err(|e| {
            match e {
                CallscribeError::Decode { message, .. } => CallscribeError::Decode {
                    path: path.display().to_string(),
                    message,
                },
                other => other,
            }
        })
    }

    /// Decode WAV data from any reader.
    ///
    /// Accepts 16-bit integer and 32-bit float WAV, any channel count and any
    /// source rate. Multi-channel audio is folded to mono by averaging the
    /// channels; the result is resampled to `target_rate` and divided by its
    /// peak absolute sample (skipped when the peak is zero).
    pub fn from_reader(reader: Box<dyn Read + Send>, target_rate: u32) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| decode_error(e))?;

        let spec = wav_reader.spec();
        let source_rate = spec.sample_rate;
        let channels = spec.channels as usize;

        let raw: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => wav_reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(decode_error)?,
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(decode_error)?,
        };

        let mono = fold_to_mono(&raw, channels);
        let resampled = if source_rate != target_rate {
            resample(&mono, source_rate, target_rate)
        } else {
            mono
        };
        let samples = peak_normalize(resampled);

        Ok(Self {
            samples,
            sample_rate: target_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Consume the decoded file and return its samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

fn decode_error(e: hound::Error) -> CallscribeError {
    CallscribeError::Decode {
        path: "<reader>".to_string(),
        message: e.to_string(),
    }
}

/// Average interleaved channels down to one.
fn fold_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = (source_pos - source_idx as f64) as f32;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx];
                let right = samples[source_idx + 1];
                left + (right - left) * fraction
            }
        })
        .collect()
}

/// Scale the signal so its peak hits full scale; silence stays untouched.
fn peak_normalize(mut samples: Vec<f32>) -> Vec<f32> {
    let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak > 0.0 {
        for s in &mut samples {
            *s /= peak;
        }
    }
    samples
}
