//! Frame type flowing from capture into the per-source pipeline.

use std::time::Instant;

/// One fixed-size block of mono 16-bit PCM from a single source.
///
/// Frames are ephemeral: the queue owns them from the capture callback until
/// the pipeline consumes them.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Per-source sequence number; consecutive within one source.
    pub sequence: u64,
    /// Timestamp when the block was captured.
    pub captured_at: Instant,
    /// Audio samples as 16-bit PCM.
    pub samples: Vec<i16>,
}

impl AudioFrame {
    /// Creates a new audio frame.
    pub fn new(sequence: u64, samples: Vec<i16>) -> Self {
        Self {
            sequence,
            captured_at: Instant::now(),
            samples,
        }
    }

    /// Returns the duration of this frame in milliseconds.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.samples.len() as u32 * 1000) / sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_keeps_sequence_and_samples() {
        let samples = vec![100i16, 200, 300];
        let frame = AudioFrame::new(42, samples.clone());

        assert_eq!(frame.sequence, 42);
        assert_eq!(frame.samples, samples);
    }

    #[test]
    fn frame_duration_at_16khz() {
        let frame = AudioFrame::new(0, vec![0i16; 16000]);
        assert_eq!(frame.duration_ms(16000), 1000);

        let frame = AudioFrame::new(1, vec![0i16; 4000]);
        assert_eq!(frame.duration_ms(16000), 250);
    }
}
