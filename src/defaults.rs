//! Default configuration constants for callscribe.
//!
//! Shared across the configuration types so that CLI flags, TOML config and
//! test fixtures agree on the same baseline values.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and what both backend
/// families expect without further resampling.
pub const SAMPLE_RATE: u32 = 16_000;

/// Default capture block size in samples.
///
/// The capture callback delivers one block per invocation; 4000 samples is
/// 250ms at 16kHz, small enough to keep incremental recognition responsive.
pub const BLOCK_SIZE: u32 = 4_000;

/// Default frame queue capacity in blocks.
///
/// The capture callback drops frames once this many blocks are waiting for
/// the consumer. 32 blocks is 8 seconds at the default block size, ample for
/// transient recognition stalls.
pub const QUEUE_CAPACITY: usize = 32;

/// Default batch window duration in seconds.
pub const BUFFER_DURATION_SECS: f32 = 5.0;

/// Default window overlap in seconds.
///
/// The trailing second of each window is replayed as the prefix of the next
/// so that words straddling a window boundary are not lost.
pub const OVERLAP_SECS: f32 = 1.0;

/// Peak-amplitude threshold below which a window is treated as silence.
///
/// Applies to peak-normalized `f32` samples in `[-1.0, 1.0]`. Windows gated
/// here never reach the recognizer.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Default outbound endpoint for the transcript stream.
pub const ENDPOINT: &str = "127.0.0.1:9000";

/// Session keepalive tick interval in milliseconds.
pub const KEEPALIVE_INTERVAL_MS: u64 = 1_000;

/// Speaker label for the local (microphone) channel in a dual-channel session.
pub const AGENT_LABEL: &str = "Agent";

/// Speaker label for the remote (system-audio) channel in a dual-channel session.
pub const CALLER_LABEL: &str = "Caller";

/// Timestamp format attached to events under the fixed-identity policy.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_shorter_than_window() {
        assert!(OVERLAP_SECS < BUFFER_DURATION_SECS);
    }

    #[test]
    fn silence_threshold_is_a_normalized_amplitude() {
        assert!(SILENCE_THRESHOLD > 0.0 && SILENCE_THRESHOLD < 1.0);
    }

    #[test]
    fn block_size_is_a_fraction_of_a_second() {
        assert!(BLOCK_SIZE > 0 && BLOCK_SIZE < SAMPLE_RATE);
    }
}
