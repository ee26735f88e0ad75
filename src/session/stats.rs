//! Per-source pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between a source's capture callback and its pipeline.
///
/// Everything is relaxed-atomic: the numbers feed logs and the session
/// summary, not control flow.
#[derive(Debug, Default)]
pub struct SourceStats {
    /// Frames accepted into the queue.
    pub frames_enqueued: AtomicU64,
    /// Frames dropped because the queue was full or closed.
    pub frames_dropped: AtomicU64,
    /// Windows skipped by the silence gate without a recognition call.
    pub windows_gated: AtomicU64,
    /// Recognition calls that failed (frame/window dropped).
    pub recognition_errors: AtomicU64,
    /// Events written to the connection.
    pub events_emitted: AtomicU64,
    /// Events discarded because the send failed.
    pub events_dropped: AtomicU64,
}

/// Plain-value copy of the counters, taken at session teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub frames_enqueued: u64,
    pub frames_dropped: u64,
    pub windows_gated: u64,
    pub recognition_errors: u64,
    pub events_emitted: u64,
    pub events_dropped: u64,
}

impl SourceStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_enqueued: self.frames_enqueued.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            windows_gated: self.windows_gated.load(Ordering::Relaxed),
            recognition_errors: self.recognition_errors.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}
