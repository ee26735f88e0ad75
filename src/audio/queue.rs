//! Ordered frame handoff between a capture callback and a pipeline loop.
//!
//! The producer side lives inside the audio callback and must never block:
//! `push` is a `try_send` that drops the frame when the consumer is behind.
//! The consumer side is async and parks on `pop` until a frame, end-of-stream
//! or the session shutdown signal arrives.

use crate::audio::frame::AudioFrame;
use crate::session::shutdown::ShutdownSignal;
use crate::session::stats::SourceStats;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Creates a connected producer/consumer pair with the given capacity.
pub fn frame_queue(
    capacity: usize,
    stats: Arc<SourceStats>,
    shutdown: ShutdownSignal,
) -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        FrameProducer {
            tx,
            sequence: Arc::new(AtomicU64::new(0)),
            stats,
        },
        FrameConsumer { rx, shutdown },
    )
}

/// Non-blocking producer handle, owned by the capture callback.
///
/// Dropping every producer clone closes the queue: the consumer drains
/// whatever is buffered and then observes end-of-stream. Clones share one
/// sequence counter, so ordering stays global per source.
#[derive(Clone)]
pub struct FrameProducer {
    tx: mpsc::Sender<AudioFrame>,
    sequence: Arc<AtomicU64>,
    stats: Arc<SourceStats>,
}

impl FrameProducer {
    /// Enqueue one captured block without ever blocking.
    ///
    /// Returns false when the frame was dropped (queue full or consumer
    /// gone). Frame order is preserved for every frame that is accepted.
    pub fn push(&self, samples: Vec<i16>) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(AudioFrame::new(sequence, samples)) {
            Ok(()) => {
                self.stats.frames_enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Blocking (async) consumer handle, owned by the pipeline loop.
pub struct FrameConsumer {
    rx: mpsc::Receiver<AudioFrame>,
    shutdown: ShutdownSignal,
}

impl FrameConsumer {
    /// Wait for the next frame.
    ///
    /// Returns `None` on end-of-stream (producer dropped, queue drained) or
    /// when the session shutdown signal fires. On shutdown, frames still
    /// buffered in the queue are discarded without being delivered.
    pub async fn pop(&mut self) -> Option<AudioFrame> {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            biased;
            _ = shutdown.triggered() => None,
            frame = self.rx.recv() => frame,
        }
    }

    /// True once the session shutdown signal has fired.
    ///
    /// Lets the pipeline distinguish a normal end-of-stream (flush the
    /// recognizer) from a cancel (discard buffered audio).
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_triggered()
    }
}
