//! Per-source pipeline loops.
//!
//! One loop per recognition family. Both consume their source to the end,
//! absorb recognition failures by dropping the offending frame or window, and
//! emit only finalized fragments. Errors never escape a loop; the returned
//! state is the pipeline's outcome.

use crate::audio::queue::FrameConsumer;
use crate::segment::Segmenter;
use crate::session::shutdown::ShutdownSignal;
use crate::session::state::{PipelineState, PipelineStateMachine};
use crate::session::stats::SourceStats;
use crate::stt::recognizer::{BatchAdapter, IncrementalAdapter};
use crate::transcript::TranscriptEmitter;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

/// Drive an incremental recognizer from a live frame queue.
///
/// Runs until end-of-stream or shutdown. Partial fragments advance the
/// decoder but are never emitted; every final fragment becomes one event.
/// Returns the pipeline's terminal outcome.
pub async fn run_incremental_pipeline(
    source_label: String,
    mut consumer: FrameConsumer,
    mut adapter: IncrementalAdapter,
    emitter: TranscriptEmitter,
    stats: Arc<SourceStats>,
) -> PipelineState {
    let mut machine = PipelineStateMachine::new(&source_label);
    machine.transition(PipelineState::Open);
    machine.transition(PipelineState::Running);
    info!(source = %source_label, backend = adapter.backend_name(), "Live pipeline started");

    while let Some(frame) = consumer.pop().await {
        match adapter.accept_frame(&frame.samples) {
            Ok(Some(fragment)) if fragment.is_final => {
                emitter.emit(&source_label, &fragment.text, &stats).await;
            }
            Ok(_) => {
                // Partial hypothesis or nothing yet; later results supersede it.
            }
            Err(e) => {
                // The frame is lost, the stream goes on.
                stats.recognition_errors.fetch_add(1, Ordering::Relaxed);
                warn!(source = %source_label, "Dropping frame: {}", e);
            }
        }
    }

    // A cancelled pipeline discards buffered audio without flushing; a
    // natural end-of-stream flushes the trailing utterance.
    if !consumer.shutdown_requested() {
        match adapter.finalize() {
            Ok(Some(fragment)) if fragment.is_final => {
                emitter.emit(&source_label, &fragment.text, &stats).await;
            }
            Ok(_) => {}
            Err(e) => {
                stats.recognition_errors.fetch_add(1, Ordering::Relaxed);
                warn!(source = %source_label, "Discarding trailing utterance: {}", e);
            }
        }
    }

    machine.transition(PipelineState::Eof);
    machine.transition(PipelineState::Closed);
    info!(source = %source_label, "Live pipeline finished");
    PipelineState::Eof
}

/// Drive a batch recognizer across the windows of a decoded file.
///
/// Windows below the silence threshold never reach the recognizer. A failed
/// window is skipped; the session only loses that window's text.
pub async fn run_batch_pipeline(
    source_label: String,
    samples: Vec<f32>,
    segmenter: Segmenter,
    mut adapter: BatchAdapter,
    emitter: TranscriptEmitter,
    stats: Arc<SourceStats>,
    shutdown: ShutdownSignal,
) -> PipelineState {
    let mut machine = PipelineStateMachine::new(&source_label);
    machine.transition(PipelineState::Open);
    machine.transition(PipelineState::Running);
    info!(
        source = %source_label,
        backend = adapter.backend_name(),
        windows = segmenter.window_count(samples.len()),
        "Batch pipeline started"
    );

    let threshold = segmenter.config().silence_threshold;
    for window in segmenter.windows(&samples) {
        if shutdown.is_triggered() {
            debug!(source = %source_label, "Batch pipeline cancelled");
            break;
        }

        if window.is_silent(threshold) {
            stats.windows_gated.fetch_add(1, Ordering::Relaxed);
            debug!(source = %source_label, window = window.index, "Window gated as silence");
            continue;
        }

        match adapter.recognize_window(window.samples) {
            Ok(Some(fragment)) => {
                emitter.emit(&source_label, &fragment.text, &stats).await;
            }
            Ok(None) => {
                // Recognized as nothing worth saying.
            }
            Err(e) => {
                stats.recognition_errors.fetch_add(1, Ordering::Relaxed);
                warn!(source = %source_label, window = window.index, "Skipping window: {}", e);
            }
        }
    }

    machine.transition(PipelineState::Eof);
    machine.transition(PipelineState::Closed);
    info!(source = %source_label, "Batch pipeline finished");
    PipelineState::Eof
}
