//! Event emission over the shared connection.
//!
//! The emitter is the only component that writes to the connection. Send
//! failures are absorbed here according to their fate: transmission errors
//! cost one event, a dead connection trips the session shutdown signal.

use crate::error::CallscribeError;
use crate::net::Connection;
use crate::session::shutdown::ShutdownController;
use crate::session::stats::SourceStats;
use crate::transcript::event::TranscriptEvent;
use crate::transcript::labeling::SpeakerLabeler;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, warn};

/// Builds and sends labeled transcript events.
///
/// Cheap to clone; every pipeline holds one.
#[derive(Clone)]
pub struct TranscriptEmitter {
    connection: Arc<Connection>,
    labeler: Arc<SpeakerLabeler>,
    shutdown: ShutdownController,
}

impl TranscriptEmitter {
    pub fn new(
        connection: Arc<Connection>,
        labeler: Arc<SpeakerLabeler>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            connection,
            labeler,
            shutdown,
        }
    }

    /// Label, timestamp and send one finalized piece of text.
    ///
    /// Never fails from the caller's perspective: a failed send is logged,
    /// counted against the source, and the event is gone: no retry, no
    /// buffering. Returns true when the event made it onto the wire.
    pub async fn emit(&self, source_label: &str, text: &str, stats: &SourceStats) -> bool {
        // Normalization upstream guarantees non-empty text; a violation here
        // would put a junk event on the wire, so drop it loudly instead.
        if text.trim().is_empty() {
            warn!(source = source_label, "Dropping event with empty text");
            return false;
        }

        let event = TranscriptEvent::new(
            self.labeler.label_for(source_label),
            text,
            self.labeler.timestamp(),
        );

        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(source = source_label, "Failed to serialize event: {}", e);
                stats.events_dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        match self.connection.send_line(&payload).await {
            Ok(()) => {
                debug!(source = source_label, speaker = %event.speaker, "Event sent");
                stats.events_emitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e @ CallscribeError::Connection { .. }) => {
                error!(source = source_label, "Connection lost, stopping session: {}", e);
                stats.events_dropped.fetch_add(1, Ordering::Relaxed);
                self.shutdown.trigger();
                false
            }
            Err(e) => {
                warn!(source = source_label, "Event dropped: {}", e);
                stats.events_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}
