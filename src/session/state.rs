//! Per-source pipeline lifecycle.
//!
//! Every source pipeline walks `Init → Open → Running → {Eof | Error} →
//! Closed`. The tracker logs transitions with the source label so a session's
//! interleaved logs stay attributable.

use tracing::{debug, warn};

/// Lifecycle states of one source pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Created, nothing opened yet.
    Init,
    /// Source opened, not yet consuming.
    Open,
    /// Consuming frames / windows.
    Running,
    /// Source ended normally (file exhausted, capture stopped).
    Eof,
    /// Pipeline died; siblings keep running.
    Error,
    /// Fully torn down.
    Closed,
}

impl PipelineState {
    /// Legal next states.
    fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Init, Open)
                | (Init, Error)
                | (Open, Running)
                | (Open, Error)
                | (Running, Eof)
                | (Running, Error)
                | (Eof, Closed)
                | (Error, Closed)
        )
    }

    /// True for the two terminal-outcome states before close.
    pub fn is_finished(self) -> bool {
        matches!(self, PipelineState::Eof | PipelineState::Error)
    }
}

/// Tracks and logs one pipeline's state.
#[derive(Debug)]
pub struct PipelineStateMachine {
    source_label: String,
    state: PipelineState,
}

impl PipelineStateMachine {
    pub fn new(source_label: &str) -> Self {
        Self {
            source_label: source_label.to_string(),
            state: PipelineState::Init,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Move to the next state, logging the transition.
    ///
    /// Illegal transitions are logged and ignored rather than panicking: a
    /// bookkeeping bug must not take down a pipeline that is otherwise fine.
    pub fn transition(&mut self, next: PipelineState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            warn!(
                source = %self.source_label,
                "Ignoring illegal pipeline transition {:?} -> {:?}",
                self.state,
                next
            );
            return;
        }
        debug!(
            source = %self.source_label,
            "Pipeline {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}
