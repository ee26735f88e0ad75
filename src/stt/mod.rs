//! Speech-to-text backends and result normalization.
//!
//! Two backend families exist, mirroring how call transcription is actually
//! served: incremental engines consume PCM frame-by-frame and report partial
//! hypotheses until an utterance boundary, batch engines consume one whole
//! window and commit immediately. A session picks one family and keeps it.

pub mod recognizer;
pub mod vosk;
pub mod whisper;

pub use recognizer::{
    BatchAdapter, BatchRecognizer, IncrementalAdapter, IncrementalRecognizer,
    MockBatchRecognizer, MockIncrementalRecognizer,
};

/// Text produced by one recognition call.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    /// Committed (utterance boundary / whole window) vs provisional.
    pub is_final: bool,
    pub confidence: Option<f32>,
}

impl Fragment {
    /// A provisional hypothesis, superseded by later fragments.
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence: None,
        }
    }

    /// A committed result.
    pub fn final_result(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Trim fragment text, discarding fragments that trim to nothing.
///
/// Every fragment leaving a backend passes through here, so no event can
/// carry empty or padded text regardless of backend quirks.
pub fn normalize(fragment: Fragment) -> Option<Fragment> {
    let text = fragment.text.trim();
    if text.is_empty() {
        return None;
    }
    Some(Fragment {
        text: text.to_string(),
        is_final: fragment.is_final,
        confidence: fragment.confidence,
    })
}
