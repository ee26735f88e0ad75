//! Session-wide speaker labeling and timestamping policy.
//!
//! Exactly one policy per session, chosen at construction and never mixed:
//!
//! - **FixedIdentity**: every source keeps its own label for its lifetime
//!   ("Agent", "Caller"), and every event carries local wall-clock time.
//! - **Numbered**: one counter spans all sources; every event gets a fresh
//!   "Speaker N" label and no timestamp.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Which labeling policy a session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Per-source fixed labels with wall-clock timestamps.
    FixedIdentity,
    /// Session-wide incrementing "Speaker N" labels, no timestamps.
    Numbered,
}

/// Applies the session's labeling policy to outgoing events.
///
/// Shared by every pipeline in the session; the numbered counter is atomic so
/// concurrent sources never mint the same label.
#[derive(Debug)]
pub struct SpeakerLabeler {
    policy: LabelPolicy,
    counter: AtomicU64,
}

impl SpeakerLabeler {
    pub fn new(policy: LabelPolicy) -> Self {
        Self {
            policy,
            counter: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> LabelPolicy {
        self.policy
    }

    /// Label for the next event from the given source.
    pub fn label_for(&self, source_label: &str) -> String {
        match self.policy {
            LabelPolicy::FixedIdentity => source_label.to_string(),
            LabelPolicy::Numbered => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
                format!("Speaker {}", n)
            }
        }
    }

    /// Timestamp for the next event, per policy.
    pub fn timestamp(&self) -> Option<String> {
        match self.policy {
            LabelPolicy::FixedIdentity => Some(
                chrono::Local::now()
                    .format(defaults::TIMESTAMP_FORMAT)
                    .to_string(),
            ),
            LabelPolicy::Numbered => None,
        }
    }
}
