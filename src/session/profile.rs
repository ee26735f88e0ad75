//! Session profile: which sources run, how speakers are labeled.
//!
//! One validated structure decides the session's shape up front instead of
//! forking pipeline logic per use case. The three presets mirror the ways a
//! call actually gets transcribed: dual-channel live, single-channel live,
//! and a recorded file.

use crate::defaults;
use crate::error::{CallscribeError, Result};
use crate::transcript::labeling::LabelPolicy;
use std::path::PathBuf;

/// One audio source bound to a speaker label for its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// Local party, captured from a microphone.
    Microphone {
        device: Option<String>,
        label: String,
    },
    /// Remote party, captured from a loopback/monitor device.
    SystemAudio {
        device: Option<String>,
        label: String,
    },
    /// Pre-recorded audio decoded from disk.
    File { path: PathBuf, label: String },
}

impl SourceSpec {
    pub fn label(&self) -> &str {
        match self {
            SourceSpec::Microphone { label, .. } => label,
            SourceSpec::SystemAudio { label, .. } => label,
            SourceSpec::File { label, .. } => label,
        }
    }

    pub fn is_live(&self) -> bool {
        !matches!(self, SourceSpec::File { .. })
    }
}

/// Which recognizer family the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Live sources, frame-by-frame recognition.
    Incremental,
    /// File sources, whole-window recognition.
    Batch,
}

/// Everything a session needs to know before it connects.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProfile {
    pub endpoint: String,
    pub labeling: LabelPolicy,
    pub sources: Vec<SourceSpec>,
}

impl SessionProfile {
    /// Dual-channel live call: mic is the agent, system audio the caller.
    ///
    /// Fixed-identity labels with timestamps.
    pub fn dual_channel(
        endpoint: &str,
        mic_device: Option<String>,
        system_device: Option<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            labeling: LabelPolicy::FixedIdentity,
            sources: vec![
                SourceSpec::Microphone {
                    device: mic_device,
                    label: defaults::AGENT_LABEL.to_string(),
                },
                SourceSpec::SystemAudio {
                    device: system_device,
                    label: defaults::CALLER_LABEL.to_string(),
                },
            ],
        }
    }

    /// Single-channel live capture with numbered speakers.
    pub fn live_single(endpoint: &str, device: Option<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            labeling: LabelPolicy::Numbered,
            sources: vec![SourceSpec::Microphone {
                device,
                label: "mic".to_string(),
            }],
        }
    }

    /// Recorded-file session with numbered speakers.
    pub fn file_session(endpoint: &str, path: PathBuf) -> Self {
        let label = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file")
            .to_string();
        Self {
            endpoint: endpoint.to_string(),
            labeling: LabelPolicy::Numbered,
            sources: vec![SourceSpec::File { path, label }],
        }
    }

    /// The recognizer family this profile requires.
    ///
    /// Only meaningful after `validate`, which rejects mixed live/file
    /// profiles.
    pub fn mode(&self) -> RecognitionMode {
        if self.sources.iter().any(|s| !s.is_live()) {
            RecognitionMode::Batch
        } else {
            RecognitionMode::Incremental
        }
    }

    /// Reject profiles no session can run.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "profile.endpoint".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.sources.is_empty() {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "profile.sources".to_string(),
                message: "at least one source is required".to_string(),
            });
        }

        let live = self.sources.iter().filter(|s| s.is_live()).count();
        if live != 0 && live != self.sources.len() {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "profile.sources".to_string(),
                message: "live and file sources cannot share a session".to_string(),
            });
        }

        for source in &self.sources {
            if source.label().is_empty() {
                return Err(CallscribeError::ConfigInvalidValue {
                    key: "profile.sources".to_string(),
                    message: "source labels must not be empty".to_string(),
                });
            }
        }

        // Under fixed identity the label is the speaker; duplicates would
        // merge two channels into one voice.
        if self.labeling == LabelPolicy::FixedIdentity {
            let mut seen = std::collections::HashSet::new();
            for source in &self.sources {
                if !seen.insert(source.label()) {
                    return Err(CallscribeError::ConfigInvalidValue {
                        key: "profile.sources".to_string(),
                        message: format!("duplicate speaker label '{}'", source.label()),
                    });
                }
            }
        }

        Ok(())
    }
}
