//! Vosk-based incremental recognition backend.
//!
//! Implements `IncrementalRecognizer` over the Vosk/Kaldi streaming decoder:
//! frames are fed continuously, partial hypotheses surface while an utterance
//! is in flight, and a final fragment appears at each utterance boundary.
//!
//! # Feature Gate
//!
//! Requires the `backend-vosk` feature and libvosk at link time:
//!
//! ```bash
//! cargo build --features backend-vosk
//! ```

use crate::error::{CallscribeError, Result};
use crate::stt::Fragment;
use crate::stt::recognizer::IncrementalRecognizer;
use std::path::PathBuf;

#[cfg(feature = "backend-vosk")]
use vosk::{CompleteResult, DecodingState, Model, Recognizer};

/// Configuration for the Vosk backend.
#[derive(Debug, Clone)]
pub struct VoskConfig {
    /// Path to the unpacked model directory.
    pub model_path: PathBuf,
    /// Report partial hypotheses between utterance boundaries.
    pub partial_results: bool,
}

impl Default for VoskConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/vosk-model-small-en-us-0.15"),
            partial_results: true,
        }
    }
}

/// Incremental recognizer backed by Vosk.
#[cfg(feature = "backend-vosk")]
pub struct VoskIncrementalRecognizer {
    recognizer: Recognizer,
    config: VoskConfig,
    model_name: String,
}

/// Incremental recognizer placeholder (without the `backend-vosk` feature).
///
/// Construction succeeds so the CLI wiring stays uniform; every recognition
/// call reports that the backend was compiled out.
#[cfg(not(feature = "backend-vosk"))]
pub struct VoskIncrementalRecognizer {
    #[allow(dead_code)]
    config: VoskConfig,
    model_name: String,
}

impl VoskIncrementalRecognizer {
    fn model_name_from(config: &VoskConfig) -> String {
        config
            .model_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

#[cfg(feature = "backend-vosk")]
impl VoskIncrementalRecognizer {
    /// Load the model and build a recognizer bound to one source's stream.
    pub fn new(config: VoskConfig, sample_rate: u32) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(CallscribeError::Recognition {
                message: format!("Vosk model not found at {}", config.model_path.display()),
            });
        }

        let model_name = Self::model_name_from(&config);
        let model_path = config.model_path.to_str().ok_or_else(|| {
            CallscribeError::Recognition {
                message: "Invalid UTF-8 in model path".to_string(),
            }
        })?;

        let model = Model::new(model_path).ok_or_else(|| CallscribeError::Recognition {
            message: format!("Failed to load Vosk model from {}", model_path),
        })?;

        let mut recognizer =
            Recognizer::new(&model, sample_rate as f32).ok_or_else(|| {
                CallscribeError::Recognition {
                    message: format!(
                        "Failed to create Vosk recognizer at {} Hz",
                        sample_rate
                    ),
                }
            })?;

        recognizer.set_max_alternatives(0);
        recognizer.set_words(false);

        Ok(Self {
            recognizer,
            config,
            model_name,
        })
    }

    fn fragment_from_complete(result: CompleteResult) -> Option<Fragment> {
        match result {
            CompleteResult::Single(single) => Some(Fragment::final_result(single.text)),
            CompleteResult::Multiple(multiple) => multiple
                .alternatives
                .first()
                .map(|alt| Fragment::final_result(alt.text)),
        }
    }
}

#[cfg(not(feature = "backend-vosk"))]
impl VoskIncrementalRecognizer {
    /// Create the stub recognizer (no model is loaded).
    pub fn new(config: VoskConfig, _sample_rate: u32) -> Result<Self> {
        let model_name = Self::model_name_from(&config);
        Ok(Self { config, model_name })
    }
}

#[cfg(feature = "backend-vosk")]
impl IncrementalRecognizer for VoskIncrementalRecognizer {
    fn accept_frame(&mut self, pcm: &[i16]) -> Result<Option<Fragment>> {
        let state = self.recognizer.accept_waveform(pcm).map_err(|e| {
            CallscribeError::Recognition {
                message: format!("Vosk waveform acceptance failed: {:?}", e),
            }
        })?;

        match state {
            DecodingState::Finalized => {
                Ok(Self::fragment_from_complete(self.recognizer.result()))
            }
            DecodingState::Running => {
                if self.config.partial_results {
                    let partial = self.recognizer.partial_result();
                    Ok(Some(Fragment::partial(partial.partial)))
                } else {
                    Ok(None)
                }
            }
            DecodingState::Failed => Err(CallscribeError::Recognition {
                message: "Vosk recognition failed for current frame".to_string(),
            }),
        }
    }

    fn finalize(&mut self) -> Result<Option<Fragment>> {
        Ok(Self::fragment_from_complete(self.recognizer.final_result()))
    }

    fn backend_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "backend-vosk"))]
impl IncrementalRecognizer for VoskIncrementalRecognizer {
    fn accept_frame(&mut self, _pcm: &[i16]) -> Result<Option<Fragment>> {
        Err(CallscribeError::Recognition {
            message: concat!(
                "Vosk backend not compiled in. ",
                "Rebuild with: cargo build --features backend-vosk ",
                "(requires libvosk)"
            )
            .to_string(),
        })
    }

    fn finalize(&mut self) -> Result<Option<Fragment>> {
        Ok(None)
    }

    fn backend_name(&self) -> &str {
        &self.model_name
    }
}
