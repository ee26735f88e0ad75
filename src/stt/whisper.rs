//! Whisper-based batch recognition backend.
//!
//! Implements `BatchRecognizer` over whisper-rs. Each window is decoded
//! independently with a fresh inference state, matching the no-continuity
//! contract of batch mode.
//!
//! # Feature Gate
//!
//! Requires the `backend-whisper` feature and cmake to build:
//!
//! ```bash
//! cargo build --features backend-whisper
//! ```

use crate::error::{CallscribeError, Result};
use crate::stt::Fragment;
use crate::stt::recognizer::BatchRecognizer;
use std::path::PathBuf;

#[cfg(feature = "backend-whisper")]
use std::sync::Once;
#[cfg(feature = "backend-whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "backend-whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper backend.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the ggml model file.
    pub model_path: PathBuf,
    /// Language code (e.g., "en"); "auto" lets Whisper detect it.
    pub language: String,
    /// Number of inference threads (None = library default).
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-tiny.en.bin"),
            language: "en".to_string(),
            threads: None,
        }
    }
}

/// Batch recognizer backed by whisper-rs.
#[cfg(feature = "backend-whisper")]
pub struct WhisperBatchRecognizer {
    context: WhisperContext,
    config: WhisperConfig,
    model_name: String,
}

/// Batch recognizer placeholder (without the `backend-whisper` feature).
///
/// Construction succeeds so the CLI wiring stays uniform; every recognition
/// call reports that the backend was compiled out.
#[cfg(not(feature = "backend-whisper"))]
pub struct WhisperBatchRecognizer {
    #[allow(dead_code)]
    config: WhisperConfig,
    model_name: String,
}

impl WhisperBatchRecognizer {
    fn model_name_from(config: &WhisperConfig) -> String {
        config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

#[cfg(feature = "backend-whisper")]
impl WhisperBatchRecognizer {
    /// Load the model and build a recognizer.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Route whisper.cpp's own logging away from stderr (once).
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(CallscribeError::Recognition {
                message: format!("Whisper model not found at {}", config.model_path.display()),
            });
        }

        let model_name = Self::model_name_from(&config);

        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| CallscribeError::Recognition {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| CallscribeError::Recognition {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context,
            config,
            model_name,
        })
    }
}

#[cfg(not(feature = "backend-whisper"))]
impl WhisperBatchRecognizer {
    /// Create the stub recognizer (no model is loaded).
    pub fn new(config: WhisperConfig) -> Result<Self> {
        let model_name = Self::model_name_from(&config);
        Ok(Self { config, model_name })
    }
}

#[cfg(feature = "backend-whisper")]
impl BatchRecognizer for WhisperBatchRecognizer {
    fn recognize_window(&mut self, samples: &[f32]) -> Result<Fragment> {
        let mut state = self
            .context
            .create_state()
            .map_err(|e| CallscribeError::Recognition {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if self.config.language == "auto" {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| CallscribeError::Recognition {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut text = String::new();
        let mut confidence_sum = 0.0_f32;
        let mut segment_count = 0u32;
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
            confidence_sum += 1.0 - segment.no_speech_probability();
            segment_count += 1;
        }

        let mut fragment = Fragment::final_result(text);
        if segment_count > 0 {
            fragment = fragment
                .with_confidence((confidence_sum / segment_count as f32).clamp(0.0, 1.0));
        }
        Ok(fragment)
    }

    fn backend_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "backend-whisper"))]
impl BatchRecognizer for WhisperBatchRecognizer {
    fn recognize_window(&mut self, _samples: &[f32]) -> Result<Fragment> {
        Err(CallscribeError::Recognition {
            message: concat!(
                "Whisper backend not compiled in. ",
                "Rebuild with: cargo build --features backend-whisper ",
                "(requires cmake)"
            )
            .to_string(),
        })
    }

    fn backend_name(&self) -> &str {
        &self.model_name
    }
}
