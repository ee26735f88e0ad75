//! callscribe - live call transcription streamed as labeled JSON events
//!
//! Audio flows source → frame queue → (segmenter) → recognizer → emitter →
//! connection. Each source runs its own pipeline; all pipelines share one
//! outbound connection behind a single-writer gate and one shutdown signal.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod net;
pub mod segment;
pub mod session;
pub mod stt;
pub mod transcript;

// Core traits (source → recognize → emit)
pub use audio::AudioSource;
pub use stt::recognizer::{BatchRecognizer, IncrementalRecognizer};

// Session orchestration
pub use session::{Session, SessionBackends, SessionProfile, SessionSummary, ShutdownController};

// Error handling
pub use error::{CallscribeError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
