//! Configuration for callscribe.
//!
//! Loaded from TOML with per-field defaults, then validated. The windowing
//! and silence constants live here rather than in the segmenter so a session
//! carries one checked configuration instead of scattered module constants.

use crate::defaults;
use crate::error::{CallscribeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub windowing: WindowingConfig,
    pub connection: ConnectionConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Microphone device name; `None` selects the default input device.
    pub device: Option<String>,
    /// Loopback/monitor device carrying the remote party's audio.
    pub system_device: Option<String>,
    pub sample_rate: u32,
    /// Samples per capture block delivered by the device callback.
    pub block_size: u32,
    /// Frame queue depth in blocks before the callback starts dropping.
    pub queue_capacity: usize,
}

/// Batch windowing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowingConfig {
    pub buffer_duration_secs: f32,
    pub overlap_secs: f32,
    pub silence_threshold: f32,
}

/// Outbound connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// `host:port` of the transcript consumer.
    pub endpoint: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            system_device: None,
            sample_rate: defaults::SAMPLE_RATE,
            block_size: defaults::BLOCK_SIZE,
            queue_capacity: defaults::QUEUE_CAPACITY,
        }
    }
}

impl Default for WindowingConfig {
    fn default() -> Self {
        Self {
            buffer_duration_secs: defaults::BUFFER_DURATION_SECS,
            overlap_secs: defaults::OVERLAP_SECS,
            silence_threshold: defaults::SILENCE_THRESHOLD,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CallscribeError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                CallscribeError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if it is missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(CallscribeError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported:
    /// - CALLSCRIBE_ENDPOINT → connection.endpoint
    /// - CALLSCRIBE_DEVICE → audio.device
    /// - CALLSCRIBE_SYSTEM_DEVICE → audio.system_device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("CALLSCRIBE_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.connection.endpoint = endpoint;
        }

        if let Ok(device) = std::env::var("CALLSCRIBE_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(device) = std::env::var("CALLSCRIBE_SYSTEM_DEVICE")
            && !device.is_empty()
        {
            self.audio.system_device = Some(device);
        }

        self
    }

    /// Check every value the pipelines depend on.
    ///
    /// Called on load and again by `Session::new`, so a hand-built config
    /// cannot smuggle in a zero sample rate or an overlap that swallows the
    /// whole window.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.block_size == 0 {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "audio.block_size".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.queue_capacity == 0 {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "audio.queue_capacity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.windowing.buffer_duration_secs <= 0.0 {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "windowing.buffer_duration_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.windowing.overlap_secs < 0.0
            || self.windowing.overlap_secs >= self.windowing.buffer_duration_secs
        {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "windowing.overlap_secs".to_string(),
                message: format!(
                    "must be in [0, {})",
                    self.windowing.buffer_duration_secs
                ),
            });
        }
        if !(0.0..1.0).contains(&self.windowing.silence_threshold) {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "windowing.silence_threshold".to_string(),
                message: "must be in [0, 1)".to_string(),
            });
        }
        if self.connection.endpoint.is_empty() {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "connection.endpoint".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// Returns ~/.config/callscribe/config.toml on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("callscribe").join("config.toml"))
    }
}
