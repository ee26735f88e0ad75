//! Error types for callscribe.
//!
//! Each variant corresponds to one fate in the pipeline: device errors kill
//! their own source pipeline, decode errors kill a file session, recognition
//! and transmission errors are logged and skipped, and connection errors end
//! the whole session.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallscribeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Capture errors: fatal to the owning source pipeline only
    #[error("Audio device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("Audio capture failed on {source_label}: {message}")]
    Device {
        source_label: String,
        message: String,
    },

    // File decode errors: fatal to a file-mode session
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },

    // Recognition errors: the current frame or window is dropped
    #[error("Recognition failed: {message}")]
    Recognition { message: String },

    // Transmission errors: the current event is dropped
    #[error("Failed to send transcript event: {message}")]
    Transmission { message: String },

    // Connection errors: session-fatal
    #[error("Connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CallscribeError {
    /// True for errors that make the shared outbound connection unusable.
    ///
    /// These are the only errors allowed to cross a pipeline boundary: the
    /// session observes them and shuts every pipeline down.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, CallscribeError::Connection { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CallscribeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn config_file_not_found_display() {
        let error = CallscribeError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn config_invalid_value_display() {
        let error = CallscribeError::ConfigInvalidValue {
            key: "audio.sample_rate".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for audio.sample_rate: must be positive"
        );
    }

    #[test]
    fn device_not_found_display() {
        let error = CallscribeError::DeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn device_display_names_the_source() {
        let error = CallscribeError::Device {
            source_label: "Agent".to_string(),
            message: "stream stalled".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio capture failed on Agent: stream stalled"
        );
    }

    #[test]
    fn decode_display() {
        let error = CallscribeError::Decode {
            path: "call.wav".to_string(),
            message: "not a WAV file".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to decode call.wav: not a WAV file");
    }

    #[test]
    fn recognition_display() {
        let error = CallscribeError::Recognition {
            message: "decoder rejected the window".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Recognition failed: decoder rejected the window"
        );
    }

    #[test]
    fn transmission_display() {
        let error = CallscribeError::Transmission {
            message: "write timed out".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to send transcript event: write timed out"
        );
    }

    #[test]
    fn connection_display_names_the_endpoint() {
        let error = CallscribeError::Connection {
            endpoint: "127.0.0.1:9000".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Connection to 127.0.0.1:9000 failed: connection refused"
        );
    }

    #[test]
    fn only_connection_errors_are_connection_fatal() {
        let fatal = CallscribeError::Connection {
            endpoint: "127.0.0.1:9000".to_string(),
            message: "reset by peer".to_string(),
        };
        assert!(fatal.is_connection_fatal());

        let non_fatal = [
            CallscribeError::Transmission {
                message: "x".to_string(),
            },
            CallscribeError::Recognition {
                message: "x".to_string(),
            },
            CallscribeError::Device {
                source_label: "Agent".to_string(),
                message: "x".to_string(),
            },
        ];
        for error in non_fatal {
            assert!(!error.is_connection_fatal(), "{error} should not be fatal");
        }
    }

    #[test]
    fn from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: CallscribeError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: CallscribeError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<CallscribeError>();
        assert_sync::<CallscribeError>();
    }

    #[test]
    fn result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
