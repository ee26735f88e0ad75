//! Command-line interface for callscribe
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live call transcription streamed as labeled JSON events
#[derive(Parser, Debug)]
#[command(name = "callscribe", version, about = "Stream call transcripts as labeled JSON events")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Outbound endpoint override (host:port)
    #[arg(long, global = true, value_name = "ADDR")]
    pub endpoint: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe live audio and stream events until interrupted
    Live {
        /// Microphone device name (default: best available input)
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,

        /// Loopback/monitor device for the remote party; enables the
        /// dual-channel Agent/Caller session
        #[arg(long, value_name = "DEVICE")]
        system_device: Option<String>,

        /// Path to the Vosk model directory
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
    },

    /// Transcribe a recorded WAV file and stream events
    File {
        /// Path to the WAV file
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Path to the Whisper ggml model file
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,

        /// Language code for recognition (e.g., en); "auto" detects
        #[arg(long, value_name = "LANG", default_value = "en")]
        language: String,
    },

    /// List available audio input devices
    Devices,
}
