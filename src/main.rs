use anyhow::Result;
use callscribe::cli::{Cli, Commands};
use callscribe::config::Config;
use callscribe::session::{Session, SessionBackends, SessionProfile, ShutdownController};
use callscribe::stt::vosk::{VoskConfig, VoskIncrementalRecognizer};
use callscribe::stt::whisper::{WhisperBatchRecognizer, WhisperConfig};
use callscribe::{BatchRecognizer, IncrementalRecognizer};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Live {
            device,
            system_device,
            model,
        } => run_live(config, device, system_device, model).await,
        Commands::File {
            path,
            model,
            language,
        } => run_file(config, path, model, language).await,
        Commands::Devices => list_audio_devices(),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match (&cli.config, Config::default_path()) {
        (Some(path), _) => Config::load(path)?,
        (None, Some(path)) => Config::load_or_default(&path)?,
        (None, None) => Config::default(),
    };
    config = config.with_env_overrides();

    if let Some(endpoint) = &cli.endpoint {
        config.connection.endpoint = endpoint.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Spawn a Ctrl-C watcher that trips the session shutdown signal.
fn install_ctrl_c_handler(shutdown: &ShutdownController) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown.trigger();
        }
    });
}

async fn run_live(
    mut config: Config,
    device: Option<String>,
    system_device: Option<String>,
    model: Option<PathBuf>,
) -> Result<()> {
    #[cfg(feature = "cpal-audio")]
    callscribe::audio::capture::suppress_audio_warnings();

    if device.is_some() {
        config.audio.device = device;
    }
    if system_device.is_some() {
        config.audio.system_device = system_device;
    }

    // A monitor device for the remote party makes this a call: fixed
    // Agent/Caller labels with timestamps. A lone microphone gets numbered
    // speakers, like the file path.
    let profile = match &config.audio.system_device {
        Some(monitor) => SessionProfile::dual_channel(
            &config.connection.endpoint,
            config.audio.device.clone(),
            Some(monitor.clone()),
        ),
        None => SessionProfile::live_single(&config.connection.endpoint, config.audio.device.clone()),
    };

    let vosk_config = match model {
        Some(model_path) => VoskConfig {
            model_path,
            ..VoskConfig::default()
        },
        None => VoskConfig::default(),
    };

    let mut backends: Vec<Box<dyn IncrementalRecognizer>> = Vec::new();
    for _ in &profile.sources {
        backends.push(Box::new(VoskIncrementalRecognizer::new(
            vosk_config.clone(),
            config.audio.sample_rate,
        )?));
    }

    let session = Session::new(profile, config)?;
    let shutdown = ShutdownController::new();
    install_ctrl_c_handler(&shutdown);

    info!("Listening... press Ctrl-C to stop");
    let summary = session
        .run(SessionBackends::Incremental(backends), shutdown)
        .await?;
    info!(events = summary.events_emitted(), "Session complete");
    Ok(())
}

async fn run_file(
    config: Config,
    path: PathBuf,
    model: Option<PathBuf>,
    language: String,
) -> Result<()> {
    let mut whisper_config = WhisperConfig {
        language,
        ..WhisperConfig::default()
    };
    if let Some(model_path) = model {
        whisper_config.model_path = model_path;
    }

    let profile = SessionProfile::file_session(&config.connection.endpoint, path);
    let backends: Vec<Box<dyn BatchRecognizer>> =
        vec![Box::new(WhisperBatchRecognizer::new(whisper_config)?)];

    let session = Session::new(profile, config)?;
    let shutdown = ShutdownController::new();
    install_ctrl_c_handler(&shutdown);

    let summary = session
        .run(SessionBackends::Batch(backends), shutdown)
        .await?;
    info!(events = summary.events_emitted(), "Session complete");
    Ok(())
}

#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = callscribe::audio::capture::list_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found");
        return Ok(());
    }
    println!("Available input devices:");
    for device in devices {
        println!("  {}", device);
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    println!("Built without the cpal-audio feature; no device support");
    Ok(())
}
