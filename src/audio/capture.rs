//! Live audio capture using CPAL (Cross-Platform Audio Library).
//!
//! The device callback runs on cpal's own thread and does exactly one thing:
//! a non-blocking push of the captured block into the source's frame queue.
//! Recognition never happens here, and the callback never waits; a full
//! queue costs the frame, not the real-time deadline.

use crate::audio::AudioSource;
use crate::audio::queue::FrameProducer;
use crate::error::{CallscribeError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA messages emitted during audio backend probing.
///
/// # Safety
/// Modifies environment variables, which is safe when called before any
/// threads are spawned.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for PipeWire/PulseAudio environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice input).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Check if a device name should be filtered out.
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List all available audio input devices with filtering and recommendations.
///
/// Preferred devices are marked with "\[recommended\]"; obviously unusable
/// ones (surround channels, HDMI, S/PDIF) are dropped.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| CallscribeError::Device {
        source_label: "enumeration".to_string(),
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }

            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Get the best default input device, preferring PipeWire/PulseAudio.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| CallscribeError::DeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Find an input device by exact name.
fn find_device(name: &str) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices().map_err(|e| CallscribeError::Device {
            source_label: name.to_string(),
            message: format!("Failed to enumerate devices: {}", e),
        })?;

        for device in devices {
            if let Ok(dev_name) = device.name()
                && dev_name == name
            {
                return Ok(device);
            }
        }

        Err(CallscribeError::DeviceNotFound {
            device: name.to_string(),
        })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only touched from the thread that owns the
/// `CpalAudioSource`; the wrapper merely lets that owner move between
/// threads while the stream is idle.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Live audio source backed by a CPAL input stream.
///
/// Captures 16-bit PCM mono at the configured rate, preferring an i16 stream
/// and falling back to f32 with sample conversion, then to the device's
/// native config with software channel folding and resampling.
pub struct CpalAudioSource {
    label: String,
    device: cpal::Device,
    stream: Option<SendableStream>,
    sample_rate: u32,
    block_size: u32,
}

impl CpalAudioSource {
    /// Create a live source bound to a device.
    ///
    /// `device_name` of `None` selects the preferred default input device.
    /// `label` names the source in logs and errors ("Agent", "Caller", ...).
    pub fn new(
        label: &str,
        device_name: Option<&str>,
        sample_rate: u32,
        block_size: u32,
    ) -> Result<Self> {
        let device = match device_name {
            Some(name) => find_device(name)?,
            None => get_best_default_device()?,
        };

        Ok(Self {
            label: label.to_string(),
            device,
            stream: None,
            sample_rate,
            block_size,
        })
    }

    fn stream_config(&self) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.block_size),
        }
    }

    fn device_error(&self, message: String) -> CallscribeError {
        CallscribeError::Device {
            source_label: self.label.clone(),
            message,
        }
    }

    /// Build the input stream, trying formats in order of preference.
    fn build_stream(&self, producer: FrameProducer) -> Result<cpal::Stream> {
        let config = self.stream_config();

        let label = self.label.clone();
        let err_callback = move |err: cpal::StreamError| {
            tracing::error!(source = %label, "Audio stream error: {}", err);
        };

        // i16 mono at the target rate; PipeWire/PulseAudio convert transparently
        let p = producer.clone();
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                p.push(data.to_vec());
            },
            err_callback.clone(),
            None,
        ) {
            return Ok(stream);
        }

        // f32 mono at the target rate, for devices that only expose floats
        let p = producer.clone();
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let converted: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                p.push(converted);
            },
            err_callback.clone(),
            None,
        ) {
            return Ok(stream);
        }

        // Fallback: capture at the device's native config, convert in software.
        self.build_stream_native(producer, err_callback)
    }

    /// Build a stream using the device's default config, with software channel
    /// folding (multi-channel → mono) and resampling (native rate → target).
    fn build_stream_native(
        &self,
        producer: FrameProducer,
        err_callback: impl FnMut(cpal::StreamError) + Send + Clone + 'static,
    ) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config = self
            .device
            .default_input_config()
            .map_err(|e| self.device_error(format!("Failed to query default input config: {}", e)))?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;

        let stream_config: cpal::StreamConfig = default_config.clone().into();

        tracing::info!(
            source = %self.label,
            "Using native audio format ({}ch/{}Hz/{:?}), converting in software",
            native_channels,
            native_rate,
            default_config.sample_format(),
        );

        match default_config.sample_format() {
            SampleFormat::I16 => {
                let p = producer;
                self.device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[i16], _: &cpal::InputCallbackInfo| {
                            p.push(convert_to_target(data, native_channels, native_rate, target_rate));
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| self.device_error(format!("Failed to build native i16 stream: {}", e)))
            }
            SampleFormat::F32 => {
                let p = producer;
                self.device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            let i16_data: Vec<i16> = data
                                .iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                                .collect();
                            p.push(convert_to_target(
                                &i16_data,
                                native_channels,
                                native_rate,
                                target_rate,
                            ));
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| self.device_error(format!("Failed to build native f32 stream: {}", e)))
            }
            fmt => Err(self.device_error(format!(
                "Unsupported native sample format: {:?}. Try a different --device.",
                fmt
            ))),
        }
    }
}

impl AudioSource for CpalAudioSource {
    fn open(&mut self, producer: FrameProducer) -> Result<()> {
        if self.stream.is_some() {
            return Ok(()); // Already open
        }

        let stream = self.build_stream(producer)?;
        stream
            .play()
            .map_err(|e| self.device_error(format!("Failed to start audio stream: {}", e)))?;

        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream
                .0
                .pause()
                .map_err(|e| self.device_error(format!("Failed to stop audio stream: {}", e)))?;
        }
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Fold multi-channel audio to mono and resample to the target rate.
fn convert_to_target(
    samples: &[i16],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<i16> {
    let mono: Vec<i16> = if channels <= 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    if source_rate == target_rate {
        mono
    } else {
        resample_i16(&mono, source_rate, target_rate)
    }
}

/// Linear interpolation resampling for the native-config fallback path.
fn resample_i16(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_filter_device_drops_unusable_names() {
        assert!(should_filter_device("surround51"));
        assert!(should_filter_device("front:CARD=PCH"));
        assert!(should_filter_device("HDMI Output"));
        assert!(should_filter_device("Digital Output S/PDIF"));
        assert!(!should_filter_device("pipewire"));
        assert!(!should_filter_device("Built-in Audio"));
    }

    #[test]
    fn is_preferred_device_matches_pipewire_and_pulse() {
        assert!(is_preferred_device("pipewire"));
        assert!(is_preferred_device("PipeWire"));
        assert!(is_preferred_device("PulseAudio"));
        assert!(!is_preferred_device("hw:0,0"));
        assert!(!is_preferred_device("default"));
    }

    #[test]
    fn convert_to_target_folds_stereo() {
        let stereo = [100i16, 200, 300, 400];
        let mono = convert_to_target(&stereo, 2, 16000, 16000);
        assert_eq!(mono, vec![150i16, 350]);
    }

    #[test]
    fn convert_to_target_passes_mono_through() {
        let samples = [1i16, 2, 3];
        assert_eq!(convert_to_target(&samples, 1, 16000, 16000), samples.to_vec());
    }

    #[test]
    fn resample_i16_halves_at_double_rate() {
        let samples = vec![500i16; 3200];
        let out = resample_i16(&samples, 32000, 16000);
        assert_eq!(out.len(), 1600);
        assert!(out.iter().all(|&s| (499..=501).contains(&s)));
    }

    #[test]
    fn resample_i16_identity_and_empty() {
        assert_eq!(resample_i16(&[7i16], 16000, 16000), vec![7i16]);
        assert!(resample_i16(&[], 48000, 16000).is_empty());
    }

    #[test]
    fn create_with_invalid_device_name_fails() {
        let source = CpalAudioSource::new("Agent", Some("NonExistentDevice12345"), 16000, 4000);
        assert!(source.is_err());
        match source {
            Err(CallscribeError::DeviceNotFound { device }) => {
                assert_eq!(device, "NonExistentDevice12345");
            }
            Err(CallscribeError::Device { .. }) => {
                // Acceptable on hosts where enumeration itself fails
            }
            _ => panic!("Expected a device error"),
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn create_with_default_device() {
        let source = CpalAudioSource::new("Agent", None, 16000, 4000);
        assert!(source.is_ok());
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn list_devices_returns_at_least_one_device() {
        let devices = list_devices().unwrap();
        assert!(!devices.is_empty());
        for device in &devices {
            assert!(!device.to_lowercase().contains("hdmi"));
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn open_close_multiple_times() {
        use crate::session::shutdown::ShutdownController;
        use crate::session::stats::SourceStats;
        use std::sync::Arc;

        let mut source = CpalAudioSource::new("Agent", None, 16000, 4000).unwrap();
        let controller = ShutdownController::new();
        let stats = Arc::new(SourceStats::default());

        for _ in 0..3 {
            let (producer, _consumer) =
                crate::audio::queue::frame_queue(8, stats.clone(), controller.signal());
            assert!(source.open(producer).is_ok());
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert!(source.close().is_ok());
        }
    }
}
