//! Session orchestration.
//!
//! A session connects once, fans out one task per source pipeline, keeps a
//! heartbeat loop alive, and joins everything on the way out. Failure scopes
//! are strict: a dead source leaves its siblings running, a dead connection
//! ends the session, and nothing is retried.

use crate::audio::queue::frame_queue;
use crate::audio::{AudioSource, DecodedFile};
use crate::config::Config;
use crate::defaults;
use crate::error::{CallscribeError, Result};
use crate::net::Connection;
use crate::segment::{Segmenter, SegmenterConfig};
use crate::session::pipeline::{run_batch_pipeline, run_incremental_pipeline};
use crate::session::profile::{RecognitionMode, SessionProfile, SourceSpec};
use crate::session::shutdown::ShutdownController;
use crate::session::state::PipelineState;
use crate::session::stats::{SourceStats, StatsSnapshot};
use crate::stt::recognizer::{
    BatchAdapter, BatchRecognizer, IncrementalAdapter, IncrementalRecognizer,
};
use crate::transcript::labeling::SpeakerLabeler;
use crate::transcript::TranscriptEmitter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, trace};

/// Recognition backends for a session, one per source, in source order.
pub enum SessionBackends {
    Incremental(Vec<Box<dyn IncrementalRecognizer>>),
    Batch(Vec<Box<dyn BatchRecognizer>>),
}

/// Terminal report for one source pipeline.
#[derive(Debug)]
pub struct SourceOutcome {
    pub label: String,
    pub state: PipelineState,
    pub stats: StatsSnapshot,
}

/// What the session did, per source.
#[derive(Debug)]
pub struct SessionSummary {
    pub outcomes: Vec<SourceOutcome>,
}

impl SessionSummary {
    /// Total events that made it onto the wire.
    pub fn events_emitted(&self) -> u64 {
        self.outcomes.iter().map(|o| o.stats.events_emitted).sum()
    }
}

/// One transcription run: connect, pipeline fan-out, teardown.
pub struct Session {
    profile: SessionProfile,
    config: Config,
}

/// A live source that is ready to open, or the reason it never will be.
enum BuiltSource {
    Ready(Box<dyn AudioSource>),
    Failed(CallscribeError),
}

impl Session {
    pub fn new(profile: SessionProfile, config: Config) -> Result<Self> {
        profile.validate()?;
        config.validate()?;
        Ok(Self { profile, config })
    }

    pub fn profile(&self) -> &SessionProfile {
        &self.profile
    }

    /// Run the session to completion.
    ///
    /// `shutdown` is the process-level stop signal; trigger it (Ctrl-C
    /// handler, test harness) to halt capture and close the connection
    /// without flushing in-flight audio.
    pub async fn run(
        &self,
        backends: SessionBackends,
        shutdown: ShutdownController,
    ) -> Result<SessionSummary> {
        match (self.profile.mode(), backends) {
            (RecognitionMode::Incremental, SessionBackends::Incremental(backends)) => {
                let built = self.build_live_sources();
                self.run_live_inner(built, backends, shutdown).await
            }
            (RecognitionMode::Batch, SessionBackends::Batch(backends)) => {
                self.run_batch_inner(backends, shutdown).await
            }
            _ => Err(CallscribeError::ConfigInvalidValue {
                key: "backends".to_string(),
                message: "backend family does not match the session's sources".to_string(),
            }),
        }
    }

    /// Run a live session with externally constructed sources.
    ///
    /// The production path builds cpal sources from the profile; tests inject
    /// scripted ones. Source order must match the profile.
    pub async fn run_live_with_sources(
        &self,
        sources: Vec<Box<dyn AudioSource>>,
        backends: Vec<Box<dyn IncrementalRecognizer>>,
        shutdown: ShutdownController,
    ) -> Result<SessionSummary> {
        let built = sources.into_iter().map(BuiltSource::Ready).collect();
        self.run_live_inner(built, backends, shutdown).await
    }

    fn check_backend_count(&self, count: usize) -> Result<()> {
        if count != self.profile.sources.len() {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "backends".to_string(),
                message: format!(
                    "{} backends for {} sources",
                    count,
                    self.profile.sources.len()
                ),
            });
        }
        Ok(())
    }

    /// Instantiate cpal sources for every live spec.
    ///
    /// A source that cannot be built becomes a `Failed` slot: its pipeline is
    /// born dead, the siblings are unaffected.
    #[cfg(feature = "cpal-audio")]
    fn build_live_sources(&self) -> Vec<BuiltSource> {
        use crate::audio::capture::CpalAudioSource;

        self.profile
            .sources
            .iter()
            .map(|spec| {
                let (device, label) = match spec {
                    SourceSpec::Microphone { device, label } => (device.as_deref(), label),
                    SourceSpec::SystemAudio { device, label } => (device.as_deref(), label),
                    SourceSpec::File { .. } => unreachable!("validated as live"),
                };
                match CpalAudioSource::new(
                    label,
                    device,
                    self.config.audio.sample_rate,
                    self.config.audio.block_size,
                ) {
                    Ok(source) => BuiltSource::Ready(Box::new(source)),
                    Err(e) => BuiltSource::Failed(e),
                }
            })
            .collect()
    }

    #[cfg(not(feature = "cpal-audio"))]
    fn build_live_sources(&self) -> Vec<BuiltSource> {
        self.profile
            .sources
            .iter()
            .map(|spec| {
                BuiltSource::Failed(CallscribeError::Device {
                    source_label: spec.label().to_string(),
                    message: "built without the cpal-audio feature".to_string(),
                })
            })
            .collect()
    }

    async fn run_live_inner(
        &self,
        built: Vec<BuiltSource>,
        backends: Vec<Box<dyn IncrementalRecognizer>>,
        shutdown: ShutdownController,
    ) -> Result<SessionSummary> {
        if built.len() != self.profile.sources.len() {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "sources".to_string(),
                message: format!(
                    "{} sources for {} profile entries",
                    built.len(),
                    self.profile.sources.len()
                ),
            });
        }
        self.check_backend_count(backends.len())?;

        // Connect before touching any audio source; an unreachable endpoint
        // aborts the whole session here.
        let connection = Arc::new(Connection::connect(&self.profile.endpoint).await?);
        info!(endpoint = %self.profile.endpoint, "Connected");

        let labeler = Arc::new(SpeakerLabeler::new(self.profile.labeling));
        let emitter = TranscriptEmitter::new(connection, labeler, shutdown.clone());

        let mut outcomes: Vec<Option<SourceOutcome>> = Vec::new();
        outcomes.resize_with(self.profile.sources.len(), || None);
        let mut open_sources: Vec<Box<dyn AudioSource>> = Vec::new();
        let mut tasks: JoinSet<(usize, PipelineState, StatsSnapshot)> = JoinSet::new();

        for (index, (source, backend)) in built.into_iter().zip(backends).enumerate() {
            let label = self.profile.sources[index].label().to_string();
            let stats = Arc::new(SourceStats::default());

            let mut source = match source {
                BuiltSource::Ready(source) => source,
                BuiltSource::Failed(e) => {
                    error!(source = %label, "Source unavailable: {}", e);
                    outcomes[index] = Some(SourceOutcome {
                        label,
                        state: PipelineState::Error,
                        stats: stats.snapshot(),
                    });
                    continue;
                }
            };

            let (producer, consumer) = frame_queue(
                self.config.audio.queue_capacity,
                stats.clone(),
                shutdown.signal(),
            );

            if let Err(e) = source.open(producer) {
                // Fatal to this pipeline only.
                error!(source = %label, "Failed to open source: {}", e);
                outcomes[index] = Some(SourceOutcome {
                    label,
                    state: PipelineState::Error,
                    stats: stats.snapshot(),
                });
                continue;
            }
            open_sources.push(source);

            let emitter = emitter.clone();
            let adapter = IncrementalAdapter::new(backend);
            let pipeline_stats = stats.clone();
            tasks.spawn(async move {
                let state =
                    run_incremental_pipeline(label, consumer, adapter, emitter, pipeline_stats.clone())
                        .await;
                (index, state, pipeline_stats.snapshot())
            });
        }

        self.wait_for_pipelines(&mut tasks, &mut outcomes, &shutdown)
            .await;

        for source in &mut open_sources {
            if let Err(e) = source.close() {
                error!(source = source.label(), "Failed to close source: {}", e);
            }
        }

        Ok(self.finish(outcomes))
    }

    async fn run_batch_inner(
        &self,
        backends: Vec<Box<dyn BatchRecognizer>>,
        shutdown: ShutdownController,
    ) -> Result<SessionSummary> {
        self.check_backend_count(backends.len())?;

        let connection = Arc::new(Connection::connect(&self.profile.endpoint).await?);
        info!(endpoint = %self.profile.endpoint, "Connected");

        // Decode everything first: a decode failure is fatal to a file-mode
        // session, so no pipeline should have started.
        let mut decoded = Vec::new();
        for spec in &self.profile.sources {
            let SourceSpec::File { path, label } = spec else {
                unreachable!("validated as batch");
            };
            let file = DecodedFile::open(path, self.config.audio.sample_rate)?;
            info!(
                source = %label,
                seconds = file.duration_secs() as f64,
                "Decoded {}",
                path.display()
            );
            decoded.push(file);
        }

        let labeler = Arc::new(SpeakerLabeler::new(self.profile.labeling));
        let emitter = TranscriptEmitter::new(connection, labeler, shutdown.clone());
        let segmenter = Segmenter::new(SegmenterConfig::from_config(&self.config));

        let mut outcomes: Vec<Option<SourceOutcome>> = Vec::new();
        outcomes.resize_with(self.profile.sources.len(), || None);
        let mut tasks: JoinSet<(usize, PipelineState, StatsSnapshot)> = JoinSet::new();

        for (index, (file, backend)) in decoded.into_iter().zip(backends).enumerate() {
            let label = self.profile.sources[index].label().to_string();
            let stats = Arc::new(SourceStats::default());
            let emitter = emitter.clone();
            let adapter = BatchAdapter::new(backend);
            let signal = shutdown.signal();
            let pipeline_stats = stats.clone();
            tasks.spawn(async move {
                let state = run_batch_pipeline(
                    label,
                    file.into_samples(),
                    segmenter,
                    adapter,
                    emitter,
                    pipeline_stats.clone(),
                    signal,
                )
                .await;
                (index, state, pipeline_stats.snapshot())
            });
        }

        self.wait_for_pipelines(&mut tasks, &mut outcomes, &shutdown)
            .await;

        Ok(self.finish(outcomes))
    }

    /// Keepalive loop: tick while pipelines run, then join them all.
    async fn wait_for_pipelines(
        &self,
        tasks: &mut JoinSet<(usize, PipelineState, StatsSnapshot)>,
        outcomes: &mut [Option<SourceOutcome>],
        shutdown: &ShutdownController,
    ) {
        let mut interval = tokio::time::interval(Duration::from_millis(
            defaults::KEEPALIVE_INTERVAL_MS,
        ));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut signal = shutdown.signal();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    trace!("Session keepalive");
                }
                _ = signal.triggered() => {
                    info!("Shutdown requested, stopping pipelines");
                    break;
                }
                joined = tasks.join_next() => {
                    match joined {
                        Some(result) => self.record_joined(result, outcomes),
                        None => break, // every pipeline finished on its own
                    }
                }
            }
        }

        // Stop whatever is still running, then collect it. Pipelines observe
        // the signal at their next suspension point.
        shutdown.trigger();
        while let Some(result) = tasks.join_next().await {
            self.record_joined(result, outcomes);
        }
    }

    fn record_joined(
        &self,
        result: std::result::Result<(usize, PipelineState, StatsSnapshot), tokio::task::JoinError>,
        outcomes: &mut [Option<SourceOutcome>],
    ) {
        match result {
            Ok((index, state, stats)) => {
                outcomes[index] = Some(SourceOutcome {
                    label: self.profile.sources[index].label().to_string(),
                    state,
                    stats,
                });
            }
            Err(e) => {
                // A panicked pipeline is an errored pipeline; its slot is
                // filled during finish().
                error!("Pipeline task failed: {}", e);
            }
        }
    }

    fn finish(&self, outcomes: Vec<Option<SourceOutcome>>) -> SessionSummary {
        let outcomes: Vec<SourceOutcome> = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| SourceOutcome {
                    label: self.profile.sources[index].label().to_string(),
                    state: PipelineState::Error,
                    stats: StatsSnapshot::default(),
                })
            })
            .collect();

        for outcome in &outcomes {
            info!(
                source = %outcome.label,
                state = ?outcome.state,
                emitted = outcome.stats.events_emitted,
                dropped_frames = outcome.stats.frames_dropped,
                recognition_errors = outcome.stats.recognition_errors,
                "Source finished"
            );
        }

        SessionSummary { outcomes }
    }
}
