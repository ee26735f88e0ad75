//! Audio sources and the frame handoff between capture and processing.
//!
//! A live source delivers blocks from a device callback; a file source is
//! decoded whole. Either way the pipeline only ever sees `AudioFrame`s pulled
//! from a `FrameQueue`, so recognition code never touches device threads.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod file;
pub mod frame;
pub mod queue;

pub use file::DecodedFile;
pub use frame::AudioFrame;
pub use queue::{FrameConsumer, FrameProducer, frame_queue};

use crate::error::Result;

/// A live audio source that delivers fixed-size PCM blocks into a queue.
///
/// Implementations invoke delivery from their own thread; `open` must return
/// promptly and hand the producer to that thread. `close` stops delivery.
pub trait AudioSource: Send {
    /// Start delivering frames into the queue through `producer`.
    fn open(&mut self, producer: FrameProducer) -> Result<()>;

    /// Stop delivering frames and release the device.
    fn close(&mut self) -> Result<()>;

    /// Name of this source in logs and errors.
    fn label(&self) -> &str;
}

/// Scripted audio source for tests: replays canned blocks from a thread,
/// then closes the queue.
pub struct ScriptedAudioSource {
    label: String,
    blocks: Option<Vec<Vec<i16>>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ScriptedAudioSource {
    pub fn new(label: &str, blocks: Vec<Vec<i16>>) -> Self {
        Self {
            label: label.to_string(),
            blocks: Some(blocks),
            handle: None,
        }
    }
}

impl AudioSource for ScriptedAudioSource {
    fn open(&mut self, producer: FrameProducer) -> Result<()> {
        let blocks = self.blocks.take().unwrap_or_default();
        self.handle = Some(std::thread::spawn(move || {
            for block in blocks {
                producer.push(block);
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            // Dropping the producer signals end-of-stream.
        }));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::shutdown::ShutdownController;
    use crate::session::stats::SourceStats;
    use std::sync::Arc;

    #[tokio::test]
    async fn scripted_source_replays_blocks_then_ends() {
        let controller = ShutdownController::new();
        let stats = Arc::new(SourceStats::default());
        let (producer, mut consumer) = frame_queue(16, stats, controller.signal());

        let mut source = ScriptedAudioSource::new("Agent", vec![vec![1i16, 2], vec![3i16, 4]]);
        source.open(producer).unwrap();

        let first = consumer.pop().await.unwrap();
        assert_eq!(first.samples, vec![1i16, 2]);
        let second = consumer.pop().await.unwrap();
        assert_eq!(second.samples, vec![3i16, 4]);
        assert!(consumer.pop().await.is_none());

        source.close().unwrap();
        assert_eq!(source.label(), "Agent");
    }

    #[tokio::test]
    async fn scripted_source_with_no_blocks_ends_immediately() {
        let controller = ShutdownController::new();
        let stats = Arc::new(SourceStats::default());
        let (producer, mut consumer) = frame_queue(16, stats, controller.signal());

        let mut source = ScriptedAudioSource::new("Caller", vec![]);
        source.open(producer).unwrap();

        assert!(consumer.pop().await.is_none());
        source.close().unwrap();
    }
}
