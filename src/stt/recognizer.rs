//! Recognition backend traits, normalizing adapters and mock backends.

use crate::error::Result;
use crate::stt::{Fragment, normalize};

/// An engine fed frame-by-frame, reporting hypotheses as they form.
///
/// Each call may yield a partial fragment (in-progress hypothesis), a final
/// fragment (utterance boundary reached), or nothing yet. Implementations
/// keep decoder state across calls; one instance serves exactly one source.
pub trait IncrementalRecognizer: Send {
    /// Feed one block of 16-bit PCM mono samples.
    fn accept_frame(&mut self, pcm: &[i16]) -> Result<Option<Fragment>>;

    /// Flush the trailing utterance at end-of-stream.
    fn finalize(&mut self) -> Result<Option<Fragment>>;

    /// Backend name for logs.
    fn backend_name(&self) -> &str;
}

/// An engine fed one whole window at a time.
///
/// Returns exactly one final fragment per window; windows are recognized
/// independently with no cross-window continuity.
pub trait BatchRecognizer: Send {
    /// Recognize one window of mono `f32` samples.
    fn recognize_window(&mut self, samples: &[f32]) -> Result<Fragment>;

    /// Backend name for logs.
    fn backend_name(&self) -> &str;
}

/// Normalizing wrapper over an incremental backend.
///
/// All text leaving the adapter is trimmed and non-empty; callers only ever
/// see fragments worth acting on.
pub struct IncrementalAdapter {
    backend: Box<dyn IncrementalRecognizer>,
}

impl IncrementalAdapter {
    pub fn new(backend: Box<dyn IncrementalRecognizer>) -> Self {
        Self { backend }
    }

    pub fn accept_frame(&mut self, pcm: &[i16]) -> Result<Option<Fragment>> {
        Ok(self.backend.accept_frame(pcm)?.and_then(normalize))
    }

    pub fn finalize(&mut self) -> Result<Option<Fragment>> {
        Ok(self.backend.finalize()?.and_then(normalize))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }
}

/// Normalizing wrapper over a batch backend.
pub struct BatchAdapter {
    backend: Box<dyn BatchRecognizer>,
}

impl BatchAdapter {
    pub fn new(backend: Box<dyn BatchRecognizer>) -> Self {
        Self { backend }
    }

    /// Recognize one window; `None` means the window produced no usable text.
    pub fn recognize_window(&mut self, samples: &[f32]) -> Result<Option<Fragment>> {
        let mut fragment = self.backend.recognize_window(samples)?;
        // Batch results are committed by definition, whatever the backend set.
        fragment.is_final = true;
        Ok(normalize(fragment))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }
}

/// Scripted incremental backend for tests.
///
/// Replays a fixed sequence of outcomes, one per `accept_frame` call, then
/// keeps returning `None`.
pub struct MockIncrementalRecognizer {
    script: std::collections::VecDeque<ScriptStep>,
    final_flush: Option<String>,
    calls: usize,
}

enum ScriptStep {
    Silent,
    Partial(String),
    Final(String),
    Fail(String),
}

impl MockIncrementalRecognizer {
    pub fn new() -> Self {
        Self {
            script: std::collections::VecDeque::new(),
            final_flush: None,
            calls: 0,
        }
    }

    /// Next call returns no fragment.
    pub fn then_silent(mut self) -> Self {
        self.script.push_back(ScriptStep::Silent);
        self
    }

    /// Next call returns a partial hypothesis.
    pub fn then_partial(mut self, text: &str) -> Self {
        self.script.push_back(ScriptStep::Partial(text.to_string()));
        self
    }

    /// Next call returns a final fragment.
    pub fn then_final(mut self, text: &str) -> Self {
        self.script.push_back(ScriptStep::Final(text.to_string()));
        self
    }

    /// Next call fails with a recognition error.
    pub fn then_fail(mut self, message: &str) -> Self {
        self.script.push_back(ScriptStep::Fail(message.to_string()));
        self
    }

    /// Text returned by `finalize` at end-of-stream.
    pub fn with_final_flush(mut self, text: &str) -> Self {
        self.final_flush = Some(text.to_string());
        self
    }

    /// Number of `accept_frame` calls seen so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Default for MockIncrementalRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalRecognizer for MockIncrementalRecognizer {
    fn accept_frame(&mut self, _pcm: &[i16]) -> Result<Option<Fragment>> {
        self.calls += 1;
        match self.script.pop_front() {
            None | Some(ScriptStep::Silent) => Ok(None),
            Some(ScriptStep::Partial(text)) => Ok(Some(Fragment::partial(text))),
            Some(ScriptStep::Final(text)) => Ok(Some(Fragment::final_result(text))),
            Some(ScriptStep::Fail(message)) => {
                Err(crate::error::CallscribeError::Recognition { message })
            }
        }
    }

    fn finalize(&mut self) -> Result<Option<Fragment>> {
        Ok(self.final_flush.take().map(Fragment::final_result))
    }

    fn backend_name(&self) -> &str {
        "mock-incremental"
    }
}

/// Scripted batch backend for tests.
///
/// Returns one canned response per window, failing on the window indices
/// listed in `fail_on`. Counts recognition calls so silence-gate tests can
/// assert no call happened.
pub struct MockBatchRecognizer {
    responses: Vec<String>,
    fail_on: Vec<usize>,
    calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl MockBatchRecognizer {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|s| s.to_string()).collect(),
            fail_on: Vec::new(),
            calls: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }

    /// Fail the Nth recognition call (0-based) instead of responding.
    pub fn failing_on(mut self, call_index: usize) -> Self {
        self.fail_on.push(call_index);
        self
    }

    /// Shared call counter, usable after the recognizer moves into a pipeline.
    pub fn call_counter(&self) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        self.calls.clone()
    }
}

impl BatchRecognizer for MockBatchRecognizer {
    fn recognize_window(&mut self, _samples: &[f32]) -> Result<Fragment> {
        let call = self
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if self.fail_on.contains(&call) {
            return Err(crate::error::CallscribeError::Recognition {
                message: format!("mock decode failure on call {}", call),
            });
        }
        let text = self
            .responses
            .get(call.min(self.responses.len().saturating_sub(1)))
            .cloned()
            .unwrap_or_default();
        Ok(Fragment::final_result(text))
    }

    fn backend_name(&self) -> &str {
        "mock-batch"
    }
}
