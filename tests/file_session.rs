//! End-to-end file sessions against a local TCP consumer.

use callscribe::config::Config;
use callscribe::error::CallscribeError;
use callscribe::session::{PipelineState, Session, SessionBackends, ShutdownController};
use callscribe::stt::MockBatchRecognizer;
use callscribe::transcript::TranscriptEvent;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

/// Accept one connection and collect every JSON line until the peer closes.
async fn event_server() -> (String, tokio::task::JoinHandle<Vec<TranscriptEvent>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        let mut events = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            events.push(TranscriptEvent::from_json(&line).unwrap());
        }
        events
    });
    (endpoint, server)
}

/// Write a WAV file and return its path.
fn write_wav(
    dir: &tempfile::TempDir,
    name: &str,
    sample_rate: u32,
    channels: u16,
    samples: &[i16],
) -> PathBuf {
    let path = dir.path().join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[tokio::test]
async fn twelve_second_file_produces_three_numbered_events() {
    let (endpoint, server) = event_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(&dir, "call.wav", 16000, 1, &vec![8000i16; 12 * 16000]);

    let session = Session::new(
        callscribe::SessionProfile::file_session(&endpoint, path),
        Config::default(),
    )
    .unwrap();

    let summary = session
        .run(
            SessionBackends::Batch(vec![Box::new(MockBatchRecognizer::new(&[
                "good morning",
                "how can i help",
                "thank you for calling",
            ]))]),
            ShutdownController::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].state, PipelineState::Eof);
    assert_eq!(summary.events_emitted(), 3);

    let events = server.await.unwrap();
    assert_eq!(events.len(), 3);
    // Numbered policy: fresh label per event, no timestamps.
    let speakers: Vec<_> = events.iter().map(|e| e.speaker.as_str()).collect();
    assert_eq!(speakers, vec!["Speaker 1", "Speaker 2", "Speaker 3"]);
    assert!(events.iter().all(|e| e.timestamp.is_none()));
    // Per-source order preserved.
    let texts: Vec<_> = events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["good morning", "how can i help", "thank you for calling"]
    );
}

#[tokio::test]
async fn stereo_high_rate_file_is_decoded_and_windowed() {
    let (endpoint, server) = event_server().await;
    let dir = tempfile::tempdir().unwrap();

    // 6 seconds of stereo at 32kHz: decode folds and resamples to 16kHz,
    // giving windows [0,5s) and [4s,6s).
    let samples: Vec<i16> = std::iter::repeat([6000i16, 2000i16])
        .take(6 * 32000)
        .flatten()
        .collect();
    let path = write_wav(&dir, "stereo.wav", 32000, 2, &samples);

    let session = Session::new(
        callscribe::SessionProfile::file_session(&endpoint, path),
        Config::default(),
    )
    .unwrap();

    let summary = session
        .run(
            SessionBackends::Batch(vec![Box::new(MockBatchRecognizer::new(&["one", "two"]))]),
            ShutdownController::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.events_emitted(), 2);
    let events = server.await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn decode_failure_on_one_window_skips_only_that_window() {
    let (endpoint, server) = event_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(&dir, "call.wav", 16000, 1, &vec![8000i16; 12 * 16000]);

    let backend = MockBatchRecognizer::new(&["first", "second", "third"]).failing_on(1);

    let session = Session::new(
        callscribe::SessionProfile::file_session(&endpoint, path),
        Config::default(),
    )
    .unwrap();

    let summary = session
        .run(
            SessionBackends::Batch(vec![Box::new(backend)]),
            ShutdownController::new(),
        )
        .await
        .unwrap();

    // The session finished normally despite the mid-session failure.
    assert_eq!(summary.outcomes[0].state, PipelineState::Eof);
    assert_eq!(summary.outcomes[0].stats.recognition_errors, 1);

    let events = server.await.unwrap();
    let texts: Vec<_> = events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "third"]);
}

#[tokio::test]
async fn silent_stretches_never_reach_the_recognizer() {
    let (endpoint, server) = event_server().await;
    let dir = tempfile::tempdir().unwrap();

    // Loud 0-4s, quiet 4-9s, loud 9-12s. The middle window [4s,9s) is
    // entirely quiet; after peak normalization it sits at 20/20000 = 0.001,
    // below the 0.01 gate. The outer windows both contain loud audio.
    let mut samples = vec![20000i16; 4 * 16000];
    samples.extend(vec![20i16; 5 * 16000]);
    samples.extend(vec![20000i16; 3 * 16000]);
    let path = write_wav(&dir, "gaps.wav", 16000, 1, &samples);

    let backend = MockBatchRecognizer::new(&["speech a", "speech b"]);
    let counter = backend.call_counter();

    let session = Session::new(
        callscribe::SessionProfile::file_session(&endpoint, path),
        Config::default(),
    )
    .unwrap();

    let summary = session
        .run(
            SessionBackends::Batch(vec![Box::new(backend)]),
            ShutdownController::new(),
        )
        .await
        .unwrap();

    // Windows: [0,5s) loud, [4s,9s) silent and gated, [8s,12s) loud.
    assert_eq!(summary.outcomes[0].stats.windows_gated, 1);
    assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 2);
    assert_eq!(summary.events_emitted(), 2);

    let events = server.await.unwrap();
    let texts: Vec<_> = events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["speech a", "speech b"]);
}

#[tokio::test]
async fn unreachable_endpoint_aborts_before_reading_audio() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    drop(listener);

    // The file does not even exist: if the session tried to decode before
    // connecting, the error would be Decode, not Connection.
    let session = Session::new(
        callscribe::SessionProfile::file_session(&endpoint, PathBuf::from("/nonexistent/call.wav")),
        Config::default(),
    )
    .unwrap();

    let result = session
        .run(
            SessionBackends::Batch(vec![Box::new(MockBatchRecognizer::new(&["x"]))]),
            ShutdownController::new(),
        )
        .await;

    match result {
        Err(CallscribeError::Connection { endpoint: reported, .. }) => {
            assert_eq!(reported, endpoint);
        }
        other => panic!("expected Connection error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn whole_file_below_threshold_produces_no_events() {
    let (endpoint, server) = event_server().await;
    let dir = tempfile::tempdir().unwrap();
    // All zeros: peak normalization is skipped, every window is silent.
    let path = write_wav(&dir, "silence.wav", 16000, 1, &vec![0i16; 12 * 16000]);

    let backend = MockBatchRecognizer::new(&["never"]);
    let counter = backend.call_counter();

    let session = Session::new(
        callscribe::SessionProfile::file_session(&endpoint, path),
        Config::default(),
    )
    .unwrap();

    let summary = session
        .run(
            SessionBackends::Batch(vec![Box::new(backend)]),
            ShutdownController::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.events_emitted(), 0);
    assert_eq!(summary.outcomes[0].stats.windows_gated, 3);
    assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 0);

    let events = server.await.unwrap();
    assert!(events.is_empty());
}
