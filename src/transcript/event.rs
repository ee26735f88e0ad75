//! The transcript event wire format.
//!
//! One JSON object per event. The timestamp key is omitted entirely (not
//! null) when the session's labeling policy doesn't attach one.

use serde::{Deserialize, Serialize};

/// One labeled piece of recognized speech, immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub speaker: String,
    pub text: String,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`; only present under the
    /// fixed-identity labeling policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TranscriptEvent {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>, timestamp: Option<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            timestamp,
        }
    }

    /// Serialize to the JSON message body.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON message body.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_json_roundtrip_with_timestamp() {
        let event = TranscriptEvent::new(
            "Agent",
            "hello there",
            Some("2025-03-14 10:30:00".to_string()),
        );
        let json = event.to_json().unwrap();
        let parsed = TranscriptEvent::from_json(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn event_json_roundtrip_without_timestamp() {
        let event = TranscriptEvent::new("Speaker 3", "hi", None);
        let json = event.to_json().unwrap();
        let parsed = TranscriptEvent::from_json(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn timestamp_key_is_omitted_when_absent() {
        let event = TranscriptEvent::new("Speaker 1", "hi", None);
        let json = event.to_json().unwrap();
        assert!(!json.contains("timestamp"), "got: {json}");
    }

    #[test]
    fn json_uses_expected_keys() {
        let event = TranscriptEvent::new(
            "Caller",
            "can you hear me",
            Some("2025-03-14 10:30:05".to_string()),
        );
        let json = event.to_json().unwrap();
        assert!(json.contains("\"speaker\":\"Caller\""));
        assert!(json.contains("\"text\":\"can you hear me\""));
        assert!(json.contains("\"timestamp\":\"2025-03-14 10:30:05\""));
    }

    #[test]
    fn missing_timestamp_deserializes_as_none() {
        let event =
            TranscriptEvent::from_json("{\"speaker\":\"Speaker 1\",\"text\":\"hello\"}").unwrap();
        assert_eq!(event.timestamp, None);
        assert_eq!(event.speaker, "Speaker 1");
    }
}
