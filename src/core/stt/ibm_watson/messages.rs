//! Typed payloads of the recognition WebSocket.
//!
//! Inbound objects are told apart by their top-level key (`results`,
//! `speaker_labels`, `error` or `state`). The only outbound control message
//! built here is `stop`; `start` carries the recognition options and comes
//! from [`super::config::RecognizeOptions::build_start_message`].

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Inbound Messages
// =============================================================================

/// One decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IbmWatsonMessage {
    Results(ResultsMessage),
    SpeakerLabels(SpeakerLabelsMessage),
    Error(ErrorMessage),
    State(StateMessage),
}

impl IbmWatsonMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Interpret an already decoded JSON value.
    ///
    /// `results` wins over `error` when both are present; the service attaches
    /// `warnings`, never errors, to result messages.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let Some(object) = value.as_object() else {
            return Err(serde_json::Error::custom("message is not a JSON object"));
        };

        if object.contains_key("results") {
            serde_json::from_value(value).map(Self::Results)
        } else if object.contains_key("speaker_labels") {
            serde_json::from_value(value).map(Self::SpeakerLabels)
        } else if object.contains_key("error") {
            serde_json::from_value(value).map(Self::Error)
        } else if object.contains_key("state") {
            serde_json::from_value(value).map(Self::State)
        } else {
            Err(serde_json::Error::custom(
                "expected a results, speaker_labels, error or state message",
            ))
        }
    }
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsMessage {
    pub results: Vec<RecognitionResult>,
    /// Position of `results[0]` among all results of the session.
    #[serde(default)]
    pub result_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

impl ResultsMessage {
    /// A message is final when its last result is final.
    pub fn is_final(&self) -> bool {
        self.results.last().is_some_and(|r| r.is_final)
    }

    /// Best transcript of the most recent result.
    pub fn transcript(&self) -> Option<&str> {
        self.results.last().and_then(RecognitionResult::best_transcript)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(rename = "final")]
    pub is_final: bool,
    /// Hypotheses, best first.
    pub alternatives: Vec<TranscriptionAlternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords_result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_alternatives: Option<Vec<WordAlternatives>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_utterance: Option<String>,
}

impl RecognitionResult {
    pub fn best(&self) -> Option<&TranscriptionAlternative> {
        self.alternatives.first()
    }

    /// Whitespace-trimmed transcript of the best hypothesis.
    pub fn best_transcript(&self) -> Option<&str> {
        self.best().map(|alt| alt.transcript.trim())
    }

    /// Only final results carry a confidence.
    pub fn confidence(&self) -> Option<f64> {
        self.best().and_then(|alt| alt.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionAlternative {
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Present when the `timestamps` option was set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timestamps: Vec<WordTiming>,
    /// Present when the `word_confidence` option was set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub word_confidence: Vec<WordConfidence>,
}

/// Wire form `["word", start, end]`, times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, f64, f64)", into = "(String, f64, f64)")]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl From<(String, f64, f64)> for WordTiming {
    fn from((word, start, end): (String, f64, f64)) -> Self {
        Self { word, start, end }
    }
}

impl From<WordTiming> for (String, f64, f64) {
    fn from(timing: WordTiming) -> Self {
        (timing.word, timing.start, timing.end)
    }
}

/// Wire form `["word", confidence]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, f64)", into = "(String, f64)")]
pub struct WordConfidence {
    pub word: String,
    pub confidence: f64,
}

impl From<(String, f64)> for WordConfidence {
    fn from((word, confidence): (String, f64)) -> Self {
        Self { word, confidence }
    }
}

impl From<WordConfidence> for (String, f64) {
    fn from(score: WordConfidence) -> Self {
        (score.word, score.confidence)
    }
}

/// Confusion network slot, sent when `word_alternatives_threshold` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordAlternatives {
    pub start_time: f64,
    pub end_time: f64,
    pub alternatives: Vec<WordAlternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordAlternative {
    pub confidence: f64,
    pub word: String,
}

// =============================================================================
// Speaker Labels
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerLabelsMessage {
    pub speaker_labels: Vec<SpeakerLabel>,
}

/// Speaker attribution for one time span, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerLabel {
    pub from: f64,
    pub to: f64,
    pub speaker: i32,
    pub confidence: f64,
    #[serde(rename = "final")]
    pub is_final: bool,
}

// =============================================================================
// State and Errors
// =============================================================================

/// `{"state": "listening"}` is the only state the channel acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub state: String,
}

impl StateMessage {
    pub fn is_listening(&self) -> bool {
        self.state == "listening"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

// =============================================================================
// Outbound Control
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlMessage {
    /// End of audio. The service answers with its last results and then
    /// `listening`.
    Stop,
}
