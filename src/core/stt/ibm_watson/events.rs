//! Channel lifecycle and the typed events a recognition channel emits.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::decoder::{DecodedChunk, decode_lenient};
use super::messages::{ErrorMessage, IbmWatsonMessage, ResultsMessage, SpeakerLabelsMessage};

// =============================================================================
// Channel State
// =============================================================================

/// Lifecycle of a duplex recognition channel.
///
/// `Connecting -> Open -> Closing -> Closed`, plus `Errored` from any
/// non-terminal state. `Closed` and `Errored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
    Errored,
}

impl ChannelState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }

    /// Writes are accepted (sent or queued) only before closing starts.
    pub fn accepts_writes(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    pub(crate) fn can_transition_to(&self, next: ChannelState) -> bool {
        use ChannelState::*;
        matches!(
            (self, next),
            (Connecting, Open)
                | (Connecting, Closing)
                | (Open, Closing)
                | (Closing, Closed)
                | (Connecting | Open | Closing, Errored)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Events
// =============================================================================

/// Where an error event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorEventKind {
    /// `{"error": ...}` sent by the service. The channel stays up.
    Service,
    /// An inbound payload that could not be decoded into a known message.
    /// The channel stays up.
    Decode,
    /// The connection failed. Always followed by the `Errored` state.
    Transport,
}

/// Error reported through the event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub kind: ErrorEventKind,
    pub message: String,
    /// Service error code, when the service supplied one.
    pub code: Option<i32>,
    /// The undecoded inbound payload, for decode failures.
    pub payload: Option<String>,
}

impl ErrorEvent {
    pub(crate) fn service(error: ErrorMessage) -> Self {
        Self {
            kind: ErrorEventKind::Service,
            message: error.error,
            code: error.code,
            payload: None,
        }
    }

    pub(crate) fn decode(message: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: ErrorEventKind::Decode,
            message: message.into(),
            code: None,
            payload: Some(payload.into()),
        }
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorEventKind::Transport,
            message: message.into(),
            code: None,
            payload: None,
        }
    }

    /// Transport errors end the channel; the others do not.
    pub fn is_terminal(&self) -> bool {
        self.kind == ErrorEventKind::Transport
    }
}

/// Event delivered by a recognition channel, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    StateChanged(ChannelState),
    /// Interim transcript, subject to change.
    PartialResult(ResultsMessage),
    /// Committed transcript segment.
    FinalResult(ResultsMessage),
    SpeakerLabels(SpeakerLabelsMessage),
    Error(ErrorEvent),
}

// =============================================================================
// Inbound Classification
// =============================================================================

/// What one inbound payload means to the channel.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
    /// `{"state": "listening"}`: ready for audio, or done after a stop.
    Listening,
    /// Any other state notification.
    State(String),
    Event(RecognitionEvent),
}

/// Decode and classify one inbound text payload.
///
/// Never fails: anything that is not a recognizable message becomes a
/// decode [`ErrorEvent`] carrying the payload.
pub(crate) fn classify_payload(payload: &str) -> Inbound {
    let value = match decode_lenient(payload) {
        DecodedChunk::Json(value) if value.is_object() => value,
        DecodedChunk::Json(_) => {
            return Inbound::Event(RecognitionEvent::Error(ErrorEvent::decode(
                "Payload is not a JSON object",
                payload,
            )));
        }
        DecodedChunk::Raw(raw) => {
            return Inbound::Event(RecognitionEvent::Error(ErrorEvent::decode(
                "Payload could not be decoded",
                raw,
            )));
        }
    };

    match IbmWatsonMessage::from_value(value) {
        Ok(IbmWatsonMessage::Results(results)) => {
            if results.is_final() {
                Inbound::Event(RecognitionEvent::FinalResult(results))
            } else {
                Inbound::Event(RecognitionEvent::PartialResult(results))
            }
        }
        Ok(IbmWatsonMessage::SpeakerLabels(labels)) => {
            Inbound::Event(RecognitionEvent::SpeakerLabels(labels))
        }
        Ok(IbmWatsonMessage::Error(error)) => {
            Inbound::Event(RecognitionEvent::Error(ErrorEvent::service(error)))
        }
        Ok(IbmWatsonMessage::State(state)) if state.is_listening() => Inbound::Listening,
        Ok(IbmWatsonMessage::State(state)) => Inbound::State(state.state),
        Err(e) => Inbound::Event(RecognitionEvent::Error(ErrorEvent::decode(
            format!("Unrecognized message: {e}"),
            payload,
        ))),
    }
}

// =============================================================================
// Event Stream
// =============================================================================

/// Stream of [`RecognitionEvent`]s from one channel.
///
/// Ends right after the terminal `StateChanged` event.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<RecognitionEvent>,
    finished: bool,
}

impl EventStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<RecognitionEvent>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }
}

impl Stream for EventStream {
    type Item = RecognitionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if matches!(event, RecognitionEvent::StateChanged(state) if state.is_terminal()) {
                    self.finished = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_state_transitions() {
        use ChannelState::*;
        assert!(Connecting.can_transition_to(Open));
        assert!(Connecting.can_transition_to(Closing));
        assert!(Open.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));
        assert!(Closing.can_transition_to(Errored));
        assert!(!Open.can_transition_to(Connecting));
        assert!(!Closed.can_transition_to(Errored));
        assert!(!Errored.can_transition_to(Closed));
        assert!(!Open.can_transition_to(Closed));
    }

    #[test]
    fn test_only_live_states_accept_writes() {
        assert!(ChannelState::Connecting.accepts_writes());
        assert!(ChannelState::Open.accepts_writes());
        assert!(!ChannelState::Closing.accepts_writes());
        assert!(!ChannelState::Closed.accepts_writes());
        assert!(!ChannelState::Errored.accepts_writes());
    }

    #[test]
    fn test_classify_partial_and_final() {
        let partial = r#"{"results":[{"final":false,"alternatives":[{"transcript":"hel"}]}],"result_index":0}"#;
        assert!(matches!(
            classify_payload(partial),
            Inbound::Event(RecognitionEvent::PartialResult(_))
        ));

        let last = r#"{"results":[{"final":true,"alternatives":[{"transcript":"hello"}]}],"result_index":0}"#;
        let concatenated = format!("{partial}{last}");
        match classify_payload(&concatenated) {
            Inbound::Event(RecognitionEvent::FinalResult(results)) => {
                assert_eq!(results.transcript(), Some("hello"));
            }
            other => panic!("Expected final result, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_listening_and_state() {
        assert_eq!(classify_payload(r#"{"state":"listening"}"#), Inbound::Listening);
        assert_eq!(
            classify_payload(r#"{"state":"closing"}"#),
            Inbound::State("closing".to_string())
        );
    }

    #[test]
    fn test_classify_service_error() {
        match classify_payload(r#"{"error":"No speech detected for 30s.","code":408}"#) {
            Inbound::Event(RecognitionEvent::Error(event)) => {
                assert_eq!(event.kind, ErrorEventKind::Service);
                assert_eq!(event.code, Some(408));
                assert!(!event.is_terminal());
            }
            other => panic!("Expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_garbage_carries_payload() {
        for payload in ["garbage", "[1,2]", r#"{"unknown":true}"#, r#"{"a":1}{oops"#] {
            match classify_payload(payload) {
                Inbound::Event(RecognitionEvent::Error(event)) => {
                    assert_eq!(event.kind, ErrorEventKind::Decode);
                    assert_eq!(event.payload.as_deref(), Some(payload));
                }
                other => panic!("Expected decode error for {payload}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_event_stream_ends_after_terminal_state() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = EventStream::new(rx);
        tx.send(RecognitionEvent::StateChanged(ChannelState::Open))
            .unwrap();
        tx.send(RecognitionEvent::StateChanged(ChannelState::Closed))
            .unwrap();
        tx.send(RecognitionEvent::StateChanged(ChannelState::Open))
            .unwrap();

        assert_eq!(
            stream.next().await,
            Some(RecognitionEvent::StateChanged(ChannelState::Open))
        );
        assert_eq!(
            stream.next().await,
            Some(RecognitionEvent::StateChanged(ChannelState::Closed))
        );
        assert_eq!(stream.next().await, None);
    }
}
