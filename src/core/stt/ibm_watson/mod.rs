//! IBM Watson Speech-to-Text streaming recognition.
//!
//! This module turns the Watson `/v1/recognize` WebSocket into a typed,
//! backpressure-aware duplex channel: binary audio goes out, JSON result,
//! state and error messages come back as [`RecognitionEvent`]s.
//!
//! # Features
//!
//! - Full-duplex streaming with a bounded FIFO write queue
//! - Writes accepted while the connection is still being established
//! - Interim (partial) and final results, speaker labels
//! - Recovery of concatenated result objects (`{...}{...}`) on the wire
//! - Graceful stop handshake with a bounded close timeout
//! - Pause and resume of outbound audio
//! - Optional TLS verification bypass for development endpoints
//!
//! # Wire Protocol
//!
//! ```text
//! client                                   service
//!   │ ── GET /v1/recognize?model=... ──────▶ │  (WebSocket upgrade)
//!   │ ── {"action":"start", ...} ──────────▶ │
//!   │ ◀───────────── {"state":"listening"} ── │
//!   │ ── binary audio ... ─────────────────▶ │
//!   │ ◀─────────────── {"results":[...]} ──── │
//!   │ ── {"action":"stop"} ────────────────▶ │
//!   │ ◀─────────────── {"results":[...]} ──── │  (final results)
//!   │ ◀───────────── {"state":"listening"} ── │
//!   │ ── close ────────────────────────────▶ │
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use watson_speech::core::stt::ibm_watson::{
//!     AuthHeader, ChannelParams, DuplexRecognitionChannel, IbmAudioEncoding, IbmRegion,
//!     RecognitionEvent, RecognizeOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = RecognizeOptions {
//!         model: Some("en-US_Multimedia".to_string()),
//!         interim_results: Some(true),
//!         ..Default::default()
//!     }
//!     .with_encoding(IbmAudioEncoding::Linear16, 16000);
//!
//!     let params = ChannelParams::new(IbmRegion::UsSouth.service_url("my-instance"))
//!         .with_auth(AuthHeader::bearer(std::env::var("IAM_TOKEN")?))
//!         .with_options(options);
//!
//!     let mut channel = DuplexRecognitionChannel::open(params)?;
//!     let mut events = channel.events().expect("events taken once");
//!
//!     channel.write(vec![0u8; 3200])?;
//!     channel.stop();
//!
//!     while let Some(event) = events.next().await {
//!         if let RecognitionEvent::FinalResult(results) = event {
//!             println!("{}", results.transcript().unwrap_or_default());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # References
//!
//! - [WebSocket Interface](https://cloud.ibm.com/docs/speech-to-text?topic=speech-to-text-websockets)
//! - [API Reference](https://cloud.ibm.com/apidocs/speech-to-text)

mod channel;
pub mod config;
pub mod decoder;
mod events;
pub mod legacy;
pub mod messages;
mod tls;


pub use channel::DuplexRecognitionChannel;
pub use config::{
    AuthHeader, ChannelParams, DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_WRITE_QUEUE_CAPACITY, IbmAudioEncoding, IbmRegion, RecognizeOptions,
};
pub use decoder::{DecodedChunk, decode_chunk, decode_lenient};
pub use events::{ChannelState, ErrorEvent, ErrorEventKind, EventStream, RecognitionEvent};
pub use legacy::LegacyRecognizeClient;
pub use messages::{
    ErrorMessage, IbmWatsonMessage, RecognitionResult, ResultsMessage, SpeakerLabel,
    SpeakerLabelsMessage, StateMessage, TranscriptionAlternative, WordConfidence, WordTiming,
};
