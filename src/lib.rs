//! IBM Watson Speech-to-Text client core.
//!
//! - [`DuplexRecognitionChannel`]: full-duplex streaming recognition over the
//!   `/v1/recognize` WebSocket, with a bounded FIFO write queue and typed
//!   result events.
//! - [`core::customization`]: bounded polling until corpora are analyzed or a
//!   custom language model is trained.
//! - [`config::SpeechConfig`]: YAML / environment configuration.

pub mod config;
pub mod core;
pub mod errors;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::SpeechConfig;
pub use self::core::*;
pub use errors::{
    ApiError, ChannelError, ChannelResult, DecodeError, LegacyError, WaitError, WaitResult,
};
