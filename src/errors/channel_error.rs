use thiserror::Error;

use crate::core::stt::ibm_watson::ChannelState;

/// Result type for duplex channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors returned by [`crate::DuplexRecognitionChannel`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Invalid connection parameters or recognition options.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The outbound queue is full; the write was rejected.
    #[error("Write queue full ({capacity} pending writes)")]
    Backpressure { capacity: usize },

    /// The channel no longer accepts writes.
    #[error("Channel is {0} and no longer accepts writes")]
    NotWritable(ChannelState),

    /// Transport failure on the underlying connection.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Hard failure of the chunk decoder on a payload without a concatenation
/// marker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Failed to parse payload as JSON: {message}")]
    Parse { message: String, payload: String },
}

impl DecodeError {
    /// The payload that failed to parse.
    pub fn payload(&self) -> &str {
        match self {
            Self::Parse { payload, .. } => payload,
        }
    }
}

/// Errors from the deprecated one-shot recognition calls.
#[derive(Error, Debug)]
pub enum LegacyError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
