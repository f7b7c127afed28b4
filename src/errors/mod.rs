//! Error types shared across the crate.
//!
//! Each concern owns one enum:
//! - [`WaitError`]: readiness polling (corpus analysis, customization training)
//! - [`ApiError`]: failures reported by the customization REST collaborator
//! - [`ChannelError`]: the duplex recognition channel
//! - [`DecodeError`]: hard failures of the inbound chunk decoder
//! - [`LegacyError`]: the deprecated one-shot recognition calls

pub mod api_error;
pub mod channel_error;
pub mod wait_error;

pub use api_error::ApiError;
pub use channel_error::{ChannelError, ChannelResult, DecodeError, LegacyError};
pub use wait_error::{WaitError, WaitResult};
