use thiserror::Error;

use super::api_error::ApiError;

/// Result type for readiness polling
pub type WaitResult<T> = Result<T, WaitError>;

/// Errors produced while waiting for a customization resource to settle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// Pre-poll validation found no corpora to wait for.
    #[error("Customization '{customization_id}' has no corpora")]
    NoCorpora { customization_id: String },

    /// The resource is still pending. Retryable; surfaced to the caller only
    /// once the attempt budget is spent.
    #[error("Still pending after {attempts} attempt(s) at {interval_ms} ms intervals: {message}")]
    Timeout {
        attempts: u32,
        interval_ms: u64,
        message: String,
    },

    /// The service reported a status string this client does not know.
    #[error("Unexpected status: {status}")]
    UnexpectedStatus { status: String },

    /// Customization training reached the `failed` state.
    #[error("Training failed for customization '{customization_id}'")]
    TrainingFailed { customization_id: String },

    /// The status check itself failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The wait was cancelled through its cancellation token.
    #[error("Wait cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl WaitError {
    /// Whether this is the synthetic timeout-class error that drives retries.
    ///
    /// This is the default retry predicate of [`crate::RetrySpec`].
    pub fn is_timeout_class(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
