use thiserror::Error;

/// Errors surfaced by the customization REST collaborator.
///
/// The service reports failures as `{"code": 404, "error": "..."}`; the
/// `code` field is kept so callers can tell service errors apart from the
/// synthetic timeout-class error produced by the waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Service returned {status} (code {code:?}): {message}")]
    Http {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from service: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// The structured `code` carried by a service error, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Http { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
