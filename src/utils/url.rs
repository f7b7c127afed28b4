//! Service URL handling
//!
//! A speech service is configured with one base URL
//! (`https://api.<region>.speech-to-text.watson.cloud.ibm.com/instances/<id>`).
//! The recognition WebSocket lives under the same host with a `ws`/`wss`
//! scheme, and the REST resources hang off the `https` form.

use thiserror::Error;
use url::Url;

const RECOGNIZE_PATH: &str = "/v1/recognize";

/// Errors that can occur while deriving endpoint URLs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,
}

fn parse_service_url(service_url: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(service_url.trim())?;
    if url.host_str().is_none() {
        return Err(UrlValidationError::MissingHost);
    }
    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(url),
        other => Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    }
}

/// Convert a service URL into the recognition WebSocket URL.
///
/// `http` becomes `ws` and `https` becomes `wss`; `/v1/recognize` is appended
/// unless the path already ends with it. Any existing query is dropped.
pub fn websocket_recognize_url(service_url: &str) -> Result<Url, UrlValidationError> {
    let mut url = parse_service_url(service_url)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        _ => "wss",
    };
    url.set_scheme(scheme)
        .map_err(|_| UrlValidationError::UnsupportedScheme(scheme.to_string()))?;

    let path = url.path().trim_end_matches('/').to_string();
    if !path.ends_with(RECOGNIZE_PATH) {
        url.set_path(&format!("{path}{RECOGNIZE_PATH}"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Convert a service URL into its HTTP base form, without a trailing slash.
pub fn rest_base_url(service_url: &str) -> Result<String, UrlValidationError> {
    let mut url = parse_service_url(service_url)?;

    let scheme = match url.scheme() {
        "ws" | "http" => "http",
        _ => "https",
    };
    url.set_scheme(scheme)
        .map_err(|_| UrlValidationError::UnsupportedScheme(scheme.to_string()))?;
    url.set_query(None);
    url.set_fragment(None);

    let path = url.path().trim_end_matches('/');
    let path = path.strip_suffix(RECOGNIZE_PATH).unwrap_or(path).to_string();
    url.set_path(&path);
    Ok(url.as_str().trim_end_matches('/').to_string())
}
