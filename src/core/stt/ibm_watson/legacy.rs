//! Deprecated one-shot HTTP recognition calls.
//!
//! Both calls are thin wrappers around the chunk decoder: the service may
//! answer with several result objects glued together, and only the decoded
//! last object is returned. New code should use
//! [`super::DuplexRecognitionChannel`].

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStream};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::config::{AuthHeader, RecognizeOptions};
use super::decoder::{DecodedChunk, decode_chunk};
use crate::errors::LegacyError;
use crate::utils::url::rest_base_url;

/// HTTP client for the one-shot recognize and session observe endpoints.
#[derive(Debug, Clone)]
pub struct LegacyRecognizeClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<AuthHeader>,
}

impl LegacyRecognizeClient {
    pub fn new(
        service_url: &str,
        auth: Option<AuthHeader>,
        disable_ssl_verification: bool,
    ) -> Result<Self, LegacyError> {
        let base_url =
            rest_base_url(service_url).map_err(|e| LegacyError::Configuration(e.to_string()))?;
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(disable_ssl_verification)
            .build()?;
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(auth) => request.header(auth.name(), auth.value()),
            None => request,
        }
    }

    /// POST one audio body with chunked transfer and decode the response.
    ///
    /// The `content-type` option becomes the request's `Content-Type`; every
    /// other option is sent as a query parameter.
    #[deprecated(note = "stream audio through DuplexRecognitionChannel instead")]
    pub async fn recognize_once<S>(
        &self,
        options: &RecognizeOptions,
        audio: S,
    ) -> Result<DecodedChunk, LegacyError>
    where
        S: TryStream + Send + Sync + 'static,
        S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        Bytes: From<S::Ok>,
    {
        let url = format!("{}/v1/recognize", self.base_url);
        let mut request = self
            .authorize(self.http.post(&url))
            .query(&http_query(options))
            .body(reqwest::Body::wrap_stream(audio));
        if let Some(content_type) = &options.content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        debug!("Sending one-shot recognize request to {}", url);
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        Ok(decode_chunk(&body)?)
    }

    /// GET the results of a recognition session, one decoded item per
    /// received chunk. Whitespace-only keep-alive chunks are skipped.
    #[deprecated(note = "read events from DuplexRecognitionChannel instead")]
    pub fn observe_result(
        &self,
        session_id: &str,
        interim_results: bool,
    ) -> impl Stream<Item = Result<DecodedChunk, LegacyError>> + '_ {
        let url = format!(
            "{}/v1/sessions/{}/observe_result",
            self.base_url, session_id
        );
        try_stream! {
            let request = self
                .authorize(self.http.get(&url))
                .query(&[("interim_results", interim_results)]);
            let response = check_status(request.send().await?).await?;

            let mut chunks = std::pin::pin!(response.bytes_stream());
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                let text = String::from_utf8_lossy(&chunk);
                if text.trim().is_empty() {
                    continue;
                }
                let decoded = decode_chunk(&text)?;
                if !decoded.is_object() {
                    warn!("Observed chunk did not decode to an object");
                }
                yield decoded;
            }
        }
    }
}

async fn check_status(response: Response) -> Result<Response, LegacyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LegacyError::Service {
        status: status.as_u16(),
        body,
    })
}

/// Options rendered as HTTP query parameters. Lists are comma-joined.
fn http_query(options: &RecognizeOptions) -> Vec<(String, String)> {
    let Ok(Value::Object(map)) = serde_json::to_value(options) else {
        return Vec::new();
    };
    map.into_iter()
        .filter(|(name, _)| name != "content-type")
        .map(|(name, value)| {
            let rendered = match value {
                Value::String(s) => s,
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                other => other.to_string(),
            };
            (name, rendered)
        })
        .collect()
}
