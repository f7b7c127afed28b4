//! Customization REST collaborator.
//!
//! The waiters only need two read calls, so the REST surface is reduced to
//! the [`CustomizationApi`] trait. [`RestCustomizationClient`] implements it
//! over HTTP; tests substitute their own implementations.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::stt::ibm_watson::AuthHeader;
use crate::errors::ApiError;
use crate::utils::url::{UrlValidationError, rest_base_url};

// =============================================================================
// Status Values
// =============================================================================

/// Analysis status of a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusStatus {
    BeingProcessed,
    Analyzed,
    Undetermined,
    Unknown(String),
}

impl From<&str> for CorpusStatus {
    fn from(status: &str) -> Self {
        match status {
            "being_processed" => Self::BeingProcessed,
            "analyzed" => Self::Analyzed,
            "undetermined" => Self::Undetermined,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Training status of a custom language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomizationStatus {
    Pending,
    Training,
    Ready,
    Available,
    Failed,
    Unknown(String),
}

impl From<&str> for CustomizationStatus {
    fn from(status: &str) -> Self {
        match status {
            "pending" => Self::Pending,
            "training" => Self::Training,
            "ready" => Self::Ready,
            "available" => Self::Available,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

// =============================================================================
// Resources
// =============================================================================

/// A text corpus attached to a custom language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_words: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_vocabulary_words: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Corpus {
    pub fn status(&self) -> CorpusStatus {
        CorpusStatus::from(self.status.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CorpusList {
    corpora: Vec<Corpus>,
}

/// A custom language model. Fields this client does not model are kept in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageModel {
    pub customization_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model_name: Option<String>,
    /// Training progress in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LanguageModel {
    pub fn status(&self) -> CustomizationStatus {
        CustomizationStatus::from(self.status.as_str())
    }
}

// =============================================================================
// Collaborator Trait
// =============================================================================

#[async_trait]
pub trait CustomizationApi: Send + Sync {
    /// List the corpora of a custom language model.
    async fn list_corpora(&self, customization_id: &str) -> Result<Vec<Corpus>, ApiError>;

    /// Fetch a custom language model.
    async fn get_language_model(&self, customization_id: &str) -> Result<LanguageModel, ApiError>;
}

// =============================================================================
// REST Implementation
// =============================================================================

/// Structured error body returned by the service.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

/// [`CustomizationApi`] over the Watson REST interface.
#[derive(Debug, Clone)]
pub struct RestCustomizationClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<AuthHeader>,
}

impl RestCustomizationClient {
    /// `service_url` may use any of the http/https/ws/wss schemes.
    pub fn new(service_url: &str, auth: Option<AuthHeader>) -> Result<Self, UrlValidationError> {
        Ok(Self::with_client(
            reqwest::Client::new(),
            rest_base_url(service_url)?,
            auth,
        ))
    }

    /// Use a preconfigured HTTP client. `base_url` is used as given.
    pub fn with_client(http: reqwest::Client, base_url: String, auth: Option<AuthHeader>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let request = self.http.get(url);
        match &self.auth {
            Some(auth) => request.header(auth.name(), auth.value()),
            None => request,
        }
    }
}

async fn error_for_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ServiceErrorBody>(&body) {
        Ok(parsed) => (parsed.code, parsed.error.unwrap_or(body)),
        Err(_) => (None, body),
    };
    Err(ApiError::Http {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl CustomizationApi for RestCustomizationClient {
    async fn list_corpora(&self, customization_id: &str) -> Result<Vec<Corpus>, ApiError> {
        let response = self
            .get(&format!("/v1/customizations/{customization_id}/corpora"))
            .send()
            .await?;
        let list: CorpusList = error_for_status(response).await?.json().await?;
        Ok(list.corpora)
    }

    async fn get_language_model(&self, customization_id: &str) -> Result<LanguageModel, ApiError> {
        let response = self
            .get(&format!("/v1/customizations/{customization_id}"))
            .send()
            .await?;
        Ok(error_for_status(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parsing() {
        assert_eq!(CorpusStatus::from("being_processed"), CorpusStatus::BeingProcessed);
        assert_eq!(CorpusStatus::from("analyzed"), CorpusStatus::Analyzed);
        assert_eq!(
            CorpusStatus::from("ANALYZED"),
            CorpusStatus::Unknown("ANALYZED".to_string())
        );
        assert_eq!(CustomizationStatus::from("available"), CustomizationStatus::Available);
        assert_eq!(
            CustomizationStatus::from("upgrading"),
            CustomizationStatus::Unknown("upgrading".to_string())
        );
    }

    #[test]
    fn test_language_model_keeps_unknown_fields() {
        let model: LanguageModel = serde_json::from_value(json!({
            "customization_id": "lm-1",
            "status": "ready",
            "progress": 100,
            "owner": "someone",
            "versions": ["v1"]
        }))
        .unwrap();
        assert_eq!(model.status(), CustomizationStatus::Ready);
        assert_eq!(model.progress, Some(100));
        assert_eq!(model.extra["owner"], "someone");
        assert_eq!(model.extra["versions"], json!(["v1"]));
    }

    #[test]
    fn test_client_normalizes_service_url() {
        let client =
            RestCustomizationClient::new("wss://example.com/instances/x/v1/recognize", None)
                .unwrap();
        assert_eq!(client.base_url(), "https://example.com/instances/x");
    }
}
