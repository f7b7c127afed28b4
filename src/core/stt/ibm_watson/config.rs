//! IBM Watson Speech-to-Text connection configuration.
//!
//! This module defines the recognition options accepted by the WebSocket
//! interface and the parameters a [`super::DuplexRecognitionChannel`] is
//! constructed from.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{ChannelError, ChannelResult};
use crate::utils::url::websocket_recognize_url;

// =============================================================================
// Constants
// =============================================================================

/// Default number of writes held while the connection is not ready to send.
pub const DEFAULT_WRITE_QUEUE_CAPACITY: usize = 64;

/// Default grace period between `stop()` and a forced close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time allowed for the WebSocket handshake plus the `listening` state.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Recognition options sent as query parameters on the WebSocket URL.
/// Every other allowed option travels in the `start` control message.
const QUERY_OPTIONS: [&str; 5] = [
    "model",
    "customization_id",
    "acoustic_customization_id",
    "customization_weight",
    "base_model_version",
];

// =============================================================================
// Region Configuration
// =============================================================================

/// IBM Watson Speech-to-Text service regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IbmRegion {
    /// Dallas, Texas (US South)
    #[default]
    UsSouth,
    /// Washington, D.C. (US East)
    UsEast,
    /// Frankfurt, Germany (EU Central)
    EuDe,
    /// London, UK (EU GB)
    EuGb,
    /// Sydney, Australia (AU SYD)
    AuSyd,
    /// Tokyo, Japan (JP TOK)
    JpTok,
    /// Seoul, South Korea (KR SEO)
    KrSeo,
}

impl IbmRegion {
    /// Get the region code string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsSouth => "us-south",
            Self::UsEast => "us-east",
            Self::EuDe => "eu-de",
            Self::EuGb => "eu-gb",
            Self::AuSyd => "au-syd",
            Self::JpTok => "jp-tok",
            Self::KrSeo => "kr-seo",
        }
    }

    /// Service URL for a speech-to-text instance in this region.
    pub fn service_url(&self, instance_id: &str) -> String {
        format!(
            "https://api.{}.speech-to-text.watson.cloud.ibm.com/instances/{}",
            self.as_str(),
            instance_id
        )
    }
}

impl std::fmt::Display for IbmRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IbmRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "us-south" => Ok(Self::UsSouth),
            "us-east" => Ok(Self::UsEast),
            "eu-de" => Ok(Self::EuDe),
            "eu-gb" => Ok(Self::EuGb),
            "au-syd" => Ok(Self::AuSyd),
            "jp-tok" => Ok(Self::JpTok),
            "kr-seo" => Ok(Self::KrSeo),
            other => Err(format!("Unknown IBM Watson region: {other}")),
        }
    }
}

// =============================================================================
// Audio Encoding
// =============================================================================

/// Audio encoding formats supported by IBM Watson STT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IbmAudioEncoding {
    /// Linear PCM 16-bit little-endian signed integer.
    #[default]
    Linear16,
    Mulaw,
    Alaw,
    Flac,
    /// Opus encoded in OGG container.
    OggOpus,
    /// Opus encoded in WebM container.
    WebmOpus,
    Mp3,
}

impl IbmAudioEncoding {
    /// Get the content-type MIME string for this encoding.
    pub fn content_type(&self, sample_rate: u32) -> String {
        match self {
            Self::Linear16 => format!("audio/l16;rate={};channels=1", sample_rate),
            Self::Mulaw => format!("audio/mulaw;rate={}", sample_rate),
            Self::Alaw => format!("audio/alaw;rate={}", sample_rate),
            Self::Flac => "audio/flac".to_string(),
            Self::OggOpus => "audio/ogg;codecs=opus".to_string(),
            Self::WebmOpus => "audio/webm;codecs=opus".to_string(),
            Self::Mp3 => "audio/mp3".to_string(),
        }
    }
}

// =============================================================================
// Recognition Options
// =============================================================================

/// The closed set of recognition options a channel accepts.
///
/// Unset options are omitted from the wire. Unknown option names are rejected
/// by [`RecognizeOptions::from_map`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecognizeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_alternatives: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_confidence: Option<bool>,
    /// Seconds of silence before the service closes the session; -1 disables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactivity_timeout: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(
        rename = "content-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interim_results: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_alternatives_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profanity_filter: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_formatting: Option<bool>,
    /// Custom language model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acoustic_customization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_labels: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model_version: Option<String>,
}

impl RecognizeOptions {
    /// Build options from loosely typed name/value pairs.
    ///
    /// Fails with [`ChannelError::Configuration`] on an unrecognized option
    /// name or a value of the wrong type.
    pub fn from_map(options: Map<String, Value>) -> ChannelResult<Self> {
        serde_json::from_value(Value::Object(options))
            .map_err(|e| ChannelError::Configuration(format!("Invalid recognition options: {e}")))
    }

    /// Set the content type from an encoding and sample rate.
    pub fn with_encoding(mut self, encoding: IbmAudioEncoding, sample_rate: u32) -> Self {
        self.content_type = Some(encoding.content_type(sample_rate));
        self
    }

    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Query parameters for the WebSocket URL, in a stable order.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let map = self.to_map();
        QUERY_OPTIONS
            .iter()
            .filter_map(|name| {
                map.get(*name).map(|value| {
                    let rendered = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (*name, rendered)
                })
            })
            .collect()
    }

    /// Build the `start` control message.
    pub fn build_start_message(&self) -> Value {
        let mut msg = self.to_map();
        msg.retain(|name, _| !QUERY_OPTIONS.contains(&name.as_str()));
        msg.insert("action".to_string(), Value::from("start"));
        Value::Object(msg)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Opaque authentication header material supplied by the caller.
///
/// The token provider lives outside this crate; the channel only attaches the
/// header to the WebSocket handshake. The value is zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthHeader {
    name: String,
    value: String,
}

impl AuthHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `Authorization: Bearer <token>`
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self::new("Authorization", format!("Bearer {}", token.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Channel Parameters
// =============================================================================

/// Everything a duplex recognition channel is constructed from.
#[derive(Debug, Clone)]
pub struct ChannelParams {
    /// Service URL (`https://.../instances/<id>`) or a full `wss://.../v1/recognize` URL.
    pub endpoint: String,
    pub auth: Option<AuthHeader>,
    pub options: RecognizeOptions,
    /// Accept any server certificate. For development endpoints only.
    pub disable_ssl_verification: bool,
    /// Maximum number of writes held before new writes are rejected.
    pub write_queue_capacity: usize,
    pub close_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ChannelParams {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth: None,
            options: RecognizeOptions::default(),
            disable_ssl_verification: false,
            write_queue_capacity: DEFAULT_WRITE_QUEUE_CAPACITY,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_auth(mut self, auth: AuthHeader) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_options(mut self, options: RecognizeOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the parameters and build the WebSocket URL.
    pub fn build_websocket_url(&self) -> ChannelResult<Url> {
        if self.write_queue_capacity == 0 {
            return Err(ChannelError::Configuration(
                "write_queue_capacity must be at least 1".to_string(),
            ));
        }

        let mut url = websocket_recognize_url(&self.endpoint)
            .map_err(|e| ChannelError::Configuration(e.to_string()))?;
        let params = self.options.query_params();
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

// =============================================================================
// Tests
// =============================================================================
