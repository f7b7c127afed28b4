use serde::Deserialize;
use std::path::Path;

use crate::core::stt::ibm_watson::IbmRegion;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file take precedence over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// service:
///   url: "https://api.us-south.speech-to-text.watson.cloud.ibm.com/instances/abc"
///   region: "us-south"
///   instance_id: "abc"
///   auth_header: "Bearer eyJ..."
///   disable_ssl_verification: false
///
/// polling:
///   interval_ms: 5000
///   max_attempts: 30
///
/// channel:
///   write_queue_capacity: 64
///   close_timeout_ms: 5000
///   connect_timeout_ms: 30000
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub service: Option<ServiceYaml>,
    pub polling: Option<PollingYaml>,
    pub channel: Option<ChannelYaml>,
}

/// Service endpoint and credentials from YAML
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceYaml {
    pub url: Option<String>,
    pub region: Option<IbmRegion>,
    pub instance_id: Option<String>,
    pub auth_header: Option<String>,
    pub disable_ssl_verification: Option<bool>,
}

impl std::fmt::Debug for ServiceYaml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceYaml")
            .field("url", &self.url)
            .field("region", &self.region)
            .field("instance_id", &self.instance_id)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "<redacted>"))
            .field("disable_ssl_verification", &self.disable_ssl_verification)
            .finish()
    }
}

/// Readiness polling configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PollingYaml {
    pub interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Recognition channel configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ChannelYaml {
    pub write_queue_capacity: Option<usize>,
    pub close_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
