//! Configuration for the speech client
//!
//! Settings come from a YAML file, environment variables (including a `.env`
//! file), and defaults. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//!
//! # Example
//! ```rust,no_run
//! use watson_speech::config::SpeechConfig;
//! use watson_speech::core::stt::ibm_watson::RecognizeOptions;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = SpeechConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallbacks
//! let config = SpeechConfig::from_file(&PathBuf::from("speech.yaml"))?;
//!
//! let params = config.channel_params(RecognizeOptions::default());
//! let retry = config.retry_spec();
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

mod env;
mod yaml;

pub use yaml::{ChannelYaml, PollingYaml, ServiceYaml, YamlConfig};

use crate::core::customization::{DEFAULT_MAX_ATTEMPTS, RestCustomizationClient, RetrySpec};
use crate::core::stt::ibm_watson::{
    AuthHeader, ChannelParams, DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_WRITE_QUEUE_CAPACITY, IbmRegion, RecognizeOptions,
};
use crate::utils::url::{UrlValidationError, websocket_recognize_url};
use env::EnvConfig;

/// Default delay between readiness checks, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Resolved client configuration.
///
/// Every channel and waiter built from it receives its parameters
/// explicitly; nothing here is global.
#[derive(Clone)]
pub struct SpeechConfig {
    /// Service instance URL, e.g.
    /// `https://api.us-south.speech-to-text.watson.cloud.ibm.com/instances/<id>`.
    pub service_url: String,
    pub region: IbmRegion,
    pub instance_id: Option<String>,
    /// Value of the `Authorization` header, e.g. `Bearer <token>`.
    pub auth_header: Option<String>,
    pub disable_ssl_verification: bool,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub write_queue_capacity: usize,
    pub close_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

/// Zeroize credential material when the configuration is dropped.
impl Drop for SpeechConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut header) = self.auth_header {
            header.zeroize();
        }
    }
}

impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("service_url", &self.service_url)
            .field("region", &self.region)
            .field("instance_id", &self.instance_id)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "<redacted>"))
            .field("disable_ssl_verification", &self.disable_ssl_verification)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("write_queue_capacity", &self.write_queue_capacity)
            .field("close_timeout_ms", &self.close_timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

impl SpeechConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first; variables that
    /// are already set in the process environment win over it.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format, if neither
    /// `WATSON_STT_URL` nor `WATSON_STT_INSTANCE_ID` is set, or if validation
    /// fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let config = Self::merge(None, EnvConfig::load()?)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable fallbacks
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let yaml_config = YamlConfig::from_file(path)?;
        let config = Self::merge(Some(yaml_config), EnvConfig::load()?)?;
        config.validate()?;
        Ok(config)
    }

    fn merge(yaml: Option<YamlConfig>, env: EnvConfig) -> Result<Self, String> {
        let yaml = yaml.unwrap_or_default();
        let service = yaml.service.unwrap_or_default();
        let polling = yaml.polling.unwrap_or_default();
        let channel = yaml.channel.unwrap_or_default();

        let region = service.region.or(env.region).unwrap_or_default();
        let instance_id = service.instance_id.clone().or(env.instance_id);
        let service_url = match service.url.clone().or(env.url) {
            Some(url) => url,
            None => match &instance_id {
                Some(id) => region.service_url(id),
                None => {
                    return Err(format!(
                        "Service URL is required: set {} or {}",
                        env::ENV_URL,
                        env::ENV_INSTANCE_ID
                    ));
                }
            },
        };

        Ok(Self {
            service_url,
            region,
            instance_id,
            auth_header: service.auth_header.clone().or(env.auth_header),
            disable_ssl_verification: service
                .disable_ssl_verification
                .or(env.disable_ssl_verification)
                .unwrap_or(false),
            poll_interval_ms: polling
                .interval_ms
                .or(env.poll_interval_ms)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            poll_max_attempts: polling
                .max_attempts
                .or(env.poll_max_attempts)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            write_queue_capacity: channel
                .write_queue_capacity
                .or(env.write_queue_capacity)
                .unwrap_or(DEFAULT_WRITE_QUEUE_CAPACITY),
            close_timeout_ms: channel
                .close_timeout_ms
                .or(env.close_timeout_ms)
                .unwrap_or(DEFAULT_CLOSE_TIMEOUT.as_millis() as u64),
            connect_timeout_ms: channel
                .connect_timeout_ms
                .or(env.connect_timeout_ms)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT.as_millis() as u64),
        })
    }

    /// Check value ranges and the service URL.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_max_attempts == 0 {
            return Err("poll_max_attempts must be at least 1".to_string());
        }
        if self.write_queue_capacity == 0 {
            return Err("write_queue_capacity must be at least 1".to_string());
        }
        websocket_recognize_url(&self.service_url)
            .map_err(|e| format!("Invalid service URL '{}': {e}", self.service_url))?;
        Ok(())
    }

    /// `Authorization` header for channels and REST calls, if configured.
    pub fn auth(&self) -> Option<AuthHeader> {
        self.auth_header
            .as_deref()
            .map(|value| AuthHeader::new("Authorization", value))
    }

    /// Retry settings for the readiness waiters.
    pub fn retry_spec(&self) -> RetrySpec {
        RetrySpec::new(
            Duration::from_millis(self.poll_interval_ms),
            self.poll_max_attempts,
        )
    }

    /// Parameters for a recognition channel with the given options.
    pub fn channel_params(&self, options: RecognizeOptions) -> ChannelParams {
        ChannelParams {
            endpoint: self.service_url.clone(),
            auth: self.auth(),
            options,
            disable_ssl_verification: self.disable_ssl_verification,
            write_queue_capacity: self.write_queue_capacity,
            close_timeout: Duration::from_millis(self.close_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    /// REST client for the customization endpoints.
    pub fn customization_client(&self) -> Result<RestCustomizationClient, UrlValidationError> {
        RestCustomizationClient::new(&self.service_url, self.auth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const ALL_VARS: [&str; 10] = [
        env::ENV_URL,
        env::ENV_REGION,
        env::ENV_INSTANCE_ID,
        env::ENV_AUTH_HEADER,
        env::ENV_DISABLE_SSL_VERIFICATION,
        env::ENV_POLL_INTERVAL_MS,
        env::ENV_POLL_MAX_ATTEMPTS,
        env::ENV_WRITE_QUEUE_CAPACITY,
        env::ENV_CLOSE_TIMEOUT_MS,
        env::ENV_CONNECT_TIMEOUT_MS,
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        for name in ALL_VARS {
            unsafe {
                std::env::remove_var(name);
            }
        }
    }

    fn set_var(name: &str, value: &str) {
        unsafe {
            std::env::set_var(name, value);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();
        set_var(env::ENV_INSTANCE_ID, "inst-1");

        let config = SpeechConfig::from_env().unwrap();

        assert_eq!(
            config.service_url,
            "https://api.us-south.speech-to-text.watson.cloud.ibm.com/instances/inst-1"
        );
        assert_eq!(config.region, IbmRegion::UsSouth);
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.poll_max_attempts, 30);
        assert_eq!(config.write_queue_capacity, 64);
        assert_eq!(config.close_timeout_ms, 5000);
        assert_eq!(config.connect_timeout_ms, 30000);
        assert!(!config.disable_ssl_verification);
        assert!(config.auth().is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        cleanup_env_vars();
        set_var(env::ENV_URL, "http://localhost:9000");
        set_var(env::ENV_AUTH_HEADER, "Bearer env-token");
        set_var(env::ENV_DISABLE_SSL_VERIFICATION, "yes");
        set_var(env::ENV_POLL_INTERVAL_MS, "250");
        set_var(env::ENV_POLL_MAX_ATTEMPTS, "4");
        set_var(env::ENV_WRITE_QUEUE_CAPACITY, "8");

        let config = SpeechConfig::from_env().unwrap();

        assert_eq!(config.service_url, "http://localhost:9000");
        assert!(config.disable_ssl_verification);
        assert_eq!(config.auth().unwrap().value(), "Bearer env-token");

        let spec = config.retry_spec();
        assert_eq!(spec.interval, Duration::from_millis(250));
        assert_eq!(spec.max_attempts, 4);

        let params = config.channel_params(RecognizeOptions::default());
        assert_eq!(params.write_queue_capacity, 8);
        assert_eq!(
            params.build_websocket_url().unwrap().as_str(),
            "ws://localhost:9000/v1/recognize"
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_requires_url_or_instance() {
        cleanup_env_vars();
        let err = SpeechConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(env::ENV_URL));
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        cleanup_env_vars();
        set_var(env::ENV_INSTANCE_ID, "inst-1");
        set_var(env::ENV_POLL_MAX_ATTEMPTS, "lots");

        let err = SpeechConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(env::ENV_POLL_MAX_ATTEMPTS));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_attempts() {
        cleanup_env_vars();
        set_var(env::ENV_INSTANCE_ID, "inst-1");
        set_var(env::ENV_POLL_MAX_ATTEMPTS, "0");

        let err = SpeechConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("poll_max_attempts"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();
        set_var(env::ENV_INSTANCE_ID, "env-instance");
        set_var(env::ENV_REGION, "eu-gb");
        set_var(env::ENV_POLL_INTERVAL_MS, "100");

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("speech.yaml");
        fs::write(
            &config_path,
            r#"
service:
  instance_id: "yaml-instance"
polling:
  interval_ms: 2000
channel:
  close_timeout_ms: 1500
"#,
        )
        .unwrap();

        let config = SpeechConfig::from_file(&config_path).unwrap();

        assert_eq!(config.instance_id.as_deref(), Some("yaml-instance"));
        assert_eq!(config.region, IbmRegion::EuGb);
        assert_eq!(
            config.service_url,
            "https://api.eu-gb.speech-to-text.watson.cloud.ibm.com/instances/yaml-instance"
        );
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(
            config.channel_params(RecognizeOptions::default()).close_timeout,
            Duration::from_millis(1500)
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_rejects_bad_url() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("speech.yaml");
        fs::write(&config_path, "service:\n  url: \"ftp://example.com\"\n").unwrap();

        assert!(SpeechConfig::from_file(&config_path).is_err());
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();
        let result = SpeechConfig::from_file(Path::new("/nonexistent/speech.yaml"));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_debug_redacts_auth_header() {
        cleanup_env_vars();
        set_var(env::ENV_INSTANCE_ID, "inst-1");
        set_var(env::ENV_AUTH_HEADER, "Bearer hidden-token");

        let config = SpeechConfig::from_env().unwrap();
        assert!(!format!("{config:?}").contains("hidden-token"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_customization_client_uses_service_url() {
        cleanup_env_vars();
        set_var(env::ENV_URL, "wss://stt.example.com/instances/x/v1/recognize");

        let config = SpeechConfig::from_env().unwrap();
        let client = config.customization_client().unwrap();
        assert_eq!(client.base_url(), "https://stt.example.com/instances/x");

        cleanup_env_vars();
    }
}
