//! Environment variable loading.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::core::stt::ibm_watson::IbmRegion;

pub(super) const ENV_URL: &str = "WATSON_STT_URL";
pub(super) const ENV_REGION: &str = "WATSON_STT_REGION";
pub(super) const ENV_INSTANCE_ID: &str = "WATSON_STT_INSTANCE_ID";
pub(super) const ENV_AUTH_HEADER: &str = "WATSON_STT_AUTH_HEADER";
pub(super) const ENV_DISABLE_SSL_VERIFICATION: &str = "WATSON_STT_DISABLE_SSL_VERIFICATION";
pub(super) const ENV_POLL_INTERVAL_MS: &str = "WATSON_POLL_INTERVAL_MS";
pub(super) const ENV_POLL_MAX_ATTEMPTS: &str = "WATSON_POLL_MAX_ATTEMPTS";
pub(super) const ENV_WRITE_QUEUE_CAPACITY: &str = "WATSON_WRITE_QUEUE_CAPACITY";
pub(super) const ENV_CLOSE_TIMEOUT_MS: &str = "WATSON_CLOSE_TIMEOUT_MS";
pub(super) const ENV_CONNECT_TIMEOUT_MS: &str = "WATSON_CONNECT_TIMEOUT_MS";

/// Values read from the process environment. Unset or blank variables are
/// `None`.
#[derive(Default)]
pub(super) struct EnvConfig {
    pub url: Option<String>,
    pub region: Option<IbmRegion>,
    pub instance_id: Option<String>,
    pub auth_header: Option<String>,
    pub disable_ssl_verification: Option<bool>,
    pub poll_interval_ms: Option<u64>,
    pub poll_max_attempts: Option<u32>,
    pub write_queue_capacity: Option<usize>,
    pub close_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
}

impl EnvConfig {
    pub(super) fn load() -> Result<Self, String> {
        Ok(Self {
            url: var(ENV_URL),
            region: parse_var(ENV_REGION)?,
            instance_id: var(ENV_INSTANCE_ID),
            auth_header: var(ENV_AUTH_HEADER),
            disable_ssl_verification: parse_bool(ENV_DISABLE_SSL_VERIFICATION)?,
            poll_interval_ms: parse_var(ENV_POLL_INTERVAL_MS)?,
            poll_max_attempts: parse_var(ENV_POLL_MAX_ATTEMPTS)?,
            write_queue_capacity: parse_var(ENV_WRITE_QUEUE_CAPACITY)?,
            close_timeout_ms: parse_var(ENV_CLOSE_TIMEOUT_MS)?,
            connect_timeout_ms: parse_var(ENV_CONNECT_TIMEOUT_MS)?,
        })
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| format!("Invalid value for {name}: {e}"))
        })
        .transpose()
}

fn parse_bool(name: &str) -> Result<Option<bool>, String> {
    var(name)
        .map(|raw| match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(format!("Invalid boolean for {name}: {raw}")),
        })
        .transpose()
}
