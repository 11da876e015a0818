use std::env;
use std::time::Duration;

use url::Url;

use crate::errors::{Result, ServiceError};

const DEFAULT_REQUEST_TIMEOUT_MS: &str = "10000";
const DEFAULT_REGISTRATION_COOLDOWN_MS: &str = "5000";
const DEFAULT_ROSTER_REFRESH_INTERVAL_MS: &str = "30000";
const DEFAULT_EMULATOR_URL: &str = "http://localhost:8888";

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ServiceError::ConfigurationMissing(format!("{} not set", key))),
    }
}

fn parse_millis<F>(lookup: &F, key: &str, default: &str) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .parse()
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Invalid {}: {}", key, e)))
}

fn parse_nonzero_millis<F>(lookup: &F, key: &str, default: &str) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_millis(lookup, key, default)? {
        0 => Err(ServiceError::InvalidConfiguration(format!(
            "Invalid {}: must be greater than zero",
            key
        ))),
        millis => Ok(millis),
    }
}

fn parse_http_url(key: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Invalid {}: {}", key, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ServiceError::InvalidConfiguration(format!(
            "Invalid {}: expected http or https, got {}",
            key,
            url.scheme()
        )));
    }

    Ok(url)
}

/// Where the backend lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = required(&lookup, "MAIN_URL")?;
        let api_key = required(&lookup, "API_KEY")?;
        let timeout_ms = parse_millis(&lookup, "REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;

        Ok(Self {
            base_url: parse_http_url("MAIN_URL", &base_url)?,
            api_key,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Joins an endpoint path onto the base URL, keeping any path prefix the base carries.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }

        base.join(path.trim_start_matches('/'))
            .map_err(|e| ServiceError::InvalidConfiguration(format!("Invalid endpoint {}: {}", path, e)))
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub registration_cooldown: Duration,
    pub roster_refresh_interval: Duration,
}

impl WorkflowConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            registration_cooldown: Duration::from_millis(parse_millis(
                &lookup,
                "REGISTRATION_COOLDOWN_MS",
                DEFAULT_REGISTRATION_COOLDOWN_MS,
            )?),
            roster_refresh_interval: Duration::from_millis(parse_nonzero_millis(
                &lookup,
                "ROSTER_REFRESH_INTERVAL_MS",
                DEFAULT_ROSTER_REFRESH_INTERVAL_MS,
            )?),
        })
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            registration_cooldown: Duration::from_secs(5),
            roster_refresh_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub emulator_url: Url,
}

impl DisplayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup("LED_EMULATOR_URL").unwrap_or_else(|| DEFAULT_EMULATOR_URL.to_string());
        Ok(Self {
            emulator_url: parse_http_url("LED_EMULATOR_URL", &raw)?,
        })
    }
}
