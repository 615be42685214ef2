//! Settings persistence and resolution.
//!
//! Settings live as JSON in `.poco/settings.json`. The values actually used
//! at runtime are resolved in this order, first match wins:
//!
//! 1. command line flags
//! 2. environment (`POCO_BACKEND_URL`, `BACKEND_URL`, `POCO_ACCESS_TOKEN`)
//! 3. the settings file
//! 4. built-in defaults

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ClientConfig, DEFAULT_TIMEOUT, normalize_base_url};

/// Environment variable holding the backend base URL.
pub const BACKEND_URL_ENV: &str = "POCO_BACKEND_URL";

/// Fallback environment variable for the backend base URL.
pub const BACKEND_URL_FALLBACK_ENV: &str = "BACKEND_URL";

/// Environment variable holding the bearer token.
pub const ACCESS_TOKEN_ENV: &str = "POCO_ACCESS_TOKEN";

/// Persisted settings that are saved between sessions.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Backend base URL, without the `/api/v1` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Bearer token sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Settings after applying environment and flag overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub api_base_url: Option<String>,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl ResolvedConfig {
    /// Builds the HTTP client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_base_url.clone(),
            access_token: self.access_token.clone(),
            timeout: self.timeout,
        }
    }
}

/// Reads an environment variable, treating blank values as unset.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ConsoleSettings {
    /// Applies environment overrides and the optional `--api-url` flag.
    #[must_use]
    pub fn resolve(&self, api_url_flag: Option<&str>) -> ResolvedConfig {
        let api_base_url = non_blank(api_url_flag)
            .or_else(|| env_value(BACKEND_URL_ENV))
            .or_else(|| env_value(BACKEND_URL_FALLBACK_ENV))
            .or_else(|| non_blank(self.api_base_url.as_deref()))
            .map(|url| normalize_base_url(&url));

        let access_token =
            env_value(ACCESS_TOKEN_ENV).or_else(|| non_blank(self.access_token.as_deref()));

        let timeout = self
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        ResolvedConfig {
            api_base_url,
            access_token,
            timeout,
        }
    }
}

/// Loads settings from the specified settings file path.
///
/// If the file doesn't exist, returns default settings.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings(path: &Path) -> Result<ConsoleSettings> {
    if !path.exists() {
        return Ok(ConsoleSettings::default());
    }

    let content = std::fs::read_to_string(path).context("Failed to read settings file")?;

    serde_json::from_str(&content).context("Failed to parse settings file")
}

/// Saves settings to the specified path as pretty-printed JSON.
///
/// The parent directory must exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_settings(path: &Path, settings: &ConsoleSettings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

    std::fs::write(path, json).context("Failed to write settings file")
}
