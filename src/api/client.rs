//! HTTP client for the Poco backend.
//!
//! All endpoints live under `{base}/api/v1`. Successful JSON responses are
//! usually wrapped in a `{ code, message, data }` envelope which is unwrapped
//! here so callers only ever see the `data` payload.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::error::ApiError;
use super::records::{
    McpInstall, McpServer, Plugin, PluginInstall, Project, RemoteSuggestion, SessionSummary,
    Skill, SkillInstall, TaskHistoryItem,
};
use crate::core::catalog::{CatalogApi, McpServers, Plugins, Skills};
use crate::core::commands::SuggestionProvider;
use crate::core::file_tree::FileNode;
use crate::core::preload::PreloadSource;

/// Prefix appended to the base URL for every endpoint.
pub const API_PREFIX: &str = "/api/v1";

/// Default request timeout, matching the web client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub base_url: Option<String>,
    /// Bearer token sent as `Authorization`, if any.
    pub access_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Strips a single trailing `/` from a base URL.
#[must_use]
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.strip_suffix('/').unwrap_or(base_url).to_string()
}

/// Typed client over the backend REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    /// Builds a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingBaseUrl`] if no base URL is configured, or
    /// a transport error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(normalize_base_url)
            .ok_or(ApiError::MissingBaseUrl)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: String::new(),
                source,
            })?;

        Ok(Self {
            http,
            base_url,
            access_token: config.access_token.clone(),
        })
    }

    /// Returns the full URL for an endpoint path.
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{API_PREFIX}{endpoint}", self.base_url)
    }

    /// Sends a GET request and decodes the unwrapped payload.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, None::<&()>).await
    }

    /// Sends a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    /// Sends a PATCH request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn patch<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PATCH, endpoint, Some(body)).await
    }

    /// Sends a DELETE request, ignoring the response payload.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn delete(&self, endpoint: &str) -> Result<(), ApiError> {
        let _: Value = self.request(Method::DELETE, endpoint, None::<&()>).await?;
        Ok(())
    }

    async fn request<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        tracing::debug!(%method, endpoint, "API request");

        let mut builder = self.http.request(method.clone(), self.url(endpoint));
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let transport_error = |source: reqwest::Error| {
            if source.is_timeout() {
                ApiError::Timeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                ApiError::Transport {
                    endpoint: endpoint.to_string(),
                    source,
                }
            }
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;

        let data = unwrap_payload(status, &bytes).inspect_err(|e| {
            tracing::debug!(%method, endpoint, error = %e, "API request failed");
        })?;
        serde_json::from_value(data).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// Lists files in a session's workspace as flat records.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn workspace_files(&self, session_id: &str) -> Result<Vec<FileNode>, ApiError> {
        self.get(&format!("/sessions/{session_id}/workspace/files"))
            .await
    }
}

/// Turns a raw response into its `data` payload.
///
/// Non-2xx statuses become [`ApiError::Status`] with the payload's `message`
/// when there is one. Bodies that are objects with a `data` key are treated as
/// envelopes; their `code` must be 0 or 200 when present.
fn unwrap_payload(status: StatusCode, bytes: &[u8]) -> Result<Value, ApiError> {
    let payload: Option<Value> = if bytes.is_empty() {
        Some(Value::Null)
    } else {
        serde_json::from_slice(bytes).ok()
    };

    if !status.is_success() {
        let message = payload
            .as_ref()
            .and_then(|p| p.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map_or_else(
                || {
                    status
                        .canonical_reason()
                        .unwrap_or("API request failed")
                        .to_string()
                },
                str::to_string,
            );
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let Some(payload) = payload else {
        // Non-JSON success bodies are passed through as a string.
        return Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()));
    };

    match payload {
        Value::Object(mut map) if map.contains_key("data") => {
            let code = map.get("code").and_then(Value::as_i64);
            if let Some(code) = code
                && code != 0
                && code != 200
            {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("API request failed")
                    .to_string();
                return Err(ApiError::Envelope { code, message });
            }
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

#[async_trait]
impl PreloadSource for ApiClient {
    async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get("/projects").await
    }

    async fn task_history(&self) -> Result<Vec<TaskHistoryItem>, ApiError> {
        let sessions: Vec<SessionSummary> = self.get("/sessions").await?;
        Ok(sessions.into_iter().map(TaskHistoryItem::from).collect())
    }

    async fn mcp_servers(&self) -> Result<Vec<McpServer>, ApiError> {
        self.get("/mcp-servers").await
    }

    async fn mcp_installs(&self) -> Result<Vec<McpInstall>, ApiError> {
        self.get("/mcp-installs").await
    }

    async fn skills(&self) -> Result<Vec<Skill>, ApiError> {
        self.get("/skills").await
    }

    async fn skill_installs(&self) -> Result<Vec<SkillInstall>, ApiError> {
        self.get("/skill-installs").await
    }

    async fn plugins(&self) -> Result<Vec<Plugin>, ApiError> {
        self.get("/plugins").await
    }

    async fn plugin_installs(&self) -> Result<Vec<PluginInstall>, ApiError> {
        self.get("/plugin-installs").await
    }
}

#[async_trait]
impl SuggestionProvider for ApiClient {
    async fn list_suggestions(&self) -> Result<Vec<RemoteSuggestion>, ApiError> {
        self.get("/slash-commands/suggestions").await
    }
}

#[async_trait]
impl CatalogApi<Skills> for ApiClient {
    async fn list_items(&self) -> Result<Vec<Skill>, ApiError> {
        self.get("/skills").await
    }

    async fn list_installs(&self) -> Result<Vec<SkillInstall>, ApiError> {
        self.get("/skill-installs").await
    }

    async fn create_install(&self, item_id: i64) -> Result<SkillInstall, ApiError> {
        self.post("/skill-installs", &json!({ "skill_id": item_id, "enabled": true }))
            .await
    }

    async fn update_install(&self, install_id: i64, enabled: bool) -> Result<SkillInstall, ApiError> {
        self.patch(
            &format!("/skill-installs/{install_id}"),
            &json!({ "enabled": enabled }),
        )
        .await
    }

    async fn delete_item(&self, item_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/skills/{item_id}")).await
    }
}

#[async_trait]
impl CatalogApi<Plugins> for ApiClient {
    async fn list_items(&self) -> Result<Vec<Plugin>, ApiError> {
        self.get("/plugins").await
    }

    async fn list_installs(&self) -> Result<Vec<PluginInstall>, ApiError> {
        self.get("/plugin-installs").await
    }

    async fn create_install(&self, item_id: i64) -> Result<PluginInstall, ApiError> {
        self.post("/plugin-installs", &json!({ "plugin_id": item_id, "enabled": true }))
            .await
    }

    async fn update_install(
        &self,
        install_id: i64,
        enabled: bool,
    ) -> Result<PluginInstall, ApiError> {
        self.patch(
            &format!("/plugin-installs/{install_id}"),
            &json!({ "enabled": enabled }),
        )
        .await
    }

    async fn delete_item(&self, item_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/plugins/{item_id}")).await
    }
}

#[async_trait]
impl CatalogApi<McpServers> for ApiClient {
    async fn list_items(&self) -> Result<Vec<McpServer>, ApiError> {
        self.get("/mcp-servers").await
    }

    async fn list_installs(&self) -> Result<Vec<McpInstall>, ApiError> {
        self.get("/mcp-installs").await
    }

    async fn create_install(&self, item_id: i64) -> Result<McpInstall, ApiError> {
        self.post("/mcp-installs", &json!({ "server_id": item_id, "enabled": true }))
            .await
    }

    async fn update_install(&self, install_id: i64, enabled: bool) -> Result<McpInstall, ApiError> {
        self.patch(
            &format!("/mcp-installs/{install_id}"),
            &json!({ "enabled": enabled }),
        )
        .await
    }

    async fn delete_item(&self, item_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/mcp-servers/{item_id}")).await
    }
}
