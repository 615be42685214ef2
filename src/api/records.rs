//! Record shapes returned by the backend.
//!
//! These mirror the JSON the backend sends; unknown fields are ignored and
//! optional fields default so that older servers still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::SuggestionSource;

/// A project grouping tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(alias = "project_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_count: Option<u32>,
}

/// Lifecycle state of a task in the history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One entry of the task history sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHistoryItem {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(
        default,
        rename = "projectId",
        alias = "project_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_id: Option<String>,
}

/// A session as listed by `GET /sessions`.
///
/// The sidebar shows sessions as task history; see
/// [`TaskHistoryItem::from`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl From<SessionSummary> for TaskHistoryItem {
    fn from(session: SessionSummary) -> Self {
        let title = session
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        Self {
            id: session.session_id,
            title,
            timestamp: session.updated_at.unwrap_or(session.created_at),
            status: session.status,
            project_id: session.project_id.filter(|id| !id.is_empty()),
        }
    }
}

/// An MCP server available in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A user's installation of an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpInstall {
    pub id: i64,
    pub server_id: i64,
    pub enabled: bool,
}

/// A skill available in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A user's installation of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInstall {
    pub id: i64,
    pub skill_id: i64,
    pub enabled: bool,
}

/// A plugin available in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A user's installation of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInstall {
    pub id: i64,
    pub plugin_id: i64,
    pub enabled: bool,
}

/// A slash command suggestion as served by `/slash-commands/suggestions`.
///
/// The name has no leading `/`; the autocomplete engine adds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSuggestion {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub argument_hint: Option<String>,
    pub source: SuggestionSource,
}
