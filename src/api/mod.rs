//! Backend REST API: client, errors and record shapes.

pub mod client;
pub mod error;
pub mod records;

pub use client::{API_PREFIX, ApiClient, ClientConfig, DEFAULT_TIMEOUT, normalize_base_url};
pub use error::ApiError;
pub use records::{
    McpInstall, McpServer, Plugin, PluginInstall, Project, RemoteSuggestion, SessionSummary,
    Skill, SkillInstall, TaskHistoryItem, TaskStatus,
};
