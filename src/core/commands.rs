//! Slash command suggestions.
//!
//! Suggestions come from two places:
//!
//! - built-in commands handled by the agent runtime itself (`/compact`,
//!   `/clear`, `/help`)
//! - user-defined commands and skills served by the backend
//!
//! [`SuggestionRegistry`] merges both into one list keyed by command string,
//! with fetched entries overriding built-ins of the same name, and answers
//! the prefix queries the autocomplete popup needs.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, RemoteSuggestion};

/// Where a suggestion was defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    /// Shipped with the agent runtime.
    Builtin,
    /// A user-defined slash command.
    Custom,
    /// A skill exposed as a command.
    Skill,
}

impl SuggestionSource {
    /// Returns the badge text shown next to a suggestion.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Builtin => "built-in",
            Self::Custom => "command",
            Self::Skill => "skill",
        }
    }

    /// Returns the wire name of the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Custom => "custom",
            Self::Skill => "skill",
        }
    }
}

impl fmt::Display for SuggestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the autocomplete popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommandSuggestion {
    /// The full command including the leading `/`.
    pub command: String,
    /// Command name without the slash.
    pub name: String,
    /// Short description, if the definition has one.
    pub description: Option<String>,
    /// Placeholder for the arguments, e.g. `<file>`.
    pub argument_hint: Option<String>,
    /// Origin of the definition.
    pub source: SuggestionSource,
}

impl SlashCommandSuggestion {
    /// Creates a built-in suggestion for `name`.
    #[must_use]
    pub fn builtin(name: &str, description: &str) -> Self {
        Self {
            command: format!("/{name}"),
            name: name.to_string(),
            description: Some(description.to_string()),
            argument_hint: None,
            source: SuggestionSource::Builtin,
        }
    }
}

impl From<RemoteSuggestion> for SlashCommandSuggestion {
    fn from(remote: RemoteSuggestion) -> Self {
        Self {
            command: format!("/{}", remote.name),
            name: remote.name,
            description: remote.description,
            argument_hint: remote.argument_hint,
            source: remote.source,
        }
    }
}

/// Names and descriptions of the built-in commands.
pub const BUILTIN_COMMANDS: [(&str, &str); 3] = [
    ("compact", "Summarize the conversation to free up context"),
    ("clear", "Start over with an empty conversation"),
    ("help", "Show available commands"),
];

/// Returns the built-in suggestions.
#[must_use]
pub fn builtin_suggestions() -> Vec<SlashCommandSuggestion> {
    BUILTIN_COMMANDS
        .iter()
        .map(|(name, description)| SlashCommandSuggestion::builtin(name, description))
        .collect()
}

/// Merges built-in and fetched suggestions.
///
/// Entries are keyed by `command` (case-sensitive); later entries replace
/// earlier ones, and fetched entries come after built-ins, so the backend
/// wins on collision. The result is sorted by command.
#[must_use]
pub fn merge_suggestions(
    builtins: &[SlashCommandSuggestion],
    remote: &[RemoteSuggestion],
) -> Vec<SlashCommandSuggestion> {
    let mut unique: BTreeMap<String, SlashCommandSuggestion> = BTreeMap::new();
    let fetched = remote.iter().cloned().map(SlashCommandSuggestion::from);
    for item in builtins.iter().cloned().chain(fetched) {
        unique.insert(item.command.clone(), item);
    }
    unique.into_values().collect()
}

/// Source of fetched suggestions.
///
/// Implemented by [`crate::api::ApiClient`]; tests supply mocks.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Lists user commands and skills usable as slash commands.
    async fn list_suggestions(&self) -> Result<Vec<RemoteSuggestion>, ApiError>;
}

/// The merged, sorted suggestion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRegistry {
    builtins: Vec<SlashCommandSuggestion>,
    merged: Vec<SlashCommandSuggestion>,
}

impl SuggestionRegistry {
    /// Creates a registry with the given built-ins and nothing fetched yet.
    #[must_use]
    pub fn new(builtins: Vec<SlashCommandSuggestion>) -> Self {
        let merged = merge_suggestions(&builtins, &[]);
        Self { builtins, merged }
    }

    /// Creates a registry holding the standard built-in commands.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new(builtin_suggestions())
    }

    /// Replaces the fetched part of the list.
    pub fn set_remote(&mut self, remote: &[RemoteSuggestion]) {
        self.merged = merge_suggestions(&self.builtins, remote);
    }

    /// Returns every suggestion, sorted by command.
    #[must_use]
    pub fn all(&self) -> &[SlashCommandSuggestion] {
        &self.merged
    }

    /// Finds a suggestion by its exact command string.
    #[must_use]
    pub fn find(&self, command: &str) -> Option<&SlashCommandSuggestion> {
        self.merged.iter().find(|s| s.command == command)
    }

    /// Returns suggestions whose command starts with `prefix`, ignoring case.
    #[must_use]
    pub fn matching(&self, prefix: &str) -> Vec<&SlashCommandSuggestion> {
        let prefix = prefix.to_lowercase();
        self.merged
            .iter()
            .filter(|s| s.command.to_lowercase().starts_with(&prefix))
            .collect()
    }
}

impl Default for SuggestionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str, source: SuggestionSource) -> RemoteSuggestion {
        RemoteSuggestion {
            name: name.to_string(),
            description: Some(format!("{name} from backend")),
            argument_hint: None,
            source,
        }
    }

    fn commands(list: &[SlashCommandSuggestion]) -> Vec<&str> {
        list.iter().map(|s| s.command.as_str()).collect()
    }

    #[test]
    fn builtins_are_sorted_by_command() {
        let registry = SuggestionRegistry::with_builtins();
        assert_eq!(commands(registry.all()), ["/clear", "/compact", "/help"]);
        assert!(
            registry
                .all()
                .iter()
                .all(|s| s.source == SuggestionSource::Builtin)
        );
    }

    #[test]
    fn remote_names_gain_a_slash() {
        let suggestion = SlashCommandSuggestion::from(remote("deploy", SuggestionSource::Custom));
        assert_eq!(suggestion.command, "/deploy");
        assert_eq!(suggestion.name, "deploy");
    }

    #[test]
    fn remote_overrides_builtin_on_collision() {
        let merged = merge_suggestions(
            &builtin_suggestions(),
            &[
                remote("help", SuggestionSource::Custom),
                remote("pdf", SuggestionSource::Skill),
            ],
        );
        assert_eq!(commands(&merged), ["/clear", "/compact", "/help", "/pdf"]);
        let help = merged.iter().find(|s| s.command == "/help");
        assert_eq!(help.map(|s| s.source), Some(SuggestionSource::Custom));
    }

    #[test]
    fn collision_key_is_case_sensitive() {
        let merged = merge_suggestions(
            &builtin_suggestions(),
            &[remote("Help", SuggestionSource::Custom)],
        );
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn later_remote_duplicate_wins() {
        let mut second = remote("deploy", SuggestionSource::Skill);
        second.description = Some("second".to_string());
        let merged = merge_suggestions(&[], &[remote("deploy", SuggestionSource::Custom), second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description.as_deref(), Some("second"));
    }

    #[test]
    fn set_remote_replaces_previous_fetch() {
        let mut registry = SuggestionRegistry::with_builtins();
        registry.set_remote(&[remote("deploy", SuggestionSource::Custom)]);
        assert!(registry.find("/deploy").is_some());

        registry.set_remote(&[remote("review", SuggestionSource::Skill)]);
        assert!(registry.find("/deploy").is_none());
        assert!(registry.find("/review").is_some());
        assert!(registry.find("/help").is_some());
    }

    #[test]
    fn matching_ignores_case() {
        let registry = SuggestionRegistry::with_builtins();
        let found: Vec<&str> = registry
            .matching("/C")
            .into_iter()
            .map(|s| s.command.as_str())
            .collect();
        assert_eq!(found, ["/clear", "/compact"]);
        assert_eq!(registry.matching("/").len(), 3);
        assert!(registry.matching("/x").is_empty());
    }

    #[test]
    fn source_labels_and_wire_names() {
        assert_eq!(SuggestionSource::Builtin.label(), "built-in");
        assert_eq!(SuggestionSource::Skill.label(), "skill");
        assert_eq!(SuggestionSource::Custom.to_string(), "custom");
    }
}
