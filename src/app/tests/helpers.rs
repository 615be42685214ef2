//! Shared test utilities for the app module.
//!
//! - `composer_with` - Creates a `Composer` holding the given text
//! - `popup_commands` - Lists the commands shown in the popup
//! - `StaticProvider` - Suggestion provider answering from a fixed list

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::api::{ApiError, RemoteSuggestion};
use crate::app::{Composer, SlashAutocomplete};
use crate::core::{SuggestionProvider, SuggestionRegistry, SuggestionSource};

/// Creates a composer over the built-in commands with `text` typed in.
pub fn composer_with(text: &str) -> Composer {
    let mut composer = Composer::new(SlashAutocomplete::new(SuggestionRegistry::with_builtins()));
    composer.type_str(text);
    composer
}

/// Creates a composer whose suggestions include `names` as custom commands.
pub fn composer_with_remote(names: &[&str], text: &str) -> Composer {
    let mut autocomplete = SlashAutocomplete::new(SuggestionRegistry::with_builtins());
    let remote: Vec<RemoteSuggestion> = names.iter().map(|n| custom(n)).collect();
    autocomplete.set_dynamic(&remote);
    let mut composer = Composer::new(autocomplete);
    composer.type_str(text);
    composer
}

/// A custom command suggestion as the backend returns it.
pub fn custom(name: &str) -> RemoteSuggestion {
    RemoteSuggestion {
        name: name.to_string(),
        description: Some(format!("Run {name}")),
        argument_hint: None,
        source: SuggestionSource::Custom,
    }
}

/// Commands currently shown in the popup; empty when it is closed.
pub fn popup_commands(composer: &Composer) -> Vec<String> {
    composer
        .popup()
        .map(|p| p.suggestions.iter().map(|s| s.command.clone()).collect())
        .unwrap_or_default()
}

/// Suggestion provider answering from a fixed list and counting calls.
#[derive(Debug, Default)]
pub struct StaticProvider {
    pub suggestions: Vec<RemoteSuggestion>,
    pub calls: AtomicU32,
}

impl StaticProvider {
    pub fn new(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            suggestions: names.iter().map(|n| custom(n)).collect(),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl SuggestionProvider for StaticProvider {
    async fn list_suggestions(&self) -> Result<Vec<RemoteSuggestion>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.suggestions.clone())
    }
}
