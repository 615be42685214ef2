//! Slash command autocomplete and parsing.
//!
//! This module decides when the command popup is open, which suggestions it
//! shows, and how a picked suggestion is written back into the buffer.
//!
//! ## Detection vs Parsing
//!
//! - Detection ([`extract_token`]): finds the leading `/` token while typing
//! - Parsing ([`parse_slash_command`]): parses complete input on submission
//!
//! ## Open/closed rules
//!
//! The popup is open when the buffer (ignoring leading whitespace) starts with
//! a `/` token that has nothing typed after it, at least one suggestion starts
//! with the token (ignoring case), the token was not dismissed, and the only
//! match is not already exactly what the user typed.
//!
//! Dismissal is remembered per token: pressing Escape on `/he` keeps the popup
//! closed until the token changes. Committing a suggestion dismisses the
//! inserted command the same way.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::api::RemoteSuggestion;
use crate::core::{SlashCommandSuggestion, SuggestionProvider, SuggestionRegistry};

/// The `/` token at the start of the buffer.
///
/// Offsets are byte offsets into the buffer it was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo<'a> {
    /// The token text including the leading `/`.
    pub token: &'a str,
    /// Byte offset of the `/`.
    pub start: usize,
    /// Byte offset just past the token.
    pub end: usize,
    /// Whether whitespace follows the token, i.e. the user is typing
    /// arguments.
    pub has_args: bool,
}

/// Extracts the leading `/` token from `value`.
///
/// Leading whitespace is skipped; the token runs up to the first whitespace
/// character or the end of the buffer.
///
/// # Examples
///
/// ```
/// use poco_console::app::slash_commands::extract_token;
///
/// let info = extract_token("  /comp").unwrap();
/// assert_eq!((info.token, info.start, info.end, info.has_args), ("/comp", 2, 7, false));
///
/// assert!(extract_token("/comp extra").unwrap().has_args);
/// assert_eq!(extract_token("hello /comp"), None);
/// ```
#[must_use]
pub fn extract_token(value: &str) -> Option<TokenInfo<'_>> {
    let start = value.len() - value.trim_start().len();
    let rest = &value[start..];
    if !rest.starts_with('/') {
        return None;
    }
    let end = start + rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some(TokenInfo {
        token: &value[start..end],
        start,
        end,
        has_args: end < value.len(),
    })
}

/// Parses the input text to check if it's a complete slash command.
///
/// Returns `Some((command_name, args))` if input starts with `/` and has no other content.
/// Only returns a command when the entire input is a single line.
///
/// # Examples
///
/// ```
/// use poco_console::app::slash_commands::parse_slash_command;
///
/// assert_eq!(parse_slash_command("/compact"), Some(("compact", None)));
/// assert_eq!(parse_slash_command("/help topic"), Some(("help", Some("topic"))));
/// assert_eq!(parse_slash_command("not a command"), None);
/// assert_eq!(parse_slash_command("/"), None);
/// assert_eq!(parse_slash_command("line1\n/clear"), None);
/// ```
#[must_use]
pub fn parse_slash_command(input: &str) -> Option<(&str, Option<&str>)> {
    let trimmed = input.trim();
    let without_slash = trimmed.strip_prefix('/')?;
    if trimmed.contains('\n') {
        return None;
    }
    let mut parts = without_slash.splitn(2, char::is_whitespace);
    let name = parts.next()?;
    if name.is_empty() {
        return None;
    }
    let args = parts.next().map(str::trim).filter(|s| !s.is_empty());
    Some((name, args))
}

/// Keys the autocomplete engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutocompleteKey {
    Down,
    Up,
    Escape,
    Tab,
    Enter { shift: bool },
}

/// New buffer contents after a suggestion was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// The full new buffer.
    pub text: String,
    /// Byte offset right after the inserted command (and space, if any).
    pub cursor: usize,
}

impl Replacement {
    /// Cursor position counted in characters, for text widgets that address
    /// columns by char.
    #[must_use]
    pub fn cursor_chars(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }
}

/// What the engine did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not handled; the host should process the key normally.
    Ignored,
    /// Handled; the host must not process the key further.
    Consumed,
    /// Handled by committing a suggestion; the host must apply the
    /// replacement.
    Committed(Replacement),
}

impl KeyOutcome {
    /// Returns whether the host should skip its own handling of the key.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// A fetch of dynamic suggestions running in the background.
///
/// The spawned request is never cancelled. Dropping this value clears the
/// `active` flag so a response arriving afterwards is discarded instead of
/// delivered.
#[derive(Debug)]
pub struct SuggestionFetch {
    active: Arc<AtomicBool>,
    rx: oneshot::Receiver<Vec<RemoteSuggestion>>,
}

impl SuggestionFetch {
    /// Returns the fetched list if it has arrived.
    ///
    /// `Ok(None)` means still pending; `Err(())` means the fetch ended
    /// without a result (it failed, or no runtime was available).
    fn try_take(&mut self) -> Result<Option<Vec<RemoteSuggestion>>, ()> {
        match self.rx.try_recv() {
            Ok(list) => Ok(Some(list)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(()),
        }
    }

    /// Waits for the fetch to finish. Returns `None` if it failed.
    pub async fn wait(&mut self) -> Option<Vec<RemoteSuggestion>> {
        (&mut self.rx).await.ok()
    }
}

impl Drop for SuggestionFetch {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Starts a one-shot fetch of dynamic suggestions.
///
/// Failures are logged and swallowed; there is no retry. Outside a tokio
/// runtime nothing is fetched and the returned fetch is already finished.
pub fn spawn_suggestion_fetch(provider: Arc<dyn SuggestionProvider>) -> SuggestionFetch {
    let active = Arc::new(AtomicBool::new(true));
    let (tx, rx) = oneshot::channel();

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("No async runtime, skipping slash command fetch");
        return SuggestionFetch { active, rx };
    };

    let still_active = Arc::clone(&active);
    runtime.spawn(async move {
        deliver_suggestions(provider.as_ref(), &still_active, tx).await;
    });

    SuggestionFetch { active, rx }
}

/// Fetches the list and sends it on `tx` while `active` is still set.
///
/// Returns whether the list was delivered.
async fn deliver_suggestions(
    provider: &dyn SuggestionProvider,
    active: &AtomicBool,
    tx: oneshot::Sender<Vec<RemoteSuggestion>>,
) -> bool {
    match provider.list_suggestions().await {
        Ok(list) => {
            if active.load(Ordering::SeqCst) {
                tx.send(list).is_ok()
            } else {
                tracing::debug!("Autocomplete closed, dropping late suggestions");
                false
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Slash command suggestions failed");
            false
        }
    }
}

/// Autocomplete state for one composer.
#[derive(Debug, Default)]
pub struct SlashAutocomplete {
    registry: SuggestionRegistry,
    dismissed: Option<String>,
    active_index: usize,
    fetch: Option<SuggestionFetch>,
}

impl SlashAutocomplete {
    /// Creates an engine over the given suggestions.
    #[must_use]
    pub fn new(registry: SuggestionRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// Creates an engine and starts fetching dynamic suggestions.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn SuggestionProvider>) -> Self {
        Self {
            fetch: Some(spawn_suggestion_fetch(provider)),
            ..Self::default()
        }
    }

    /// Applies the dynamic suggestions if the fetch has delivered them.
    ///
    /// Returns true when the suggestion list changed.
    pub fn poll_dynamic(&mut self) -> bool {
        let Some(fetch) = self.fetch.as_mut() else {
            return false;
        };
        match fetch.try_take() {
            Ok(Some(list)) => {
                self.fetch = None;
                self.set_dynamic(&list);
                true
            }
            Ok(None) => false,
            Err(()) => {
                self.fetch = None;
                false
            }
        }
    }

    /// Waits for a pending fetch and applies its result.
    pub async fn await_dynamic(&mut self) -> bool {
        let Some(mut fetch) = self.fetch.take() else {
            return false;
        };
        match fetch.wait().await {
            Some(list) => {
                self.set_dynamic(&list);
                true
            }
            None => false,
        }
    }

    /// Returns whether a dynamic fetch is still outstanding.
    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.fetch.is_some()
    }

    /// Replaces the dynamic suggestions.
    pub fn set_dynamic(&mut self, list: &[RemoteSuggestion]) {
        self.registry.set_remote(list);
    }

    /// All merged suggestions, sorted by command.
    #[must_use]
    pub fn suggestions(&self) -> &[SlashCommandSuggestion] {
        self.registry.all()
    }

    /// The token the user dismissed, if any.
    #[must_use]
    pub fn dismissed_token(&self) -> Option<&str> {
        self.dismissed.as_deref()
    }

    fn filtered_for(&self, token: &TokenInfo<'_>) -> Vec<&SlashCommandSuggestion> {
        if token.has_args {
            return Vec::new();
        }
        self.registry.matching(token.token)
    }

    /// Suggestions whose command starts with the current token.
    ///
    /// Empty when there is no token or arguments are being typed.
    #[must_use]
    pub fn filtered(&self, value: &str) -> Vec<&SlashCommandSuggestion> {
        extract_token(value)
            .map(|token| self.filtered_for(&token))
            .unwrap_or_default()
    }

    /// The highlighted row, always within the filtered list (0 when empty).
    #[must_use]
    pub fn active_index(&self, value: &str) -> usize {
        Self::normalize(self.active_index, self.filtered(value).len())
    }

    /// Sets the raw highlighted row; it is wrapped into range when read.
    pub fn set_active_index(&mut self, index: usize) {
        self.active_index = index;
    }

    fn normalize(index: usize, len: usize) -> usize {
        if len == 0 { 0 } else { index % len }
    }

    /// Returns whether the popup should be shown for `value`.
    #[must_use]
    pub fn is_open(&self, value: &str) -> bool {
        let Some(token) = extract_token(value) else {
            return false;
        };
        if token.has_args || self.dismissed.as_deref() == Some(token.token) {
            return false;
        }
        let filtered = self.filtered_for(&token);
        let exact_single = filtered.len() == 1 && filtered[0].command == value.trim();
        !filtered.is_empty() && !exact_single
    }

    /// Dismisses the current token so the popup stays closed until it changes.
    pub fn dismiss(&mut self, value: &str) {
        if let Some(token) = extract_token(value) {
            self.dismissed = Some(token.token.to_string());
        }
    }

    /// Reacts to a key press. Does nothing while the popup is closed.
    pub fn handle_key(&mut self, key: AutocompleteKey, value: &str) -> KeyOutcome {
        if !self.is_open(value) {
            return KeyOutcome::Ignored;
        }
        let filtered = self.filtered(value);
        let len = filtered.len();
        let current = Self::normalize(self.active_index, len);
        let exact = filtered.iter().any(|s| s.command == value.trim());

        match key {
            AutocompleteKey::Down => {
                self.active_index = (current + 1) % len;
                KeyOutcome::Consumed
            }
            AutocompleteKey::Up => {
                self.active_index = (current + len - 1) % len;
                KeyOutcome::Consumed
            }
            AutocompleteKey::Escape => {
                self.dismiss(value);
                KeyOutcome::Consumed
            }
            AutocompleteKey::Tab => self.commit(current, value),
            AutocompleteKey::Enter { shift: false } if !exact => self.commit(current, value),
            AutocompleteKey::Enter { .. } => KeyOutcome::Ignored,
        }
    }

    fn commit(&mut self, index: usize, value: &str) -> KeyOutcome {
        self.apply_selection(index, value)
            .map_or(KeyOutcome::Consumed, KeyOutcome::Committed)
    }

    /// Writes the suggestion at `index` over the current token.
    ///
    /// A space is appended only when the token ended the buffer. The inserted
    /// command becomes the dismissed token. Returns `None` if there is no
    /// token or `index` is out of range.
    pub fn apply_selection(&mut self, index: usize, value: &str) -> Option<Replacement> {
        let token = extract_token(value)?;
        let command = self.filtered_for(&token).get(index)?.command.clone();

        let insert_space = token.end == value.len();
        let mut text = String::with_capacity(value.len() + command.len() + 1);
        text.push_str(&value[..token.start]);
        text.push_str(&command);
        if insert_space {
            text.push(' ');
        }
        let cursor = text.len();
        text.push_str(&value[token.end..]);

        self.dismissed = Some(command);
        Some(Replacement { text, cursor })
    }
}
