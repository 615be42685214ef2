//! Message composer state.
//!
//! [`Composer`] owns the text buffer and cursor of the input box and hosts the
//! slash command autocomplete:
//!
//! - keys go to the autocomplete first; when it consumes one, the composer
//!   does nothing else with it
//! - a committed suggestion replaces the buffer immediately, but the cursor is
//!   only moved on the following frame ([`Composer::next_frame`]), after the
//!   input widget has re-rendered the new text
//! - Enter that the autocomplete lets through submits the buffer
//!
//! ## Submission
//!
//! A submitted buffer is either plain text or, when it is a single line
//! starting with `/`, a parsed [`Submission::Command`].

pub mod slash_commands;

#[cfg(test)]
mod tests;

pub use slash_commands::{
    AutocompleteKey, KeyOutcome, Replacement, SlashAutocomplete, SuggestionFetch, TokenInfo,
    extract_token, parse_slash_command, spawn_suggestion_fetch,
};

use crate::core::SlashCommandSuggestion;

/// Key presses the composer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerKey {
    Char(char),
    Backspace,
    Left,
    Right,
    Home,
    End,
    Up,
    Down,
    Tab,
    Escape,
    Enter { shift: bool },
}

impl ComposerKey {
    /// The autocomplete key this maps to, if any.
    const fn autocomplete_key(self) -> Option<AutocompleteKey> {
        match self {
            Self::Up => Some(AutocompleteKey::Up),
            Self::Down => Some(AutocompleteKey::Down),
            Self::Tab => Some(AutocompleteKey::Tab),
            Self::Escape => Some(AutocompleteKey::Escape),
            Self::Enter { shift } => Some(AutocompleteKey::Enter { shift }),
            Self::Char(_) | Self::Backspace | Self::Left | Self::Right | Self::Home | Self::End => {
                None
            }
        }
    }
}

/// A submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Plain text for the agent.
    Text(String),
    /// A slash command with optional arguments.
    Command { name: String, args: Option<String> },
}

impl Submission {
    fn from_input(input: &str) -> Self {
        match parse_slash_command(input) {
            Some((name, args)) => Self::Command {
                name: name.to_string(),
                args: args.map(str::to_string),
            },
            None => Self::Text(input.trim().to_string()),
        }
    }
}

/// Snapshot of the popup for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupView<'a> {
    pub suggestions: Vec<&'a SlashCommandSuggestion>,
    pub active_index: usize,
}

/// The input box: buffer, cursor and slash command autocomplete.
#[derive(Debug, Default)]
pub struct Composer {
    buffer: String,
    /// Byte offset, always on a char boundary.
    cursor: usize,
    /// Cursor to apply on the next frame.
    pending_cursor: Option<usize>,
    autocomplete: SlashAutocomplete,
}

impl Composer {
    /// Creates an empty composer around an autocomplete engine.
    #[must_use]
    pub fn new(autocomplete: SlashAutocomplete) -> Self {
        Self {
            autocomplete,
            ..Self::default()
        }
    }

    /// The current buffer.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// The cursor as a byte offset into [`Self::text`].
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns whether a cursor move is waiting for the next frame.
    #[must_use]
    pub const fn has_pending_cursor(&self) -> bool {
        self.pending_cursor.is_some()
    }

    /// Replaces the buffer and puts the cursor at its end.
    pub fn set_text(&mut self, text: &str) {
        text.clone_into(&mut self.buffer);
        self.cursor = self.buffer.len();
        self.pending_cursor = None;
    }

    /// The autocomplete engine.
    #[must_use]
    pub const fn autocomplete(&self) -> &SlashAutocomplete {
        &self.autocomplete
    }

    /// Mutable access to the autocomplete engine, e.g. to poll its fetch.
    pub const fn autocomplete_mut(&mut self) -> &mut SlashAutocomplete {
        &mut self.autocomplete
    }

    /// The popup contents, or `None` while it is closed.
    #[must_use]
    pub fn popup(&self) -> Option<PopupView<'_>> {
        if !self.autocomplete.is_open(&self.buffer) {
            return None;
        }
        Some(PopupView {
            suggestions: self.autocomplete.filtered(&self.buffer),
            active_index: self.autocomplete.active_index(&self.buffer),
        })
    }

    /// Called once per rendered frame. Applies a deferred cursor move and
    /// returns whether one was applied.
    pub fn next_frame(&mut self) -> bool {
        match self.pending_cursor.take() {
            Some(cursor) => {
                self.cursor = self.clamp_to_boundary(cursor);
                true
            }
            None => false,
        }
    }

    /// Picks a suggestion with the mouse (or any other non-key path).
    pub fn select(&mut self, index: usize) -> bool {
        match self.autocomplete.apply_selection(index, &self.buffer) {
            Some(replacement) => {
                self.apply_replacement(replacement);
                true
            }
            None => false,
        }
    }

    /// Handles a key press. Returns the submission when Enter sent the buffer.
    pub fn handle_key(&mut self, key: ComposerKey) -> Option<Submission> {
        if let Some(ac_key) = key.autocomplete_key() {
            match self.autocomplete.handle_key(ac_key, &self.buffer) {
                KeyOutcome::Committed(replacement) => {
                    self.apply_replacement(replacement);
                    return None;
                }
                KeyOutcome::Consumed => return None,
                KeyOutcome::Ignored => {}
            }
        }

        match key {
            ComposerKey::Char(c) => self.insert_char(c),
            ComposerKey::Enter { shift: true } => self.insert_char('\n'),
            ComposerKey::Enter { shift: false } => return self.submit(),
            ComposerKey::Backspace => self.backspace(),
            ComposerKey::Left => self.cursor = self.prev_boundary(),
            ComposerKey::Right => self.cursor = self.next_boundary(),
            ComposerKey::Home => self.cursor = 0,
            ComposerKey::End => self.cursor = self.buffer.len(),
            ComposerKey::Up | ComposerKey::Down | ComposerKey::Tab | ComposerKey::Escape => {}
        }
        None
    }

    /// Types every character of `text` as individual key presses.
    pub fn type_str(&mut self, text: &str) {
        for c in text.chars() {
            self.handle_key(ComposerKey::Char(c));
        }
    }

    /// Takes the buffer as a submission, leaving the composer empty.
    ///
    /// Whitespace-only buffers are not submitted.
    pub fn submit(&mut self) -> Option<Submission> {
        if self.buffer.trim().is_empty() {
            return None;
        }
        let input = std::mem::take(&mut self.buffer);
        self.cursor = 0;
        self.pending_cursor = None;
        Some(Submission::from_input(&input))
    }

    fn apply_replacement(&mut self, replacement: Replacement) {
        self.buffer = replacement.text;
        // The widget keeps its caret at the end until the deferred move runs.
        self.cursor = self.buffer.len();
        self.pending_cursor = Some(replacement.cursor);
    }

    fn insert_char(&mut self, c: char) {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = self.prev_boundary();
        self.buffer.replace_range(prev..self.cursor, "");
        self.cursor = prev;
    }

    fn prev_boundary(&self) -> usize {
        self.buffer[..self.cursor]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i)
    }

    fn next_boundary(&self) -> usize {
        self.buffer[self.cursor..]
            .chars()
            .next()
            .map_or(self.cursor, |c| self.cursor + c.len_utf8())
    }

    fn clamp_to_boundary(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.buffer.len());
        while !self.buffer.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
