//! CLI argument parsing using clap, and plain-text rendering of results.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};

use crate::app::{Composer, ComposerKey, Submission};
use crate::core::{FileNode, PreloadCache, PreloadKey};

/// `poco` - console tools for the Poco agent platform
///
/// Renders workspace file trees, runs the startup preload against a backend,
/// and drives the slash command autocomplete from the terminal.
#[derive(Parser, Debug)]
#[command(name = "poco", version, about, long_about = None)]
pub struct Args {
    /// Backend base URL; overrides the settings file and environment
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a workspace file tree
    Tree(TreeArgs),
    /// Run the startup preload and report which slots loaded
    Preload,
    /// Run the slash command autocomplete over a buffer
    Complete(CompleteArgs),
}

#[derive(clap::Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["session", "dir"])))]
pub struct TreeArgs {
    /// Session whose workspace to list from the backend
    #[arg(long)]
    pub session: Option<String>,
    /// Local directory to scan instead
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Print the tree as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct CompleteArgs {
    /// Text typed into the composer
    pub buffer: String,
    /// Keys pressed after typing, in order
    #[arg(long = "key", value_enum)]
    pub keys: Vec<KeyArg>,
    /// Use built-in commands only; skip the backend fetch
    #[arg(long)]
    pub offline: bool,
}

/// Keys accepted by `poco complete --key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyArg {
    Down,
    Up,
    Tab,
    Enter,
    ShiftEnter,
    Escape,
}

impl From<KeyArg> for ComposerKey {
    fn from(key: KeyArg) -> Self {
        match key {
            KeyArg::Down => Self::Down,
            KeyArg::Up => Self::Up,
            KeyArg::Tab => Self::Tab,
            KeyArg::Enter => Self::Enter { shift: false },
            KeyArg::ShiftEnter => Self::Enter { shift: true },
            KeyArg::Escape => Self::Escape,
        }
    }
}

/// Renders a tree with two-space indentation; folders end in `/`.
#[must_use]
pub fn render_tree(nodes: &[FileNode]) -> String {
    fn walk(out: &mut String, nodes: &[FileNode], depth: usize) {
        for node in nodes {
            let suffix = if node.is_folder() { "/" } else { "" };
            let _ = writeln!(out, "{:indent$}{}{suffix}", "", node.name, indent = depth * 2);
            walk(out, &node.children, depth + 1);
        }
    }

    let mut out = String::new();
    walk(&mut out, nodes, 0);
    out
}

/// Renders one line per preload slot saying whether it loaded.
#[must_use]
pub fn render_preload_report(cache: &PreloadCache) -> String {
    let ready = cache.ready_keys();
    let mut out = String::new();
    for key in PreloadKey::ALL {
        let state = if ready.contains(&key) { "ready" } else { "missing" };
        let _ = writeln!(out, "{:<16}{state}", key.name());
    }
    out
}

/// Renders the composer after a `complete` run: the buffer, the cursor, the
/// popup (active row marked with `>`) and the submission, if any.
#[must_use]
pub fn render_completion(composer: &Composer, submission: Option<&Submission>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "buffer: {:?}", composer.text());
    let _ = writeln!(out, "cursor: {}", composer.cursor());

    match composer.popup() {
        Some(popup) => {
            let _ = writeln!(out, "popup:");
            for (i, suggestion) in popup.suggestions.iter().enumerate() {
                let marker = if i == popup.active_index { '>' } else { ' ' };
                let _ = write!(
                    out,
                    "{marker} {:<20}[{}]",
                    suggestion.command,
                    suggestion.source.label()
                );
                if let Some(description) = &suggestion.description {
                    let _ = write!(out, " {description}");
                }
                out.push('\n');
            }
        }
        None => {
            let _ = writeln!(out, "popup: closed");
        }
    }

    match submission {
        Some(Submission::Command { name, args }) => {
            let _ = writeln!(
                out,
                "submitted command: {name}{}",
                args.as_deref().map(|a| format!(" ({a})")).unwrap_or_default()
            );
        }
        Some(Submission::Text(text)) => {
            let _ = writeln!(out, "submitted text: {text:?}");
        }
        None => {}
    }
    out
}
