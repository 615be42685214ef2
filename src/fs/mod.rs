//! File system operations.

use std::path::{Path, PathBuf};

use anyhow::Context;

pub mod settings;
pub mod workspace;

pub use settings::{ConsoleSettings, ResolvedConfig, load_settings, save_settings};
pub use workspace::{ScanResult, scan_workspace};

/// Directory for poco configuration files.
pub const POCO_DIR: &str = ".poco";

/// Holds all poco-related paths derived from a base directory.
///
/// Tests use an isolated temporary directory as the base; in production the
/// base is the current working directory.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use poco_console::fs::PocoPaths;
///
/// let paths = PocoPaths::new(Path::new("/tmp/test"));
/// assert_eq!(paths.settings_file(), Path::new("/tmp/test/.poco/settings.json"));
/// ```
#[derive(Debug, Clone)]
pub struct PocoPaths {
    base: PathBuf,
}

impl PocoPaths {
    /// Creates paths rooted at the given base directory.
    #[must_use]
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
        }
    }

    /// Creates paths rooted at the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn from_cwd() -> anyhow::Result<Self> {
        let base = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self { base })
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the `.poco` directory path.
    #[must_use]
    pub fn poco_dir(&self) -> PathBuf {
        self.base.join(POCO_DIR)
    }

    /// Returns the settings file path (`.poco/settings.json`).
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.poco_dir().join("settings.json")
    }

    /// Ensures the `.poco` directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_poco_dir(&self) -> anyhow::Result<()> {
        let dir = self.poco_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Loads settings from the settings file, or defaults if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_settings(&self) -> anyhow::Result<ConsoleSettings> {
        load_settings(&self.settings_file())
    }

    /// Saves settings, creating the `.poco` directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub fn save_settings(&self, settings: &ConsoleSettings) -> anyhow::Result<()> {
        self.ensure_poco_dir()?;
        save_settings(&self.settings_file(), settings)
    }
}
