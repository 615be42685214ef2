//! Local workspace scanning.
//!
//! Walks a directory the way the backend lists a session workspace and
//! produces the same flat records, so a local checkout can be fed through
//! [`crate::core::build_file_tree`]. Uses the `ignore` crate, which respects
//! `.gitignore` files.

use std::path::Path;

use ignore::WalkBuilder;

use crate::core::FileNode;

/// Result of a workspace scan.
///
/// Contains the flat records and how many entries could not be read.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// One record per file and directory, with slash-delimited paths
    /// relative to the scanned root.
    pub records: Vec<FileNode>,
    /// Number of entries that could not be accessed (permission denied, etc.).
    pub inaccessible: usize,
}

/// Scans `dir` into flat file records.
///
/// Directories are emitted as folder records so that empty ones are visible
/// to the tree builder (which then prunes them). The `.git` directory is
/// skipped.
#[must_use]
pub fn scan_workspace(dir: &Path) -> ScanResult {
    let mut result = ScanResult::default();

    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .add_custom_ignore_filename(".gitignore")
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable workspace entry");
                result.inaccessible += 1;
                continue;
            }
        };
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let record = if file_type.is_dir() {
            FileNode::folder(&path)
        } else {
            FileNode::file(&path)
        };
        result.records.push(record);
    }

    tracing::debug!(
        root = %dir.display(),
        records = result.records.len(),
        inaccessible = result.inaccessible,
        "Scanned workspace"
    );
    result
}
