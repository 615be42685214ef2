//! Workspace file tree construction.
//!
//! The backend lists workspace files as a flat sequence of records, each
//! carrying its full slash-delimited path. [`build_file_tree`] turns that
//! listing into the hierarchy shown by the file browser:
//!
//! - intermediate directories are synthesized as folder nodes
//! - duplicate paths collapse into a single node
//! - siblings are ordered folders first, then by name
//! - folders left without children are pruned
//!
//! The builder is pure and never panics, so it can run on every refresh.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Kind of a workspace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A directory. Sorts before files.
    Folder,
    /// A regular file.
    File,
}

/// One entry of a workspace listing, flat or nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    /// Stable identifier; the full path when the backend does not send one.
    #[serde(default)]
    pub id: String,
    /// Last path segment.
    pub name: String,
    /// Full slash-delimited path.
    pub path: String,
    /// File or folder.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Child nodes; only folders have any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
    /// Download URL for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// MIME type for files.
    #[serde(
        default,
        rename = "mimeType",
        alias = "mime_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    /// Object-storage upload status for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oss_status: Option<String>,
    /// Object-storage metadata for files, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oss_meta: Option<serde_json::Value>,
}

impl FileNode {
    /// Creates a file node at `path`, naming it after the last segment.
    #[must_use]
    pub fn file(path: &str) -> Self {
        Self::with_kind(path, NodeKind::File)
    }

    /// Creates a folder node at `path`, naming it after the last segment.
    #[must_use]
    pub fn folder(path: &str) -> Self {
        Self::with_kind(path, NodeKind::Folder)
    }

    fn with_kind(path: &str, kind: NodeKind) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        Self {
            id: path.to_string(),
            name,
            path: path.to_string(),
            kind,
            children: Vec::new(),
            url: None,
            mime_type: None,
            oss_status: None,
            oss_meta: None,
        }
    }

    /// Returns true for folder nodes.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Clears the fields that only make sense on a file.
    fn strip_file_metadata(&mut self) {
        self.url = None;
        self.mime_type = None;
        self.oss_status = None;
        self.oss_meta = None;
    }
}

/// Builds a sorted, deduplicated tree from a flat (or partially nested) listing.
///
/// Paths are normalized by dropping empty segments, so `"/a//b/"` is treated
/// as `"a/b"`; records whose path has no segments at all are skipped. When the
/// same path occurs more than once, the last record wins.
///
/// Empty folders are pruned bottom-up. A record that still has descendants
/// after pruning is emitted as a folder, even if it was listed as a file.
///
/// # Examples
///
/// ```
/// use poco_console::core::file_tree::{FileNode, build_file_tree};
///
/// let flat = vec![
///     FileNode::file("a/b/c.ts"),
///     FileNode::folder("a/b"),
///     FileNode::file("a/d.ts"),
/// ];
/// let tree = build_file_tree(&flat);
///
/// assert_eq!(tree.len(), 1);
/// assert_eq!(tree[0].name, "a");
/// let names: Vec<&str> = tree[0].children.iter().map(|n| n.name.as_str()).collect();
/// assert_eq!(names, ["b", "d.ts"]);
/// ```
#[must_use]
pub fn build_file_tree(records: &[FileNode]) -> Vec<FileNode> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut nodes: BTreeMap<String, FileNode> = BTreeMap::new();
    for record in flatten_tree(records) {
        let Some(path) = normalize_path(&record.path) else {
            continue;
        };
        let mut node = record.clone();
        node.children.clear();
        if node.id.is_empty() || node.id == record.path {
            node.id.clone_from(&path);
        }
        node.name = last_segment(&path).to_string();
        node.path.clone_from(&path);
        nodes.insert(path, node);
    }

    // BTreeMap keys are already in lexicographic order, so every prefix of a
    // path is visited no later than the path itself.
    let record_paths: Vec<String> = nodes.keys().cloned().collect();
    let mut roots: BTreeSet<String> = BTreeSet::new();
    let mut links: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for path in &record_paths {
        let mut parent: Option<&str> = None;
        for (end, _) in path
            .match_indices('/')
            .chain(std::iter::once((path.len(), "")))
        {
            let current = &path[..end];
            nodes
                .entry(current.to_string())
                .or_insert_with(|| FileNode::folder(current));
            match parent {
                Some(parent) => {
                    links
                        .entry(parent.to_string())
                        .or_default()
                        .insert(current.to_string());
                }
                None => {
                    roots.insert(current.to_string());
                }
            }
            parent = Some(current);
        }
    }

    let mut tree: Vec<FileNode> = roots
        .iter()
        .filter_map(|path| assemble(path, &mut nodes, &links))
        .collect();
    sort_tree(&mut tree);
    remove_empty_folders(tree)
}

/// Moves `path` and its descendants out of `nodes` into an owned subtree.
fn assemble(
    path: &str,
    nodes: &mut BTreeMap<String, FileNode>,
    links: &BTreeMap<String, BTreeSet<String>>,
) -> Option<FileNode> {
    let mut node = nodes.remove(path)?;
    if let Some(children) = links.get(path) {
        node.children = children
            .iter()
            .filter_map(|child| assemble(child, nodes, links))
            .filter(|child| !child.is_folder() || !child.children.is_empty())
            .collect();
    }
    // Only a file that keeps descendants after pruning becomes a folder.
    if !node.children.is_empty() && node.kind == NodeKind::File {
        node.kind = NodeKind::Folder;
        node.strip_file_metadata();
    }
    Some(node)
}

/// Sorts siblings recursively: folders first, then by name.
fn sort_tree(nodes: &mut [FileNode]) {
    nodes.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
    for node in nodes {
        sort_tree(&mut node.children);
    }
}

/// Drops folders that end up empty, bottom-up so empty chains collapse.
fn remove_empty_folders(nodes: Vec<FileNode>) -> Vec<FileNode> {
    nodes
        .into_iter()
        .filter_map(|mut node| {
            if node.is_folder() {
                node.children = remove_empty_folders(std::mem::take(&mut node.children));
                if node.children.is_empty() {
                    return None;
                }
            }
            Some(node)
        })
        .collect()
}

/// Joins the non-empty segments of `path`, or `None` if there are none.
fn normalize_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Returns every node of a (possibly nested) listing in pre-order.
#[must_use]
pub fn flatten_tree(nodes: &[FileNode]) -> Vec<&FileNode> {
    let mut out = Vec::new();
    let mut stack: Vec<&FileNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(node.children.iter().rev());
    }
    out
}

/// Counts the file nodes in a tree.
#[must_use]
pub fn count_files(nodes: &[FileNode]) -> usize {
    flatten_tree(nodes)
        .into_iter()
        .filter(|node| node.kind == NodeKind::File)
        .count()
}

/// Looks up a node by its full path.
#[must_use]
pub fn find_node<'a>(nodes: &'a [FileNode], path: &str) -> Option<&'a FileNode> {
    let mut level = nodes;
    let mut current = String::new();
    let mut found = None;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        let node = level.iter().find(|n| n.path == current)?;
        level = &node.children;
        found = Some(node);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(nodes: &[FileNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    fn with_url(mut node: FileNode, url: &str) -> FileNode {
        node.url = Some(url.to_string());
        node.mime_type = Some("text/plain".to_string());
        node.oss_status = Some("uploaded".to_string());
        node
    }

    /// Every node's path must be its parent's path plus its own name.
    fn assert_paths_consistent(nodes: &[FileNode], parent: Option<&str>) {
        for node in nodes {
            let expected = match parent {
                Some(p) => format!("{p}/{}", node.name),
                None => node.name.clone(),
            };
            assert_eq!(node.path, expected);
            assert_paths_consistent(&node.children, Some(&node.path));
        }
    }

    fn assert_sorted(nodes: &[FileNode]) {
        for pair in nodes.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.kind < b.kind || (a.kind == b.kind && a.name <= b.name),
                "{} should not precede {}",
                a.path,
                b.path
            );
        }
        for node in nodes {
            assert_sorted(&node.children);
        }
    }

    fn assert_no_empty_folders(nodes: &[FileNode]) {
        for node in nodes {
            if node.is_folder() {
                assert!(!node.children.is_empty(), "{} is empty", node.path);
            }
            assert_no_empty_folders(&node.children);
        }
    }

    fn sample_listing() -> Vec<FileNode> {
        vec![
            with_url(FileNode::file("src/main.rs"), "https://cdn/x/main.rs"),
            FileNode::file("src/app/mod.rs"),
            FileNode::file("README.md"),
            FileNode::file("docs/guide/intro.md"),
            FileNode::folder("empty"),
            FileNode::folder("nested/empty/chain"),
            FileNode::file("Cargo.toml"),
            FileNode::file("src/app/state.rs"),
        ]
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(build_file_tree(&[]).is_empty());
    }

    #[test]
    fn builds_documented_example() {
        let flat = vec![
            FileNode::file("a/b/c.ts"),
            FileNode::folder("a/b"),
            FileNode::file("a/d.ts"),
        ];
        let tree = build_file_tree(&flat);

        assert_eq!(names(&tree), ["a"]);
        let a = &tree[0];
        assert!(a.is_folder());
        assert_eq!(names(&a.children), ["b", "d.ts"]);
        assert!(a.children[0].is_folder());
        assert_eq!(names(&a.children[0].children), ["c.ts"]);
        assert_eq!(a.children[0].children[0].path, "a/b/c.ts");
        assert_eq!(a.children[1].kind, NodeKind::File);
    }

    #[test]
    fn root_level_file_has_no_parent() {
        let tree = build_file_tree(&[FileNode::file("notes.txt")]);
        assert_eq!(names(&tree), ["notes.txt"]);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn intermediate_folders_are_synthesized() {
        let tree = build_file_tree(&[FileNode::file("x/y/z/leaf.txt")]);
        let leaf = find_node(&tree, "x/y/z/leaf.txt");
        assert!(leaf.is_some());
        let y = find_node(&tree, "x/y");
        assert!(y.is_some_and(FileNode::is_folder));
        assert_eq!(y.map(|n| n.id.as_str()), Some("x/y"));
    }

    #[test]
    fn folders_precede_files_and_names_are_sorted() {
        let tree = build_file_tree(&sample_listing());
        assert_eq!(names(&tree), ["docs", "src", "Cargo.toml", "README.md"]);
        let src = find_node(&tree, "src");
        assert_eq!(src.map(|n| names(&n.children)), Some(vec!["app", "main.rs"]));
        assert_sorted(&tree);
    }

    #[test]
    fn paths_match_ancestor_chain() {
        let tree = build_file_tree(&sample_listing());
        assert_paths_consistent(&tree, None);
    }

    #[test]
    fn empty_folders_and_chains_are_pruned() {
        let tree = build_file_tree(&sample_listing());
        assert!(find_node(&tree, "empty").is_none());
        assert!(find_node(&tree, "nested").is_none());
        assert_no_empty_folders(&tree);
    }

    #[test]
    fn file_count_matches_deduplicated_input() {
        let mut listing = sample_listing();
        listing.push(FileNode::file("src/main.rs"));
        listing.push(FileNode::file("README.md"));
        let tree = build_file_tree(&listing);
        assert_eq!(count_files(&tree), 6);
    }

    #[test]
    fn duplicate_paths_are_merged_last_wins() {
        let listing = vec![
            with_url(FileNode::file("a/f.txt"), "https://old"),
            with_url(FileNode::file("a/f.txt"), "https://new"),
        ];
        let tree = build_file_tree(&listing);
        let a = &tree[0];
        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].url.as_deref(), Some("https://new"));
    }

    #[test]
    fn file_metadata_is_preserved_on_leaves() {
        let tree = build_file_tree(&sample_listing());
        let main = find_node(&tree, "src/main.rs");
        assert_eq!(main.and_then(|n| n.url.as_deref()), Some("https://cdn/x/main.rs"));
        assert_eq!(main.and_then(|n| n.mime_type.as_deref()), Some("text/plain"));
        assert_eq!(main.and_then(|n| n.oss_status.as_deref()), Some("uploaded"));
        let src = find_node(&tree, "src");
        assert!(src.is_some_and(|n| n.url.is_none()));
    }

    #[test]
    fn nested_input_is_flattened() {
        let mut dir = FileNode::folder("lib");
        dir.children = vec![FileNode::file("lib/a.rs"), FileNode::file("lib/b.rs")];
        let tree = build_file_tree(&[dir, FileNode::file("lib/c.rs")]);
        let lib = find_node(&tree, "lib");
        assert_eq!(lib.map(|n| names(&n.children)), Some(vec!["a.rs", "b.rs", "c.rs"]));
    }

    #[test]
    fn rebuilding_flattened_output_is_stable() {
        let tree = build_file_tree(&sample_listing());
        let flat: Vec<FileNode> = flatten_tree(&tree)
            .into_iter()
            .map(|node| {
                let mut node = node.clone();
                node.children.clear();
                node
            })
            .collect();
        assert_eq!(build_file_tree(&flat), tree);
        assert_eq!(build_file_tree(&tree), tree);
    }

    #[test]
    fn malformed_paths_do_not_panic() {
        let listing = vec![
            FileNode::file("/leading/slash.txt"),
            FileNode::file("trailing/slash.txt/"),
            FileNode::file("double//slash.txt"),
            FileNode::file(""),
            FileNode::file("/"),
        ];
        let tree = build_file_tree(&listing);
        assert!(find_node(&tree, "leading/slash.txt").is_some());
        assert!(find_node(&tree, "trailing/slash.txt").is_some());
        assert!(find_node(&tree, "double/slash.txt").is_some());
        assert_eq!(count_files(&tree), 3);
        assert_paths_consistent(&tree, None);
    }

    #[test]
    fn file_with_descendants_becomes_folder() {
        let listing = vec![
            with_url(FileNode::file("pkg"), "https://cdn/pkg"),
            FileNode::file("pkg/inner.txt"),
        ];
        let tree = build_file_tree(&listing);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_folder());
        assert!(tree[0].url.is_none());
        assert_eq!(names(&tree[0].children), ["inner.txt"]);
    }

    #[test]
    fn file_with_only_empty_descendants_stays_a_file() {
        let listing = vec![
            with_url(FileNode::file("a"), "https://cdn/a"),
            FileNode::folder("a/b"),
            FileNode::folder("a/b/c"),
        ];
        let tree = build_file_tree(&listing);
        assert_eq!(names(&tree), ["a"]);
        assert!(!tree[0].is_folder());
        assert!(tree[0].children.is_empty());
        assert_eq!(tree[0].url.as_deref(), Some("https://cdn/a"));
        assert_eq!(count_files(&tree), 1);
    }

    #[test]
    fn explicit_ids_are_kept() {
        let mut node = FileNode::file("a/b.txt");
        node.id = "file-42".to_string();
        let tree = build_file_tree(&[node]);
        assert_eq!(find_node(&tree, "a/b.txt").map(|n| n.id.as_str()), Some("file-42"));
    }

    #[test]
    fn deserializes_backend_records() -> anyhow::Result<()> {
        let json = r#"[
            {"name":"c.ts","path":"a/b/c.ts","type":"file","url":"u","mimeType":"text/x-ts"},
            {"id":"a","name":"a","path":"a","type":"folder"}
        ]"#;
        let records: Vec<FileNode> = serde_json::from_str(json)?;
        let tree = build_file_tree(&records);
        let leaf = find_node(&tree, "a/b/c.ts");
        assert_eq!(leaf.and_then(|n| n.mime_type.as_deref()), Some("text/x-ts"));
        assert_eq!(leaf.map(|n| n.id.as_str()), Some("a/b/c.ts"));
        Ok(())
    }

    #[test]
    fn find_node_misses_unknown_paths() {
        let tree = build_file_tree(&sample_listing());
        assert!(find_node(&tree, "src/missing.rs").is_none());
        assert!(find_node(&tree, "").is_none());
    }
}
