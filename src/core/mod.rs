//! Core client-side logic: the file tree, the startup preload cache,
//! extension catalogs and slash command suggestions.

pub mod catalog;
pub mod commands;
pub mod file_tree;
pub mod preload;

pub use catalog::{
    Catalog, CatalogApi, CatalogEntry, CatalogItem, CatalogKind, Hydration, InstallRecord,
    McpServers, Plugins, Skills,
};
pub use commands::{
    BUILTIN_COMMANDS, SlashCommandSuggestion, SuggestionProvider, SuggestionRegistry,
    SuggestionSource, builtin_suggestions, merge_suggestions,
};
pub use file_tree::{FileNode, NodeKind, build_file_tree, count_files, find_node, flatten_tree};
pub use preload::{PreloadCache, PreloadHandle, PreloadKey, PreloadSlot, PreloadSource, PreloadState};
