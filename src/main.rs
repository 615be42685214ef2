//! `poco` - console tools for the Poco agent platform
//!
//! Entry point for the application.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use poco_console::api::ApiClient;
use poco_console::app::{Composer, ComposerKey, SlashAutocomplete};
use poco_console::cli::{
    Args, Command, CompleteArgs, TreeArgs, render_completion, render_preload_report, render_tree,
};
use poco_console::core::{PreloadCache, SuggestionRegistry, build_file_tree, count_files};
use poco_console::fs::{PocoPaths, ResolvedConfig, scan_workspace};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "poco_console=info";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let paths = PocoPaths::from_cwd()?;
    let config = paths.load_settings()?.resolve(args.api_url.as_deref());

    match args.command {
        Command::Tree(tree) => run_tree(&config, tree).await,
        Command::Preload => run_preload(&config).await,
        Command::Complete(complete) => run_complete(&config, complete).await,
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn client(config: &ResolvedConfig) -> Result<ApiClient> {
    ApiClient::new(&config.client_config())
        .context("Backend not configured; pass --api-url or set POCO_BACKEND_URL")
}

async fn run_tree(config: &ResolvedConfig, args: TreeArgs) -> Result<()> {
    let records = if let Some(session) = &args.session {
        client(config)?
            .workspace_files(session)
            .await
            .with_context(|| format!("Failed to list workspace files for session {session}"))?
    } else if let Some(dir) = &args.dir {
        let scan = scan_workspace(dir);
        if scan.inaccessible > 0 {
            tracing::warn!(count = scan.inaccessible, "Some entries could not be read");
        }
        scan.records
    } else {
        anyhow::bail!("Either --session or --dir is required");
    };

    let tree = build_file_tree(&records);
    tracing::info!(files = count_files(&tree), "Built file tree");

    if args.json {
        let json = serde_json::to_string_pretty(&tree).context("Failed to serialize tree")?;
        println!("{json}");
    } else {
        print!("{}", render_tree(&tree));
    }
    Ok(())
}

async fn run_preload(config: &ResolvedConfig) -> Result<()> {
    let client = Arc::new(client(config)?);
    let cache = PreloadCache::new();

    cache.start(client).settled().await;

    print!("{}", render_preload_report(&cache));
    Ok(())
}

async fn run_complete(config: &ResolvedConfig, args: CompleteArgs) -> Result<()> {
    let mut autocomplete = if args.offline {
        SlashAutocomplete::new(SuggestionRegistry::with_builtins())
    } else {
        match client(config) {
            Ok(client) => SlashAutocomplete::with_provider(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "Using built-in commands only");
                SlashAutocomplete::new(SuggestionRegistry::with_builtins())
            }
        }
    };
    autocomplete.await_dynamic().await;

    let mut composer = Composer::new(autocomplete);
    composer.type_str(&args.buffer);

    let mut submission = None;
    for key in args.keys {
        if let Some(submitted) = composer.handle_key(ComposerKey::from(key)) {
            submission = Some(submitted);
        }
        composer.next_frame();
    }

    print!("{}", render_completion(&composer, submission.as_ref()));
    Ok(())
}
