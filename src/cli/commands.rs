//! CLI commands implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;

use crate::artifacts::ArtifactStore;
use crate::assets::{self, BlobSync, FsBlobStore};
use crate::config::{load_settings, write_settings, Settings};
use crate::content;
use crate::discovery::{self, DiscoveryInputs};
use crate::models::{BatchFailure, PageDocument};
use crate::query::{MirrorQuery, RouteDecision};
use crate::routes;
use crate::search;
use crate::snapshot;
use crate::verify;

#[derive(Parser)]
#[command(name = "smir")]
#[command(about = "Legacy website mirroring: snapshot store, route contract, sanitizer, blob sync")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true, default_value = "mirror-data")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and settings file
    Init,

    /// Discover routes from sitemap and crawl (does not capture pages)
    Discover {
        /// Limit number of pages to crawl (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Build the route contract from stored discovery inputs
    Routes,

    /// Capture snapshots of every HTML route through the browser
    Snapshot {
        /// Limit number of pages to capture (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Build classified documents from stored snapshots
    Content,

    /// Collect binary asset candidates from archive and snapshots
    Assets {
        /// Archive inventory JSON (pre-hashed legacy files)
        #[arg(long)]
        inventory: Option<PathBuf>,
    },

    /// Upload deduplicated asset blobs and write the blob map
    Sync {
        /// Directory archive-relative paths resolve against
        #[arg(long)]
        archive_root: Option<PathBuf>,
    },

    /// Build the search index from stored documents
    Search,

    /// Verify contract invariants over the built artifacts
    Verify,

    /// Run the whole pipeline in dependency order
    Run {
        /// Limit pages for crawl and capture (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Archive inventory JSON (pre-hashed legacy files)
        #[arg(long)]
        inventory: Option<PathBuf>,
    },

    /// Resolve a request path against the route contract
    Resolve {
        /// Request path to resolve
        path: String,
    },
}

/// Entry point called from main.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let artifacts = ArtifactStore::new(&cli.data_dir);
    let settings = load_settings(&cli.data_dir)?;

    match cli.command {
        Commands::Init => init(&cli.data_dir, &artifacts, &settings),
        Commands::Discover { limit } => discover(&artifacts, &settings, limit).await,
        Commands::Routes => build_routes(&artifacts),
        Commands::Snapshot { limit } => capture(&artifacts, &settings, limit).await,
        Commands::Content => build_content(&artifacts),
        Commands::Assets { inventory } => {
            collect_assets(&artifacts, &settings, inventory.as_deref())
        }
        Commands::Sync { archive_root } => {
            sync_blobs(&cli.data_dir, &artifacts, &settings, archive_root).await
        }
        Commands::Search => build_search(&artifacts, &settings),
        Commands::Verify => run_verify(&artifacts, &settings),
        Commands::Run { limit, inventory } => {
            discover(&artifacts, &settings, limit).await?;
            build_routes(&artifacts)?;
            capture(&artifacts, &settings, limit).await?;
            collect_assets(&artifacts, &settings, inventory.as_deref())?;
            build_content(&artifacts)?;
            build_search(&artifacts, &settings)?;
            run_verify(&artifacts, &settings)?;
            sync_blobs(&cli.data_dir, &artifacts, &settings, None).await
        }
        Commands::Resolve { path } => resolve(artifacts, settings, &path),
    }
}

fn init(data_dir: &PathBuf, artifacts: &ArtifactStore, settings: &Settings) -> anyhow::Result<()> {
    artifacts.ensure_layout()?;
    let path = write_settings(data_dir, settings)?;
    println!(
        "{} initialized {} (settings at {})",
        style("✓").green(),
        data_dir.display(),
        path.display()
    );
    Ok(())
}

async fn discover(
    artifacts: &ArtifactStore,
    settings: &Settings,
    limit: usize,
) -> anyhow::Result<()> {
    artifacts.ensure_layout()?;
    let inputs = discovery::discover(settings, limit).await?;
    artifacts.write_json(&artifacts.discovery_path(), &inputs)?;
    println!(
        "Discovered {} sitemap, {} reachable, {} non-OK paths",
        inputs.sitemap.len(),
        inputs.reachable.len(),
        inputs.non_ok.len()
    );
    Ok(())
}

fn build_routes(artifacts: &ArtifactStore) -> anyhow::Result<()> {
    let inputs: DiscoveryInputs = artifacts.read_json(&artifacts.discovery_path())?;
    let contract = routes::build_contract(&inputs);
    routes::store_contract(artifacts, &contract)?;
    println!(
        "Route contract: {} canonical, {} extra, {} overrides, {} aliases",
        contract.canonical.len(),
        contract.reachable_extra.len(),
        contract.status_overrides.len(),
        contract.aliases.len()
    );
    Ok(())
}

#[cfg(feature = "browser")]
async fn capture(artifacts: &ArtifactStore, settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let contract = routes::load_contract(artifacts)?;
    let inputs: DiscoveryInputs = artifacts.read_json(&artifacts.discovery_path())?;
    let outcome =
        snapshot::browser::run_capture(settings, artifacts, &contract, &inputs.statuses, limit)
            .await?;
    print_batch("Snapshot capture", outcome.succeeded.len(), &outcome.failed);
    Ok(())
}

#[cfg(not(feature = "browser"))]
async fn capture(_: &ArtifactStore, _: &Settings, _: usize) -> anyhow::Result<()> {
    anyhow::bail!(
        "This build has no browser support; rebuild with the `browser` feature \
         or place pre-captured snapshot JSON under snapshots/"
    )
}

fn build_content(artifacts: &ArtifactStore) -> anyhow::Result<()> {
    let snapshots = snapshot::load_snapshots(artifacts)?;
    let outcome = content::build_all(artifacts, &snapshots.succeeded)?;
    print_batch("Content build", outcome.succeeded.len(), &outcome.failed);
    Ok(())
}

fn collect_assets(
    artifacts: &ArtifactStore,
    settings: &Settings,
    inventory: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let contract = routes::load_contract(artifacts)?;
    let snapshots = snapshot::load_snapshots(artifacts)?;
    let candidates = assets::collect_candidates(
        inventory,
        &snapshots.succeeded,
        &contract,
        &settings.site,
        &settings.assets,
    );
    assets::store_candidates(artifacts, &candidates)?;
    println!("Collected {} asset candidates", candidates.len());
    Ok(())
}

async fn sync_blobs(
    data_dir: &std::path::Path,
    artifacts: &ArtifactStore,
    settings: &Settings,
    archive_root: Option<PathBuf>,
) -> anyhow::Result<()> {
    let candidates = assets::load_candidates(artifacts)?;
    let store = FsBlobStore::new(artifacts.blobs_dir(), &settings.assets.blob_base_url);
    let sync = BlobSync::new(
        &store,
        &settings.assets.namespace,
        archive_root.unwrap_or_else(|| data_dir.to_path_buf()),
        Duration::from_secs(settings.assets.fetch_timeout_secs),
    );
    let (records, outcome) = sync.run(&candidates).await;
    assets::store_blob_map(artifacts, &records)?;
    print_batch("Blob sync", outcome.succeeded.len(), &outcome.failed);
    Ok(())
}

fn build_search(artifacts: &ArtifactStore, settings: &Settings) -> anyhow::Result<()> {
    let index = content::load_index(artifacts)?;
    let mut documents: Vec<PageDocument> = Vec::with_capacity(index.len());
    for entry in index.entries() {
        documents.push(artifacts.read_json(&artifacts.document_path(&entry.file))?);
    }
    let records = search::build_index(&documents, &settings.search);
    search::store_index(artifacts, &records)?;
    println!("Search index: {} records", records.len());
    Ok(())
}

fn run_verify(artifacts: &ArtifactStore, settings: &Settings) -> anyhow::Result<()> {
    let report = verify::run(artifacts, settings)?;
    for (label, count) in &report.counts {
        println!("  {label}: {count}");
    }
    if report.is_ok() {
        println!("{} contract verified", style("✓").green());
        Ok(())
    } else {
        for error in &report.errors {
            eprintln!("{} {}", style("✗").red(), error);
        }
        anyhow::bail!("{} contract violations", report.errors.len())
    }
}

fn resolve(artifacts: ArtifactStore, settings: Settings, path: &str) -> anyhow::Result<()> {
    let query = MirrorQuery::new(artifacts, settings);
    match query.resolve(path) {
        RouteDecision::Serve { path } => println!("200 serve {path}"),
        RouteDecision::Redirect { to } => println!("301 redirect -> {to}"),
        RouteDecision::Status { code } => println!("{code} override"),
        RouteDecision::NotFound => println!("404 not a known route"),
    }
    Ok(())
}

fn print_batch(label: &str, succeeded: usize, failed: &[BatchFailure]) {
    if failed.is_empty() {
        println!("{label}: {} ok", succeeded);
    } else {
        println!(
            "{label}: {} ok, {} {}",
            succeeded,
            style(failed.len()).red(),
            "failed"
        );
        for failure in failed.iter().take(10) {
            eprintln!("  {} {}: {}", style("✗").red(), failure.item, failure.reason);
        }
        if failed.len() > 10 {
            eprintln!("  … and {} more", failed.len() - 10);
        }
    }
}
