use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use filmsync_catalog::{CatalogCache, ListId, fetch::DEFAULT_TIMEOUT, load_catalog};
use filmsync_core::config_file::{self, ConfigFile};
use filmsync_core::{CatalogItem, InventoryItem, Reconciler, Reconciliation, RunSummary};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod input;
mod output;

use output::{ColorMode, ListReport, Playlist};

/// filmsync - Build library playlists from Douban film lists
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file to use instead of the platform and .filmsync.toml cascade
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile Douban lists against the library and write playlists
    Sync {
        /// `top250`, a Doulist id, or a Doulist URL (defaults to `[catalog] lists`)
        lists: Vec<String>,

        /// Library export: JSON array of {handle, title, year}
        #[arg(short, long)]
        inventory: PathBuf,

        /// Refetch lists even when cached
        #[arg(long)]
        renew: bool,

        /// Directory playlists are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write the full per-item outcome as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Path of the SQLite list cache
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Do not read or write the list cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Reconcile a catalog JSON file against the library, offline
    Match {
        /// JSON array of {rank, title, original_title?, year?}
        #[arg(long)]
        catalog: PathBuf,

        /// Library export: JSON array of {handle, title, year}
        #[arg(short, long)]
        inventory: PathBuf,

        /// Write the full per-item outcome as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Remove cached lists
    ClearCache {
        /// Only this list; everything when omitted
        list: Option<String>,

        /// Path of the SQLite list cache
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "filmsync_cli=info,filmsync_core=info,filmsync_catalog=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => config_file::load_explicit(path)?,
        None => config_file::load_config(),
    };
    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());

    // Reconciliation is synchronous, so Ctrl-C is also seen through a flag
    // checked between catalog items.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_clone.store(true, Ordering::Relaxed);
        }
    });

    let work = async {
        match cli.command {
            Command::Sync {
                lists,
                inventory,
                renew,
                output_dir,
                report,
                cache,
                no_cache,
            } => {
                let cache_path = if no_cache {
                    None
                } else {
                    resolve_cache_path(cache, &file_config)
                };
                sync(SyncArgs {
                    lists,
                    inventory,
                    renew,
                    output_dir: resolve_output_dir(output_dir, &file_config),
                    report,
                    cache_path,
                    config: &file_config,
                    color,
                    interrupted: &interrupted,
                })
                .await
            }
            Command::Match {
                catalog,
                inventory,
                report,
            } => match_files(
                &catalog,
                &inventory,
                report.as_deref(),
                &file_config,
                color,
                &interrupted,
            ),
            Command::ClearCache { list, cache } => {
                clear_cache(list.as_deref(), resolve_cache_path(cache, &file_config))
            }
        }
    };

    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            anyhow::bail!("interrupted")
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// CLI flag > `FILMSYNC_CACHE_PATH` > config file > platform cache dir.
fn resolve_cache_path(flag: Option<PathBuf>, config: &ConfigFile) -> Option<PathBuf> {
    flag.or_else(|| env_path("FILMSYNC_CACHE_PATH"))
        .or_else(|| config.cache_path())
        .or_else(config_file::default_cache_path)
}

/// CLI flag > `FILMSYNC_OUTPUT_DIR` > config file > current directory.
fn resolve_output_dir(flag: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    flag.or_else(|| env_path("FILMSYNC_OUTPUT_DIR"))
        .or_else(|| config.output_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}

struct SyncArgs<'a> {
    lists: Vec<String>,
    inventory: PathBuf,
    renew: bool,
    output_dir: PathBuf,
    report: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    config: &'a ConfigFile,
    color: ColorMode,
    interrupted: &'a AtomicBool,
}

/// One reconciled list, kept until the report is written.
struct ListRun {
    list: String,
    name: String,
    reconciliation: Reconciliation,
}

async fn sync(args: SyncArgs<'_>) -> anyhow::Result<()> {
    let raw_lists = if args.lists.is_empty() {
        args.config.lists()
    } else {
        args.lists
    };
    if raw_lists.is_empty() {
        anyhow::bail!("no lists given and none configured under [catalog] lists");
    }
    let lists = raw_lists
        .iter()
        .map(|raw| raw.parse::<ListId>())
        .collect::<Result<Vec<_>, _>>()?;

    let inventory = input::load_inventory(&args.inventory)?;
    tracing::info!(items = inventory.len(), "library loaded");

    let cache = match &args.cache_path {
        Some(path) => match CatalogCache::open(path) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "list cache unavailable");
                None
            }
        },
        None => None,
    };

    let timeout = args
        .config
        .request_timeout_secs()
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);
    let client = filmsync_catalog::build_client(timeout)?;
    let reconciler = Reconciler::new(args.config.match_config());

    let mut stdout = std::io::stdout();
    let mut runs = Vec::with_capacity(lists.len());

    for list in &lists {
        let catalog = load_catalog(&client, cache.as_ref(), list, args.renew)
            .await
            .with_context(|| format!("loading list {list}"))?;

        let reconciliation = reconcile_and_print(
            &mut stdout,
            &reconciler,
            &catalog.name,
            &catalog.items,
            inventory.clone(),
            args.color,
            args.interrupted,
        )?;

        let accepted = reconciliation.accepted_handles();
        if accepted.is_empty() {
            tracing::info!(list = %list, "no accepted matches, playlist not written");
        } else {
            let path = output::write_playlist(
                &args.output_dir,
                &Playlist {
                    name: &catalog.name,
                    handles: accepted,
                },
            )?;
            writeln!(stdout, "Playlist written to {}", path.display())?;
        }

        runs.push(ListRun {
            list: list.to_string(),
            name: catalog.name,
            reconciliation,
        });
    }

    if let Some(path) = &args.report {
        write_runs(path, &runs)?;
        writeln!(stdout, "Report written to {}", path.display())?;
    }
    Ok(())
}

fn match_files(
    catalog_path: &Path,
    inventory_path: &Path,
    report: Option<&Path>,
    config: &ConfigFile,
    color: ColorMode,
    interrupted: &AtomicBool,
) -> anyhow::Result<()> {
    let catalog = input::load_catalog_file(catalog_path)?;
    let inventory = input::load_inventory(inventory_path)?;
    let name = catalog_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| catalog_path.display().to_string());

    let reconciler = Reconciler::new(config.match_config());
    let mut stdout = std::io::stdout();
    let reconciliation = reconcile_and_print(
        &mut stdout,
        &reconciler,
        &name,
        &catalog,
        inventory,
        color,
        interrupted,
    )?;

    if let Some(path) = report {
        let runs = [ListRun {
            list: catalog_path.display().to_string(),
            name,
            reconciliation,
        }];
        write_runs(path, &runs)?;
        writeln!(stdout, "Report written to {}", path.display())?;
    }
    Ok(())
}

fn reconcile_and_print(
    w: &mut dyn Write,
    reconciler: &Reconciler,
    name: &str,
    catalog: &[CatalogItem],
    inventory: Vec<InventoryItem>,
    color: ColorMode,
    interrupted: &AtomicBool,
) -> anyhow::Result<Reconciliation> {
    output::print_list_header(w, name, catalog.len(), inventory.len(), color)?;

    let reconciliation = reconciler
        .run_until(
            catalog,
            inventory,
            |event| {
                let _ = output::print_progress(&mut *w, &event, color);
            },
            || interrupted.load(Ordering::Relaxed),
        )
        .context("interrupted")?;

    let summary = RunSummary::from_results(&reconciliation.results);
    tracing::info!(
        list = name,
        exact = summary.exact,
        fuzzy_accepted = summary.fuzzy_accepted,
        fuzzy_rejected = summary.fuzzy_rejected,
        not_found = summary.not_found,
        "reconciliation finished"
    );
    output::print_summary(w, &summary, reconciliation.remaining.len(), color)?;
    Ok(reconciliation)
}

fn write_runs(path: &Path, runs: &[ListRun]) -> anyhow::Result<()> {
    let reports: Vec<ListReport<'_>> = runs
        .iter()
        .map(|run| ListReport {
            list: &run.list,
            name: &run.name,
            summary: RunSummary::from_results(&run.reconciliation.results),
            results: &run.reconciliation.results,
            remaining: &run.reconciliation.remaining,
        })
        .collect();
    output::write_report(path, &reports)
}

fn clear_cache(list: Option<&str>, cache_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = cache_path.context("no cache path configured")?;
    if !path.exists() {
        println!("No cache at {}", path.display());
        return Ok(());
    }
    let cache = CatalogCache::open(&path)?;
    let list = list.map(str::parse::<ListId>).transpose()?;
    let removed = cache.clear(list.as_ref())?;
    println!("Removed {removed} cached list(s) from {}", path.display());
    Ok(())
}
