//! CLI entry point for the patchdl tool.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use patchdl_core::{
    DEFAULT_FILE_PATTERN, DEFAULT_MAX_PARALLEL, DownloadEngine, DownloadItem, DownloadManager,
    ItemSource, ListingSource, LogSink, UrlListSource,
};
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_file_config(args.config.as_deref())?;
    if let Some(path) = &loaded.path
        && loaded.config.is_some()
    {
        debug!(path = %path.display(), "config file loaded");
    }
    let config = loaded.config.unwrap_or_default();

    match args.command {
        Command::List { listing, pattern } => run_list(&config, listing, pattern).await,
        Command::Fetch {
            urls,
            dest,
            parallel,
            select,
            listing,
            pattern,
        } => {
            run_fetch(
                &config,
                args.quiet,
                FetchOptions {
                    urls,
                    dest,
                    parallel,
                    select,
                    listing,
                    pattern,
                },
            )
            .await
        }
    }
}

/// Fetch subcommand inputs after clap parsing.
struct FetchOptions {
    urls: Vec<String>,
    dest: Option<PathBuf>,
    parallel: Option<u8>,
    select: Option<String>,
    listing: Option<String>,
    pattern: Option<String>,
}

async fn run_list(
    config: &FileConfig,
    listing: Option<String>,
    pattern: Option<String>,
) -> Result<()> {
    let engine = DownloadEngine::default();
    let source = build_listing_source(config, listing, pattern, &engine)?;
    let items = source
        .discover()
        .await
        .context("failed to discover downloadable files")?;

    if items.is_empty() {
        info!("No downloadable files found on the listing page");
        return Ok(());
    }

    for (index, item) in items.iter().enumerate() {
        println!(
            "{:>3}  {:<32}  {:<24}  {}",
            index + 1,
            item.file_name(),
            item.display_name(),
            item.url()
        );
    }
    Ok(())
}

async fn run_fetch(config: &FileConfig, quiet: bool, opts: FetchOptions) -> Result<()> {
    let engine = DownloadEngine::default();

    // Input: URLs from arguments or piped stdin, else the listing page.
    let source: Box<dyn ItemSource> = if !opts.urls.is_empty() {
        Box::new(UrlListSource::from_args(&opts.urls))
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Box::new(UrlListSource::new(buffer))
    } else {
        Box::new(build_listing_source(
            config,
            opts.listing,
            opts.pattern,
            &engine,
        )?)
    };

    let manager = Arc::new(DownloadManager::with_engine(engine, source));
    let count = manager
        .load()
        .await
        .context("failed to discover downloadable files")?;
    if count == 0 {
        info!("No items to download");
        return Ok(());
    }

    if let Some(spec) = &opts.select {
        let chosen = cli::parse_selection(spec, count)?;
        let items = manager.items();
        for item in &items {
            item.set_selected(false);
        }
        for index in chosen {
            items[index].set_selected(true);
        }
    }

    let dest_dir = opts
        .dest
        .or_else(|| config.destination.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let max_parallel = opts
        .parallel
        .map(usize::from)
        .or_else(|| config.max_parallel.map(usize::from))
        .unwrap_or(DEFAULT_MAX_PARALLEL);

    spawn_interrupt_handler(Arc::clone(&manager));

    // Interactive controls only make sense with an attached terminal;
    // piped stdin already fed the URL list.
    if io::stdin().is_terminal() {
        spawn_keyboard_controls(Arc::clone(&manager));
    }

    let selected: Vec<Arc<DownloadItem>> = manager
        .items()
        .into_iter()
        .filter(|item| item.is_selected())
        .collect();
    let use_spinner = should_use_spinner(io::stderr().is_terminal(), quiet, is_dumb_terminal());
    let (progress_handle, progress_stop) = spawn_progress_ui(use_spinner, selected.clone());

    info!(
        items = selected.len(),
        parallel = max_parallel,
        dest = %dest_dir.display(),
        "starting downloads"
    );
    let stats = manager
        .start(&dest_dir, Arc::new(LogSink), max_parallel)
        .await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    info!(
        completed = stats.completed(),
        failed = stats.failed(),
        cancelled = stats.cancelled(),
        "fetch complete"
    );
    println!(
        "Done: {} completed, {} failed, {} cancelled (saved under {})",
        stats.completed(),
        stats.failed(),
        stats.cancelled(),
        dest_dir.display()
    );

    if stats.failed() > 0 && stats.completed() == 0 && stats.cancelled() == 0 {
        bail!("all downloads failed");
    }
    Ok(())
}

/// Builds the listing source from CLI flags with config fallback.
fn build_listing_source(
    config: &FileConfig,
    listing: Option<String>,
    pattern: Option<String>,
    engine: &DownloadEngine,
) -> Result<ListingSource> {
    let url = listing
        .or_else(|| config.listing_url.clone())
        .context("No listing URL given; pass --listing or set `listing_url` in the config file")?;
    let pattern = pattern
        .as_deref()
        .or(config.file_pattern.as_deref())
        .unwrap_or(DEFAULT_FILE_PATTERN);
    Ok(ListingSource::new(engine.client().clone(), url, pattern)?)
}

/// First Ctrl-C cancels the batch cleanly; the second aborts the process.
fn spawn_interrupt_handler(manager: Arc<DownloadManager>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling downloads (press again to abort)");
            manager.cancel_all();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second interrupt; aborting");
            std::process::exit(130);
        }
    });
}

/// Line-based controls while a fetch is running: p pauses, r resumes,
/// c cancels.
fn spawn_keyboard_controls(manager: Arc<DownloadManager>) {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            match line.trim() {
                "p" => manager.pause_all(),
                "r" => manager.resume_all(),
                "c" => {
                    manager.cancel_all();
                    break;
                }
                "" => {}
                other => {
                    info!(input = other, "unrecognized control; use p, r, or c");
                }
            }
        }
    });
}

fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

fn should_use_spinner(stderr_is_terminal: bool, quiet: bool, dumb_terminal: bool) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
fn spawn_progress_ui(
    use_spinner: bool,
    items: Vec<Arc<DownloadItem>>,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(items, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_spinner_inner(
    items: Vec<Arc<DownloadItem>>,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        let total = items.len();
        while !stop.load(Ordering::SeqCst) {
            let done = items
                .iter()
                .filter(|item| is_terminal_status(&item.status()))
                .count();
            let active = items.iter().find(|item| !is_terminal_status(&item.status()));

            let message = match active {
                Some(item) => format!(
                    "[{}/{}] {}: {}",
                    (done + 1).min(total),
                    total,
                    item.file_name(),
                    item.status()
                ),
                None => format!("[{done}/{total}] finishing up"),
            };
            spinner.set_message(message);
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}

/// Whether a descriptor's status string marks a finished transfer.
fn is_terminal_status(status: &str) -> bool {
    status.starts_with("completed") || status.starts_with("failed") || status == "cancelled"
}
