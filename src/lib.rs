//! mediadupe - Duplicate Media Rendition Finder
//!
//! A cross-platform Rust CLI application that locates duplicate movie and
//! episode renditions across scan roots, reconciles results against a
//! persistent SQLite cache so unchanged files are never re-probed, clusters
//! files into duplicate groups via fuzzy similarity, and recommends which
//! copy to keep using user-ordered tie-break rules.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod ignore_filter;
pub mod logging;
pub mod matcher;
pub mod media;
pub mod parser;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod reconcile;
pub mod recommender;
pub mod report;
pub mod scanner;
pub mod signal;
pub mod similarity;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use yansi::Paint;

use crate::cache::{CacheStore, SqliteCache};
use crate::cli::{
    Cli, Commands, IgnoreAction, IgnoreArgs, OutputFormat, RootsAction, RootsArgs, ScanArgs,
};
use crate::config::Config;
use crate::error::ExitCode;
use crate::parser::standardize;
use crate::pipeline::{volume_label, ScanEvents, ScanPipeline};
use crate::probe::{FfprobeProbe, MetadataProbe, NullProbe};
use crate::progress::Progress;
use crate::recommender::Recommender;
use crate::scanner::MediaScanner;

/// Run the application with parsed CLI arguments.
///
/// # Errors
///
/// Returns an error for unrecoverable failures; interruption surfaces as a
/// [`pipeline::PipelineError::Interrupted`] inside the error chain so the
/// binary can map it to exit code 130.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load();
    let cache = open_cache(cli.cache_db.clone())?;

    match cli.command {
        Commands::Scan(args) => run_scan(cache, &config, args, cli.quiet),
        Commands::Roots(args) => run_roots(cache, args),
        Commands::Ignore(args) => run_ignore(cache, args),
    }
}

/// Open the scan cache, creating parent directories as needed.
fn open_cache(path_override: Option<PathBuf>) -> Result<SqliteCache> {
    let path = match path_override {
        Some(path) => path,
        None => Config::default_cache_path()?,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating cache directory {}", parent.display()))?;
    }
    SqliteCache::open(&path)
        .with_context(|| format!("opening scan cache {}", path.display()))
}

fn run_scan(
    mut cache: SqliteCache,
    config: &Config,
    args: ScanArgs,
    quiet: bool,
) -> Result<ExitCode> {
    let roots: Vec<PathBuf> = if args.paths.is_empty() {
        cache
            .list_scan_roots()?
            .into_iter()
            .map(|root| root.path)
            .collect()
    } else {
        // Canonicalize so ad-hoc scans and registered roots agree on
        // cache keys; offline paths are kept as given.
        args.paths
            .iter()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
            .collect()
    };
    if roots.is_empty() {
        anyhow::bail!(
            "no paths given and no scan roots registered; \
             run 'mediadupe roots add <path>' first"
        );
    }

    let probe: Arc<dyn MetadataProbe> = if args.no_probe {
        Arc::new(NullProbe)
    } else {
        match args.ffprobe_dir.as_deref().or(config.ffprobe_dir.as_deref()) {
            Some(dir) => Arc::new(FfprobeProbe::with_directory(dir)),
            None => Arc::new(FfprobeProbe::new()),
        }
    };

    let rules = if args.priority.is_empty() {
        config.priority_order.clone()
    } else {
        args.priority.clone()
    };
    let mode = args.mode.unwrap_or(config.recommendation_mode);

    let handler = signal::install_handler()?;
    let events: Arc<dyn ScanEvents> = Arc::new(Progress::new(quiet));

    let mut pipeline = ScanPipeline::new(
        Box::new(cache),
        probe,
        MediaScanner::new(config.media_extensions.clone()),
        Recommender::new(rules, mode),
    )
    .with_shutdown_flag(handler.get_flag())
    .with_events(events);

    // The pipeline runs on a worker thread so this thread stays free for
    // signal delivery and never blocks progress rendering.
    let worker = std::thread::spawn(move || pipeline.run(&roots));
    let report = match worker.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("scan worker panicked"),
    };

    match args.output {
        OutputFormat::Json => println!("{}", report::render_json(&report)?),
        OutputFormat::Text => print!("{}", report::render_text(&report)),
    }

    Ok(if report.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    })
}

fn run_roots(mut cache: SqliteCache, args: RootsArgs) -> Result<ExitCode> {
    match args.action {
        RootsAction::List => {
            let roots = cache.list_scan_roots()?;
            if roots.is_empty() {
                println!("No scan roots registered.");
            }
            for root in roots {
                println!(
                    "{}  (volume: {}, last scanned: {})",
                    root.path.display().bold(),
                    root.volume_label,
                    format_timestamp(root.last_scanned)
                );
            }
        }
        RootsAction::Add { path } => {
            if !path.is_dir() {
                log::warn!(
                    "{} is not currently a directory; registering anyway (offline volume?)",
                    path.display()
                );
            }
            let path = path.canonicalize().unwrap_or(path);
            cache.upsert_scan_root(&path, &volume_label(&path))?;
            println!("Registered scan root {}", path.display());
        }
        RootsAction::Remove { path } => {
            let path = path.canonicalize().unwrap_or(path);
            cache.delete_scan_root(&path)?;
            println!("Removed scan root {}", path.display());
        }
    }
    Ok(ExitCode::Success)
}

fn run_ignore(mut cache: SqliteCache, args: IgnoreArgs) -> Result<ExitCode> {
    match args.action {
        IgnoreAction::List => {
            let entries = cache.ignore_entries()?;
            if entries.is_empty() {
                println!("Ignore list is empty.");
            }
            for entry in entries {
                println!(
                    "{}  [{}]  added {}",
                    entry.key.bold(),
                    entry.level,
                    format_timestamp(entry.added_at)
                );
            }
        }
        IgnoreAction::Add { key, level } => {
            let key = normalize_ignore_key(&key);
            cache.add_ignore_entry(&key, level.into())?;
            println!("Ignoring '{key}'");
        }
        IgnoreAction::Remove { key } => {
            let key = normalize_ignore_key(&key);
            cache.remove_ignore_entry(&key)?;
            println!("Removed '{key}' from the ignore list");
        }
    }
    Ok(ExitCode::Success)
}

/// Standardize a user-supplied ignore key.
///
/// Episode keys have the form "<series>/<group id>"; only the series part
/// is standardized, the group id ("1-2") is kept verbatim.
fn normalize_ignore_key(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((series, group_id)) => format!("{}/{}", standardize(series), group_id),
        None => standardize(key),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ignore_key_series() {
        assert_eq!(normalize_ignore_key("The.Show (2020)"), "the show");
    }

    #[test]
    fn test_normalize_ignore_key_episode_keeps_group_id() {
        assert_eq!(normalize_ignore_key("The Show/1-2"), "the show/1-2");
    }

    #[test]
    fn test_format_timestamp_never() {
        assert_eq!(format_timestamp(0), "never");
        assert!(format_timestamp(1_700_000_000).contains("2023"));
    }
}
