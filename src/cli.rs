//! Command-line interface definitions for mediadupe.
//!
//! This module defines all CLI arguments, subcommands, and options using
//! the clap derive API. The CLI follows standard conventions with global
//! options (verbosity, color) and subcommands for different operations.
//!
//! # Example
//!
//! ```bash
//! # Scan two library folders
//! mediadupe scan /mnt/media/tv /mnt/media/movies
//!
//! # Rescan every registered root, JSON output for scripting
//! mediadupe scan --output json
//!
//! # Prefer smaller files, then older ones
//! mediadupe scan --priority size_asc,mtime_asc /mnt/media
//!
//! # Manage registered roots and the ignore list
//! mediadupe roots list
//! mediadupe ignore add "The Show" --level series
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cache::IgnoreLevel;
use crate::recommender::{RecommendationMode, Rule};

/// Duplicate media rendition finder.
///
/// mediadupe locates duplicate movie and episode renditions across scan
/// roots using fuzzy folder/name matching, reconciles against a persistent
/// cache so unchanged files are never re-probed, and recommends which copy
/// to keep according to your priority rules.
#[derive(Debug, Parser)]
#[command(name = "mediadupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Emit errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Scan cache database file (default: platform data directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub cache_db: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for mediadupe.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan for duplicate media renditions
    Scan(ScanArgs),
    /// Manage registered scan roots
    Roots(RootsArgs),
    /// Manage the ignore list
    Ignore(IgnoreArgs),
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tree
    Text,
    /// JSON document for scripting
    Json,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan; defaults to every registered scan root
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Tie-break rules in priority order (comma-separated)
    ///
    /// Overrides the configured order for this run.
    #[arg(long, value_enum, value_delimiter = ',', value_name = "RULE")]
    pub priority: Vec<Rule>,

    /// Recommendation mode: suggest (SUGGESTED/REVIEW) or apply (KEEP/DELETE)
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<RecommendationMode>,

    /// Skip metadata probing entirely
    ///
    /// Quality scoring falls back to filename resolution tokens.
    #[arg(long)]
    pub no_probe: bool,

    /// Directory containing the ffprobe binary
    #[arg(long, value_name = "DIR")]
    pub ffprobe_dir: Option<PathBuf>,
}

/// Arguments for the roots subcommand.
#[derive(Debug, Args)]
pub struct RootsArgs {
    /// Action to perform
    #[command(subcommand)]
    pub action: RootsAction,
}

/// Scan-root management actions.
#[derive(Debug, Subcommand)]
pub enum RootsAction {
    /// List registered scan roots
    List,
    /// Register a scan root
    Add {
        /// Directory to register
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Unregister a scan root and drop its cached records
    Remove {
        /// Directory to unregister
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

/// Arguments for the ignore subcommand.
#[derive(Debug, Args)]
pub struct IgnoreArgs {
    /// Action to perform
    #[command(subcommand)]
    pub action: IgnoreAction,
}

/// Ignore level accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IgnoreLevelArg {
    /// Suppress a whole series
    Series,
    /// Suppress one episode group ("<series>/<group id>")
    Episode,
    /// Suppress a movie group
    Movie,
}

impl From<IgnoreLevelArg> for IgnoreLevel {
    fn from(level: IgnoreLevelArg) -> Self {
        match level {
            IgnoreLevelArg::Series => Self::Series,
            IgnoreLevelArg::Episode => Self::Episode,
            IgnoreLevelArg::Movie => Self::Movie,
        }
    }
}

/// Ignore-list management actions.
#[derive(Debug, Subcommand)]
pub enum IgnoreAction {
    /// List ignore entries
    List,
    /// Add an ignore entry
    ///
    /// The key is standardized (lowercased, separators normalized) before
    /// storage, the same way scan results are keyed.
    Add {
        /// Series title, "<series>/<group id>", or movie title
        #[arg(value_name = "KEY")]
        key: String,
        /// Granularity of the entry
        #[arg(long, value_enum, default_value = "series")]
        level: IgnoreLevelArg,
    },
    /// Remove an ignore entry
    Remove {
        /// Key to remove (standardized before lookup)
        #[arg(value_name = "KEY")]
        key: String,
    },
}
