//! Persistent scan cache.
//!
//! The cache is what makes rescans cheap: per-root file records (size,
//! mtime, parsed and probed info) are kept between scans so unchanged files
//! are never re-probed, and cached records stand in for entire roots that
//! are offline (e.g. an unplugged external drive).
//!
//! # Architecture
//!
//! * This module defines the [`CacheStore`] contract the pipeline consumes,
//!   plus the record types ([`ScanRoot`], [`IgnoreEntry`], [`IgnoreLevel`]).
//! * [`database`] provides [`SqliteCache`], the rusqlite-backed
//!   implementation of the contract.
//!
//! # Invalidation
//!
//! A cached file record is reused only when both size and mtime match the
//! on-disk stat; any difference schedules the file for reprocessing. Paths
//! that no longer exist on disk are removed in batches.

pub mod database;

pub use database::SqliteCache;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::media::MediaFile;

/// Errors from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Underlying database failure.
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored JSON column could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Granularity of an ignore entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IgnoreLevel {
    /// Suppress a whole series.
    Series,
    /// Suppress a single episode group within a series.
    Episode,
    /// Suppress a movie group.
    Movie,
}

impl IgnoreLevel {
    /// Stable string form stored in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Series => "SERIES",
            Self::Episode => "EPISODE",
            Self::Movie => "MOVIE",
        }
    }

    /// Parse the stored string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "SERIES" => Some(Self::Series),
            "EPISODE" => Some(Self::Episode),
            "MOVIE" => Some(Self::Movie),
            _ => None,
        }
    }
}

impl std::fmt::Display for IgnoreLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered scan root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRoot {
    /// Root directory path.
    pub path: PathBuf,
    /// Volume label recorded when the root was last reachable.
    pub volume_label: String,
    /// Unix timestamp of the last completed reconciliation, 0 if never.
    pub last_scanned: i64,
}

/// An ignore-list entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreEntry {
    /// Standardized identity key.
    pub key: String,
    /// Granularity the key applies to.
    pub level: IgnoreLevel,
    /// Unix timestamp the entry was added.
    pub added_at: i64,
}

/// Contract for the persistent scan cache.
///
/// One store connection serves one scan at a time; batch operations are
/// expected to be transactional so a failed scan never leaves half a batch
/// behind.
pub trait CacheStore: Send {
    /// All registered scan roots, most recently scanned first.
    fn list_scan_roots(&mut self) -> CacheResult<Vec<ScanRoot>>;

    /// Register a root or refresh its volume label and last-scanned time.
    fn upsert_scan_root(&mut self, path: &Path, volume_label: &str) -> CacheResult<()>;

    /// Remove a root and, by cascade, all of its file records.
    fn delete_scan_root(&mut self, path: &Path) -> CacheResult<()>;

    /// All cached file records under a root, keyed by file path.
    fn files_for_root(&mut self, root: &Path) -> CacheResult<HashMap<PathBuf, MediaFile>>;

    /// Insert or replace a batch of file records under a root.
    fn upsert_files_batch(&mut self, root: &Path, files: &[MediaFile]) -> CacheResult<()>;

    /// Remove a batch of file records by path.
    fn remove_files_batch(&mut self, paths: &[PathBuf]) -> CacheResult<()>;

    /// Add or refresh an ignore entry.
    fn add_ignore_entry(&mut self, key: &str, level: IgnoreLevel) -> CacheResult<()>;

    /// Remove an ignore entry.
    fn remove_ignore_entry(&mut self, key: &str) -> CacheResult<()>;

    /// The set of ignore keys, for filtering.
    fn ignore_keys(&mut self) -> CacheResult<HashSet<String>>;

    /// Full ignore entries, for display.
    fn ignore_entries(&mut self) -> CacheResult<Vec<IgnoreEntry>>;
}
