//! Incremental scan reconciliation.
//!
//! # Overview
//!
//! Reconciliation diffs the on-disk enumeration of a scan root against the
//! cached records for that root:
//!
//! * **unchanged** — cache hit with matching size and mtime; the cached
//!   record (including probe metadata) is reused as-is
//! * **changed** — cache hit but size or mtime differs; reprocessed
//! * **new** — no cache entry; processed
//! * **stale** — cached path no longer on disk; scheduled for batch removal
//!
//! An unreachable root (unmounted volume, deleted directory) short-circuits
//! the diff: every cached record is returned verbatim as unchanged and the
//! root's last-scanned timestamp must not be refreshed.
//!
//! Stat calls can race with deletion between enumeration and stat; such
//! files are silently dropped from this scan's working set. If they were
//! cached, the record stays put and falls out as stale on the next scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::media::MediaFile;
use crate::scanner::MediaScanner;

/// Classification counts from one root's reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Records loaded from the cache.
    pub cached: usize,
    /// Files enumerated on disk.
    pub on_disk: usize,
    /// Cache hits reused without reprocessing.
    pub unchanged: usize,
    /// Cache hits invalidated by size/mtime drift.
    pub changed: usize,
    /// Files with no cache record.
    pub new: usize,
    /// Cached paths missing from disk.
    pub stale: usize,
    /// Files that vanished between enumeration and stat.
    pub vanished: usize,
}

/// Outcome of reconciling one scan root.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Cached records reused as-is (or wholesale, for an offline root).
    pub unchanged: Vec<MediaFile>,
    /// Paths that must be (re)processed: new files and invalidated hits.
    pub to_process: Vec<PathBuf>,
    /// Cached paths to remove from the store in one batch.
    pub stale: Vec<PathBuf>,
    /// False when the root was unreachable and cached data was used
    /// wholesale; the root's last-scanned timestamp must not be updated.
    pub root_online: bool,
    /// Classification counts.
    pub stats: ReconcileStats,
}

/// Check whether a scan root can be reconciled against disk.
#[must_use]
pub fn is_root_reachable(root: &Path) -> bool {
    root.is_dir()
}

/// Reconcile one scan root against its cached records.
///
/// Enumerates `root` with `scanner`, classifies every on-disk file into
/// exactly one of unchanged/changed/new, and every cached-only path as
/// stale. For an unreachable root, returns the cached records wholesale
/// with `root_online == false`.
#[must_use]
pub fn reconcile(
    root: &Path,
    scanner: &MediaScanner,
    cached: HashMap<PathBuf, MediaFile>,
) -> Reconciliation {
    if !is_root_reachable(root) {
        log::info!(
            "scan root {} is offline; using {} cached record(s)",
            root.display(),
            cached.len()
        );
        let stats = ReconcileStats {
            cached: cached.len(),
            unchanged: cached.len(),
            ..ReconcileStats::default()
        };
        return Reconciliation {
            unchanged: cached.into_values().collect(),
            to_process: Vec::new(),
            stale: Vec::new(),
            root_online: false,
            stats,
        };
    }

    let mut result = Reconciliation {
        root_online: true,
        ..Reconciliation::default()
    };
    result.stats.cached = cached.len();

    let mut cached = cached;

    for path in scanner.enumerate(root) {
        result.stats.on_disk += 1;

        match cached.remove(&path) {
            Some(record) => match stat(&path) {
                Some((size, mtime)) => {
                    if size == record.size && mtime == record.mtime {
                        result.stats.unchanged += 1;
                        result.unchanged.push(record);
                    } else {
                        result.stats.changed += 1;
                        result.to_process.push(path);
                    }
                }
                None => {
                    // Vanished between enumeration and stat. The cached
                    // record is left alone; it becomes stale next scan.
                    result.stats.vanished += 1;
                }
            },
            None => match stat(&path) {
                Some(_) => {
                    result.stats.new += 1;
                    result.to_process.push(path);
                }
                None => {
                    result.stats.vanished += 1;
                }
            },
        }
        if result.stats.on_disk % 1_000 == 0 {
            log::trace!(
                "reconciled {} file(s) under {}",
                result.stats.on_disk,
                root.display()
            );
        }
    }

    // Whatever is left in the cached map was not seen on disk.
    result.stale = cached.into_keys().collect();
    result.stats.stale = result.stale.len();

    log::debug!(
        "reconciled {}: {} unchanged, {} changed, {} new, {} stale, {} vanished",
        root.display(),
        result.stats.unchanged,
        result.stats.changed,
        result.stats.new,
        result.stats.stale,
        result.stats.vanished
    );

    result
}

/// Stat a file for (size, mtime-seconds). `None` if it vanished or is
/// otherwise unreadable.
#[must_use]
pub fn stat(path: &Path) -> Option<(u64, f64)> {
    let metadata = std::fs::metadata(path).ok()?;
    let mtime = metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_secs_f64();
    Some((metadata.len(), mtime))
}
