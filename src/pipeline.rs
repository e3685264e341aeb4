//! Scan pipeline orchestration.
//!
//! # Overview
//!
//! One [`ScanPipeline::run`] call executes a full scan:
//!
//! 1. **Collecting** — per root: pull cached records, reconcile against
//!    disk (or fall back to the cache wholesale when the root is offline),
//!    and remove stale records in one batch.
//! 2. **Processing** — parse and probe every new or changed file, then
//!    write the fresh records back per root in batches and refresh each
//!    online root's last-scanned timestamp.
//! 3. **Assembling** — cluster the combined working set into duplicate
//!    groups, drop ignored identities, and apply recommendations.
//!
//! Progress and status flow through the [`ScanEvents`] interface; the
//! caller typically runs the pipeline on a worker thread so its own thread
//! stays free for signal handling. Cancellation is cooperative: the shared
//! flag is polled between roots, between files and before assembly. A
//! cancelled scan performs no further cache writes but keeps the writes
//! already committed.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::{CacheError, CacheStore};
use crate::ignore_filter;
use crate::matcher;
use crate::media::{DuplicateReport, MediaFile, ParsedInfo};
use crate::parser::{parse_episode, parse_resolution};
use crate::probe::MetadataProbe;
use crate::reconcile;
use crate::recommender::Recommender;
use crate::scanner::MediaScanner;

/// Errors that abort a scan.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Cache read or write failure.
    #[error("scan cache failure: {0}")]
    Cache(#[from] CacheError),

    /// The scan was cancelled via the shutdown flag.
    #[error("scan interrupted")]
    Interrupted,
}

/// Progress value reported through [`ScanEvents::on_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    /// Work amount unknown (collection phase).
    Indeterminate,
    /// Percent complete, 0-100.
    Percent(u8),
}

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Enumerating roots and reconciling against the cache.
    Collecting,
    /// Parsing and probing new/changed files.
    Processing,
    /// Clustering, filtering and recommending.
    Assembling,
    /// Finished successfully.
    Done,
    /// Stopped by the shutdown flag.
    Cancelled,
    /// Aborted by an unrecoverable error.
    Failed,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Collecting => "collecting",
            Self::Processing => "processing",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Event interface between the pipeline and its caller.
///
/// All methods have empty defaults so implementors only handle what they
/// display. Methods are called from the thread running the pipeline.
pub trait ScanEvents: Send + Sync {
    /// Free-form status line ("Processing (3/120): Show.S01E02.mkv").
    fn on_status(&self, _text: &str) {}
    /// Phase transition.
    fn on_phase(&self, _phase: ScanPhase) {}
    /// Numeric or indeterminate progress.
    fn on_progress(&self, _progress: ScanProgress) {}
    /// Final result, emitted once on success.
    fn on_result(&self, _report: &DuplicateReport) {}
    /// Human-readable message for an unrecoverable failure.
    fn on_error(&self, _message: &str) {}
    /// Terminal signal, emitted exactly once on every outcome.
    fn on_done(&self) {}
}

/// Event sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

impl ScanEvents for NullEvents {}

/// Orchestrates one scan across a set of roots.
pub struct ScanPipeline {
    cache: Box<dyn CacheStore>,
    probe: Arc<dyn MetadataProbe>,
    scanner: MediaScanner,
    recommender: Recommender,
    events: Arc<dyn ScanEvents>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl ScanPipeline {
    /// Create a pipeline over the given collaborators.
    #[must_use]
    pub fn new(
        cache: Box<dyn CacheStore>,
        probe: Arc<dyn MetadataProbe>,
        scanner: MediaScanner,
        recommender: Recommender,
    ) -> Self {
        Self {
            cache,
            probe,
            scanner,
            recommender,
            events: Arc::new(NullEvents),
            shutdown_flag: None,
        }
    }

    /// Set the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn ScanEvents>) -> Self {
        self.events = events;
        self
    }

    /// Set the shutdown flag for cooperative cancellation.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Run the scan and return the final report.
    ///
    /// Emits `on_result` on success, `on_error` on unrecoverable failure,
    /// a cancellation status on interruption, and `on_done` in every case.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Interrupted`] when cancelled;
    /// [`PipelineError::Cache`] when the store fails.
    pub fn run(&mut self, roots: &[PathBuf]) -> Result<DuplicateReport, PipelineError> {
        let result = self.run_inner(roots);

        match &result {
            Ok(report) => {
                self.events.on_phase(ScanPhase::Done);
                self.events.on_result(report);
                self.events.on_status(&format!(
                    "Scan complete: {} duplicate group(s) found",
                    report.group_count()
                ));
            }
            Err(PipelineError::Interrupted) => {
                self.events.on_phase(ScanPhase::Cancelled);
                self.events.on_status("Scan cancelled by user.");
                log::info!("scan cancelled");
            }
            Err(e) => {
                self.events.on_phase(ScanPhase::Failed);
                self.events.on_error(&e.to_string());
                log::error!("scan failed: {e}");
            }
        }
        self.events.on_done();

        result
    }

    fn run_inner(&mut self, roots: &[PathBuf]) -> Result<DuplicateReport, PipelineError> {
        // The ignore set is snapshotted up front; entries added mid-scan
        // apply from the next scan.
        let ignored = self.cache.ignore_keys()?;

        // Phase 1: collection and reconciliation.
        self.events.on_phase(ScanPhase::Collecting);
        self.events.on_progress(ScanProgress::Indeterminate);
        self.events.on_status("Collecting files...");

        let mut working_set: Vec<MediaFile> = Vec::new();
        let mut to_process: Vec<(PathBuf, PathBuf)> = Vec::new(); // (file, root)
        let mut online_roots: Vec<PathBuf> = Vec::new();

        for (index, root) in roots.iter().enumerate() {
            if self.is_cancelled() {
                return Err(PipelineError::Interrupted);
            }
            self.events.on_status(&format!(
                "Checking root ({}/{}): {}",
                index + 1,
                roots.len(),
                root.display()
            ));

            let cached = self.cache.files_for_root(root)?;
            let recon = reconcile::reconcile(root, &self.scanner, cached);

            if recon.root_online {
                self.cache.remove_files_batch(&recon.stale)?;
                online_roots.push(root.clone());
            } else {
                self.events.on_status(&format!(
                    "Root offline, using cached records: {}",
                    root.display()
                ));
            }

            working_set.extend(recon.unchanged);
            to_process.extend(recon.to_process.into_iter().map(|p| (p, root.clone())));
        }

        // Deterministic processing and output ordering regardless of
        // enumeration order.
        to_process.sort();

        // Phase 2: process new and changed files.
        self.events.on_phase(ScanPhase::Processing);
        let processed = self.process_files(&to_process)?;

        // Phase 3: cache updates, batched per root. Roots are registered
        // (and stamped) first so file records always have a parent row.
        for root in &online_roots {
            self.cache.upsert_scan_root(root, &volume_label(root))?;
        }
        let mut by_root: HashMap<PathBuf, Vec<MediaFile>> = HashMap::new();
        for (file, root) in processed {
            by_root.entry(root).or_default().push(file);
        }
        for (root, files) in &by_root {
            self.cache.upsert_files_batch(root, files)?;
        }

        working_set.extend(by_root.into_values().flatten());

        if self.is_cancelled() {
            return Err(PipelineError::Interrupted);
        }

        // Phase 4: assembly, filtering, recommendation.
        self.events.on_phase(ScanPhase::Assembling);
        self.events.on_status(&format!(
            "Identifying duplicates in {} file(s)...",
            working_set.len()
        ));
        self.events.on_progress(ScanProgress::Percent(100));

        let report = matcher::find_duplicates(working_set);
        let mut report = ignore_filter::apply(report, &ignored);
        self.recommender.apply_to_report(&mut report);

        Ok(report)
    }

    /// Parse and probe each pending file. Files that vanished between
    /// enumeration and stat are dropped silently.
    fn process_files(
        &mut self,
        to_process: &[(PathBuf, PathBuf)],
    ) -> Result<Vec<(MediaFile, PathBuf)>, PipelineError> {
        let total = to_process.len();
        let mut processed = Vec::with_capacity(total);

        for (index, (path, root)) in to_process.iter().enumerate() {
            if self.is_cancelled() {
                return Err(PipelineError::Interrupted);
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.events
                .on_status(&format!("Processing ({}/{}): {}", index + 1, total, name));
            let percent = ((index + 1) * 100 / total.max(1)) as u8;
            self.events.on_progress(ScanProgress::Percent(percent));

            let Some((size, mtime)) = reconcile::stat(path) else {
                log::debug!("file vanished before processing: {}", path.display());
                continue;
            };

            let mut file = MediaFile::new(path.clone(), size, mtime);
            file.parsed = parse_file_name(&name);
            file.metadata = self.probe.probe(path);

            processed.push((file, root.clone()));
        }

        Ok(processed)
    }
}

/// Parse the filename-derived fields for a fresh file.
fn parse_file_name(name: &str) -> ParsedInfo {
    let mut parsed = ParsedInfo::default();
    if let Some((season, episode)) = parse_episode(name) {
        parsed.season = Some(season);
        parsed.episode = Some(episode);
    }
    parsed.resolution = parse_resolution(name);
    parsed
}

/// Volume label for a root: its first path component.
///
/// On Windows this is the drive prefix ("C:"), elsewhere the filesystem
/// root.
#[must_use]
pub fn volume_label(root: &Path) -> String {
    match root.components().next() {
        Some(Component::Prefix(prefix)) => prefix.as_os_str().to_string_lossy().into_owned(),
        Some(component) => component.as_os_str().to_string_lossy().into_owned(),
        None => String::new(),
    }
}
