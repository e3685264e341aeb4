//! Directory scanning for media files.
//!
//! # Overview
//!
//! [`MediaScanner`] walks a scan root and lazily yields paths whose
//! extension is in the configured media set. The walk is sequential and
//! safe to abandon early, which is how cancellation stops a collection
//! phase mid-root.
//!
//! Unreadable directory entries are logged and skipped; deciding what to
//! do about an unreachable root is the reconciler's job, not the
//! scanner's.
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::scanner::MediaScanner;
//! use std::path::Path;
//!
//! let scanner = MediaScanner::default();
//! for path in scanner.enumerate(Path::new("/mnt/media")) {
//!     println!("{}", path.display());
//! }
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Media file extensions scanned by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "mov", "wmv", "flv", "webm"];

/// Enumerates media files under a scan root.
#[derive(Debug, Clone)]
pub struct MediaScanner {
    /// Lowercased extensions (without dot) treated as media files.
    extensions: Vec<String>,
}

impl Default for MediaScanner {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect())
    }
}

impl MediaScanner {
    /// Create a scanner for a custom extension set.
    ///
    /// Extensions are matched case-insensitively and without the leading
    /// dot.
    #[must_use]
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// True if the path's extension is in the configured media set.
    #[must_use]
    pub fn is_media_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Lazily enumerate media files under `root`.
    ///
    /// The returned iterator is finite and cheap to drop early. Entries
    /// that cannot be read (permissions, vanished directories) are logged
    /// at debug level and skipped.
    pub fn enumerate<'a>(&'a self, root: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::debug!("skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(move |path| self.is_media_file(path))
    }
}
