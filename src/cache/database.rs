//! SQLite-backed scan cache.
//!
//! Implements [`CacheStore`] over three tables:
//!
//! * `scanned_paths(path PK, volume_name, last_scanned)`
//! * `media_files(file_path PK, scan_path FK -> scanned_paths ON DELETE
//!   CASCADE, size, mtime, parsed_info_json, metadata_info_json)`
//! * `ignore_list(ignore_key PK, ignore_level, date_added)`
//!
//! Parsed and probed info are stored as JSON columns so the schema stays
//! stable while the parsed field set evolves. Batch operations run inside
//! a single transaction.

use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::{CacheResult, CacheStore, IgnoreEntry, IgnoreLevel, ScanRoot};
use crate::media::{MediaFile, ParsedInfo, VideoMetadata};

/// Persistent scan cache backed by SQLite.
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Open or create a cache database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory cache that lives only as long as the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> CacheResult<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS scanned_paths (
                 path TEXT PRIMARY KEY,
                 volume_name TEXT NOT NULL DEFAULT '',
                 last_scanned INTEGER NOT NULL DEFAULT 0
             );
             CREATE TABLE IF NOT EXISTS media_files (
                 file_path TEXT PRIMARY KEY,
                 scan_path TEXT NOT NULL,
                 size INTEGER NOT NULL,
                 mtime REAL NOT NULL,
                 parsed_info_json TEXT,
                 metadata_info_json TEXT,
                 FOREIGN KEY (scan_path) REFERENCES scanned_paths (path)
                     ON DELETE CASCADE
             );
             CREATE INDEX IF NOT EXISTS idx_media_files_scan_path
                 ON media_files (scan_path);
             CREATE TABLE IF NOT EXISTS ignore_list (
                 ignore_key TEXT PRIMARY KEY,
                 ignore_level TEXT NOT NULL,
                 date_added INTEGER NOT NULL
             );",
        )?;
        Ok(Self { conn })
    }

    fn row_to_media_file(
        path: String,
        size: i64,
        mtime: f64,
        parsed_json: Option<String>,
        metadata_json: Option<String>,
    ) -> CacheResult<MediaFile> {
        let parsed: ParsedInfo = match parsed_json {
            Some(json) if !json.is_empty() => serde_json::from_str(&json)?,
            _ => ParsedInfo::default(),
        };
        let metadata: Option<VideoMetadata> = match metadata_json {
            Some(json) if !json.is_empty() => Some(serde_json::from_str(&json)?),
            _ => None,
        };

        let mut file = MediaFile::new(PathBuf::from(path), size as u64, mtime);
        file.parsed = parsed;
        file.metadata = metadata;
        Ok(file)
    }
}

impl CacheStore for SqliteCache {
    fn list_scan_roots(&mut self) -> CacheResult<Vec<ScanRoot>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, volume_name, last_scanned FROM scanned_paths
             ORDER BY last_scanned DESC",
        )?;
        let roots = stmt
            .query_map([], |row| {
                Ok(ScanRoot {
                    path: PathBuf::from(row.get::<_, String>(0)?),
                    volume_label: row.get(1)?,
                    last_scanned: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roots)
    }

    fn upsert_scan_root(&mut self, path: &Path, volume_label: &str) -> CacheResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO scanned_paths (path, volume_name, last_scanned)
             VALUES (?1, ?2, ?3)",
            params![
                path.to_string_lossy(),
                volume_label,
                chrono::Utc::now().timestamp()
            ],
        )?;
        Ok(())
    }

    fn delete_scan_root(&mut self, path: &Path) -> CacheResult<()> {
        let removed = self.conn.execute(
            "DELETE FROM scanned_paths WHERE path = ?1",
            params![path.to_string_lossy()],
        )?;
        log::debug!("removed scan root {} (existed: {})", path.display(), removed > 0);
        Ok(())
    }

    fn files_for_root(&mut self, root: &Path) -> CacheResult<HashMap<PathBuf, MediaFile>> {
        let mut stmt = self.conn.prepare(
            "SELECT file_path, size, mtime, parsed_info_json, metadata_info_json
             FROM media_files WHERE scan_path = ?1",
        )?;
        let rows = stmt.query_map(params![root.to_string_lossy()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut files = HashMap::new();
        for row in rows {
            let (path, size, mtime, parsed_json, metadata_json) = row?;
            let file = Self::row_to_media_file(path, size, mtime, parsed_json, metadata_json)?;
            files.insert(file.path.clone(), file);
        }
        Ok(files)
    }

    fn upsert_files_batch(&mut self, root: &Path, files: &[MediaFile]) -> CacheResult<()> {
        if files.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO media_files
                 (file_path, scan_path, size, mtime, parsed_info_json, metadata_info_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for file in files {
                let parsed_json = serde_json::to_string(&file.parsed)?;
                let metadata_json = file
                    .metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    file.path.to_string_lossy(),
                    root.to_string_lossy(),
                    file.size as i64,
                    file.mtime,
                    parsed_json,
                    metadata_json,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("cached {} file record(s) under {}", files.len(), root.display());
        Ok(())
    }

    fn remove_files_batch(&mut self, paths: &[PathBuf]) -> CacheResult<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM media_files WHERE file_path = ?1")?;
            for path in paths {
                stmt.execute(params![path.to_string_lossy()])?;
            }
        }
        tx.commit()?;
        log::debug!("removed {} stale cache record(s)", paths.len());
        Ok(())
    }

    fn add_ignore_entry(&mut self, key: &str, level: IgnoreLevel) -> CacheResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO ignore_list (ignore_key, ignore_level, date_added)
             VALUES (?1, ?2, ?3)",
            params![key, level.as_str(), chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove_ignore_entry(&mut self, key: &str) -> CacheResult<()> {
        self.conn
            .execute("DELETE FROM ignore_list WHERE ignore_key = ?1", params![key])?;
        Ok(())
    }

    fn ignore_keys(&mut self) -> CacheResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT ignore_key FROM ignore_list")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(keys)
    }

    fn ignore_entries(&mut self) -> CacheResult<Vec<IgnoreEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT ignore_key, ignore_level, date_added FROM ignore_list
             ORDER BY date_added DESC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries
            .into_iter()
            .map(|(key, level, added_at)| IgnoreEntry {
                key,
                // Unknown levels degrade to MOVIE rather than dropping the row.
                level: IgnoreLevel::from_str_opt(&level).unwrap_or(IgnoreLevel::Movie),
                added_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Recommendation;

    fn make_file(path: &str, size: u64, mtime: f64) -> MediaFile {
        let mut file = MediaFile::new(PathBuf::from(path), size, mtime);
        file.parsed = ParsedInfo {
            season: Some(1),
            episode: Some(2.0),
            resolution: Some("1080p".to_string()),
        };
        file
    }

    #[test]
    fn test_upsert_and_fetch_files() {
        let mut cache = SqliteCache::open_in_memory().unwrap();
        let root = Path::new("/tv");
        cache.upsert_scan_root(root, "tv-volume").unwrap();

        let files = vec![
            make_file("/tv/Show/a.mkv", 100, 1.5),
            make_file("/tv/Show/b.mkv", 200, 2.5),
        ];
        cache.upsert_files_batch(root, &files).unwrap();

        let fetched = cache.files_for_root(root).unwrap();
        assert_eq!(fetched.len(), 2);
        let a = &fetched[Path::new("/tv/Show/a.mkv")];
        assert_eq!(a.size, 100);
        assert_eq!(a.mtime, 1.5);
        assert_eq!(a.parsed.season, Some(1));
        assert_eq!(a.parsed.resolution.as_deref(), Some("1080p"));
        // Recommendation state is session-local and must come back default.
        assert_eq!(a.recommendation, Recommendation::Review);
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut cache = SqliteCache::open_in_memory().unwrap();
        let root = Path::new("/tv");
        cache.upsert_scan_root(root, "vol").unwrap();

        let mut file = make_file("/tv/Show/a.mkv", 100, 1.0);
        file.metadata = Some(VideoMetadata {
            duration: 1421.5,
            width: 1920,
            height: 1080,
            codec: "h264".to_string(),
        });
        cache.upsert_files_batch(root, &[file]).unwrap();

        let fetched = cache.files_for_root(root).unwrap();
        let meta = fetched[Path::new("/tv/Show/a.mkv")].metadata.as_ref().unwrap();
        assert_eq!(meta.height, 1080);
        assert_eq!(meta.codec, "h264");
    }

    #[test]
    fn test_remove_files_batch() {
        let mut cache = SqliteCache::open_in_memory().unwrap();
        let root = Path::new("/tv");
        cache.upsert_scan_root(root, "vol").unwrap();
        cache
            .upsert_files_batch(
                root,
                &[
                    make_file("/tv/a.mkv", 1, 1.0),
                    make_file("/tv/b.mkv", 2, 2.0),
                ],
            )
            .unwrap();

        cache
            .remove_files_batch(&[PathBuf::from("/tv/a.mkv")])
            .unwrap();
        let fetched = cache.files_for_root(root).unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(fetched.contains_key(Path::new("/tv/b.mkv")));
    }

    #[test]
    fn test_delete_scan_root_cascades() {
        let mut cache = SqliteCache::open_in_memory().unwrap();
        let root = Path::new("/tv");
        cache.upsert_scan_root(root, "vol").unwrap();
        cache
            .upsert_files_batch(root, &[make_file("/tv/a.mkv", 1, 1.0)])
            .unwrap();

        cache.delete_scan_root(root).unwrap();
        assert!(cache.list_scan_roots().unwrap().is_empty());
        assert!(cache.files_for_root(root).unwrap().is_empty());
    }

    #[test]
    fn test_scan_roots_ordering() {
        let mut cache = SqliteCache::open_in_memory().unwrap();
        cache.upsert_scan_root(Path::new("/a"), "va").unwrap();
        cache.upsert_scan_root(Path::new("/b"), "vb").unwrap();

        let roots = cache.list_scan_roots().unwrap();
        assert_eq!(roots.len(), 2);
        for root in &roots {
            assert!(root.last_scanned > 0);
        }
    }

    #[test]
    fn test_ignore_list_operations() {
        let mut cache = SqliteCache::open_in_memory().unwrap();
        cache
            .add_ignore_entry("the show", IgnoreLevel::Series)
            .unwrap();
        cache
            .add_ignore_entry("the show/1-2", IgnoreLevel::Episode)
            .unwrap();
        cache.add_ignore_entry("moviex", IgnoreLevel::Movie).unwrap();

        let keys = cache.ignore_keys().unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains("the show/1-2"));

        let entries = cache.ignore_entries().unwrap();
        assert_eq!(entries.len(), 3);

        cache.remove_ignore_entry("moviex").unwrap();
        assert_eq!(cache.ignore_keys().unwrap().len(), 2);
    }

    #[test]
    fn test_upsert_replaces_existing_record() {
        let mut cache = SqliteCache::open_in_memory().unwrap();
        let root = Path::new("/tv");
        cache.upsert_scan_root(root, "vol").unwrap();

        cache
            .upsert_files_batch(root, &[make_file("/tv/a.mkv", 1, 1.0)])
            .unwrap();
        cache
            .upsert_files_batch(root, &[make_file("/tv/a.mkv", 99, 9.0)])
            .unwrap();

        let fetched = cache.files_for_root(root).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[Path::new("/tv/a.mkv")].size, 99);
    }
}
