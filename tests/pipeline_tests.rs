use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use mediadupe::cache::{CacheStore, IgnoreLevel, SqliteCache};
use mediadupe::media::{Recommendation, VideoMetadata};
use mediadupe::pipeline::{PipelineError, ScanPipeline};
use mediadupe::probe::{MetadataProbe, NullProbe};
use mediadupe::recommender::{RecommendationMode, Recommender, Rule};
use mediadupe::scanner::MediaScanner;
use tempfile::TempDir;

/// Probe double that counts invocations and serves canned heights.
struct CountingProbe {
    calls: Arc<AtomicUsize>,
    heights: HashMap<String, u32>,
}

impl CountingProbe {
    fn new(calls: Arc<AtomicUsize>, heights: HashMap<String, u32>) -> Self {
        Self { calls, heights }
    }
}

impl MetadataProbe for CountingProbe {
    fn probe(&self, path: &Path) -> Option<VideoMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = path.file_name()?.to_string_lossy().into_owned();
        let height = *self.heights.get(&name)?;
        Some(VideoMetadata {
            duration: 1_400.0,
            width: 0,
            height,
            codec: "h264".to_string(),
        })
    }
}

fn open_cache(dir: &TempDir) -> SqliteCache {
    SqliteCache::open(&dir.path().join("cache.db")).unwrap()
}

fn make_pipeline(cache: SqliteCache, probe: Arc<dyn MetadataProbe>) -> ScanPipeline {
    ScanPipeline::new(
        Box::new(cache),
        probe,
        MediaScanner::default(),
        Recommender::new(vec![Rule::QualityDesc], RecommendationMode::Suggest),
    )
}

#[test]
fn test_end_to_end_quality_recommendation() {
    let state = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let show = library.path().join("Show");
    fs::create_dir(&show).unwrap();
    fs::write(show.join("Show.S01E01.1080p.mkv"), vec![0u8; 1_200]).unwrap();
    fs::write(show.join("Show.S01E01.720p.mkv"), vec![0u8; 700]).unwrap();

    let heights = HashMap::from([
        ("Show.S01E01.1080p.mkv".to_string(), 1080),
        ("Show.S01E01.720p.mkv".to_string(), 720),
    ]);
    let calls = Arc::new(AtomicUsize::new(0));
    let probe = Arc::new(CountingProbe::new(calls.clone(), heights));

    let mut pipeline = make_pipeline(open_cache(&state), probe);
    let report = pipeline.run(&[library.path().to_path_buf()]).unwrap();

    assert_eq!(report.series.len(), 1);
    let groups = &report.series["Show"];
    assert_eq!(groups[0].id, "1-1");
    assert_eq!(groups[0].display_title, "S01E01");

    let winner = groups[0]
        .files
        .iter()
        .find(|f| f.recommendation == Recommendation::Suggested)
        .expect("one file must be suggested");
    assert!(winner.path.to_string_lossy().contains("1080p"));

    let review = groups[0]
        .files
        .iter()
        .find(|f| f.recommendation == Recommendation::Review)
        .expect("the other file must be review");
    assert!(review.path.to_string_lossy().contains("720p"));

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unchanged_files_not_reprobed_on_rescan() {
    let state = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    fs::write(library.path().join("MovieX.2020.mkv"), vec![0u8; 100]).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));

    let probe = Arc::new(CountingProbe::new(calls.clone(), HashMap::new()));
    let mut pipeline = make_pipeline(open_cache(&state), probe);
    pipeline.run(&[library.path().to_path_buf()]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Second scan over the same cache database: the record is unchanged,
    // so the probe must not run again.
    let probe = Arc::new(CountingProbe::new(calls.clone(), HashMap::new()));
    let mut pipeline = make_pipeline(open_cache(&state), probe);
    pipeline.run(&[library.path().to_path_buf()]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_modified_file_is_reprocessed() {
    let state = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let path = library.path().join("MovieX.2020.mkv");
    fs::write(&path, vec![0u8; 100]).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let probe = Arc::new(CountingProbe::new(calls.clone(), HashMap::new()));
    let mut pipeline = make_pipeline(open_cache(&state), probe);
    pipeline.run(&[library.path().to_path_buf()]).unwrap();

    // Grow the file and push its mtime so both invalidation signals fire.
    fs::write(&path, vec![0u8; 200]).unwrap();
    filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(2_000_000_000, 0))
        .unwrap();

    let probe = Arc::new(CountingProbe::new(calls.clone(), HashMap::new()));
    let mut pipeline = make_pipeline(open_cache(&state), probe);
    pipeline.run(&[library.path().to_path_buf()]).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The cache reflects the new size.
    let mut cache = open_cache(&state);
    let records = cache.files_for_root(library.path()).unwrap();
    assert_eq!(records[&path].size, 200);
}

#[test]
fn test_offline_root_serves_cached_records_verbatim() {
    let state = TempDir::new().unwrap();
    let root = PathBuf::from("/mnt/unplugged-drive");

    {
        let mut cache = open_cache(&state);
        cache.upsert_scan_root(&root, "unplugged").unwrap();
        let mut a = mediadupe::media::MediaFile::new(
            root.join("Show/Show.S01E01.1080p.mkv"),
            1_200,
            5.0,
        );
        a.parsed.season = Some(1);
        a.parsed.episode = Some(1.0);
        let mut b =
            mediadupe::media::MediaFile::new(root.join("Show/Show.S01E01.720p.mkv"), 700, 6.0);
        b.parsed.season = Some(1);
        b.parsed.episode = Some(1.0);
        cache.upsert_files_batch(&root, &[a, b]).unwrap();
    }
    let before = open_cache(&state).list_scan_roots().unwrap()[0].last_scanned;

    let mut pipeline = make_pipeline(open_cache(&state), Arc::new(NullProbe));
    let report = pipeline.run(&[root.clone()]).unwrap();

    // Cached records still produce the duplicate group.
    assert_eq!(report.series.len(), 1);
    assert_eq!(report.series["Show"][0].len(), 2);

    // Nothing was touched: records intact, last_scanned not refreshed.
    let mut cache = open_cache(&state);
    assert_eq!(cache.files_for_root(&root).unwrap().len(), 2);
    assert_eq!(cache.list_scan_roots().unwrap()[0].last_scanned, before);
}

#[test]
fn test_stale_records_removed_for_online_root() {
    let state = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    fs::write(library.path().join("keep.mkv"), vec![0u8; 10]).unwrap();

    {
        let mut cache = open_cache(&state);
        cache
            .upsert_scan_root(library.path(), "vol")
            .unwrap();
        let gone = mediadupe::media::MediaFile::new(
            library.path().join("deleted.mkv"),
            10,
            1.0,
        );
        cache.upsert_files_batch(library.path(), &[gone]).unwrap();
    }

    let mut pipeline = make_pipeline(open_cache(&state), Arc::new(NullProbe));
    pipeline.run(&[library.path().to_path_buf()]).unwrap();

    let mut cache = open_cache(&state);
    let records = cache.files_for_root(library.path()).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records.contains_key(&library.path().join("keep.mkv")));
}

#[test]
fn test_ignored_episode_group_absent_from_output() {
    let state = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let show = library.path().join("The Show");
    fs::create_dir(&show).unwrap();
    fs::write(show.join("The.Show.S01E01.a.mkv"), vec![0u8; 10]).unwrap();
    fs::write(show.join("The.Show.S01E01.b.mkv"), vec![0u8; 20]).unwrap();
    fs::write(show.join("The.Show.S01E02.a.mkv"), vec![0u8; 10]).unwrap();
    fs::write(show.join("The.Show.S01E02.b.mkv"), vec![0u8; 20]).unwrap();

    {
        let mut cache = open_cache(&state);
        cache
            .add_ignore_entry("the show/1-1", IgnoreLevel::Episode)
            .unwrap();
    }

    let mut pipeline = make_pipeline(open_cache(&state), Arc::new(NullProbe));
    let report = pipeline.run(&[library.path().to_path_buf()]).unwrap();

    let groups = &report.series["The Show"];
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, "1-2");
    // The ignored group carries no markings anywhere in the output.
    assert!(groups.iter().all(|g| g.id != "1-1"));
}

#[test]
fn test_cancellation_produces_interrupted_error() {
    let state = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    fs::write(library.path().join("a.mkv"), vec![0u8; 10]).unwrap();

    let flag = Arc::new(AtomicBool::new(true));
    let mut pipeline =
        make_pipeline(open_cache(&state), Arc::new(NullProbe)).with_shutdown_flag(flag);

    let result = pipeline.run(&[library.path().to_path_buf()]);
    assert!(matches!(result, Err(PipelineError::Interrupted)));

    // Cancelled before collection: nothing was cached.
    let mut cache = open_cache(&state);
    assert!(cache.files_for_root(library.path()).unwrap().is_empty());
}

#[test]
fn test_multiple_roots_combined() {
    let state = TempDir::new().unwrap();
    let lib_a = TempDir::new().unwrap();
    let lib_b = TempDir::new().unwrap();

    // The same movie duplicated across two roots, in similarly named
    // folders.
    let folder_a = lib_a.path().join("MovieX (2020)");
    let folder_b = lib_b.path().join("MovieX 2020 Bluray");
    fs::create_dir(&folder_a).unwrap();
    fs::create_dir(&folder_b).unwrap();
    fs::write(folder_a.join("MovieX.2020.mkv"), vec![0u8; 100]).unwrap();
    fs::write(folder_b.join("MovieX.2020.Bluray.mkv"), vec![0u8; 200]).unwrap();

    let mut pipeline = make_pipeline(open_cache(&state), Arc::new(NullProbe));
    let report = pipeline
        .run(&[lib_a.path().to_path_buf(), lib_b.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.movies.len(), 1);
    assert_eq!(report.movies[0].len(), 2);

    // Both roots were registered with fresh timestamps.
    let mut cache = open_cache(&state);
    assert_eq!(cache.list_scan_roots().unwrap().len(), 2);
}
