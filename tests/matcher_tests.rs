use mediadupe::matcher::{
    build_entities, find_duplicates, merge_entities, similarity_score, SIMILARITY_THRESHOLD,
};
use mediadupe::media::{MediaFile, VideoMetadata};
use std::path::PathBuf;

fn file(path: &str, size: u64) -> MediaFile {
    MediaFile::new(PathBuf::from(path), size, 1_000.0)
}

fn file_with_duration(path: &str, duration: f64) -> MediaFile {
    let mut f = file(path, 100);
    f.metadata = Some(VideoMetadata {
        duration,
        width: 1280,
        height: 720,
        codec: "h264".to_string(),
    });
    f
}

#[test]
fn test_two_renditions_same_folder_one_group() {
    // Two renditions of S01E01 in the same folder yield one group with
    // the id and display title derived from the episode key.
    let report = find_duplicates(vec![
        file("/tv/Show/Show.S01E01.1080p.mkv", 1_200_000_000),
        file("/tv/Show/Show.S01E01.720p.mkv", 700_000_000),
    ]);

    assert_eq!(report.series.len(), 1);
    let groups = &report.series["Show"];
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, "1-1");
    assert_eq!(groups[0].display_title, "S01E01");
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_similar_movie_folders_merge() {
    // Similar folder names, no episode keys: structure signal is neutral
    // and the folder-name similarity carries the pair over the threshold.
    let report = find_duplicates(vec![
        file("/m/MovieX (2020)/MovieX.2020.mkv", 1),
        file("/m/MovieX 2020 Bluray/MovieX.2020.Bluray.mkv", 2),
    ]);

    assert!(report.series.is_empty());
    assert_eq!(report.movies.len(), 1);
    assert_eq!(report.movies[0].len(), 2);
}

#[test]
fn test_unrelated_movies_stay_separate() {
    let report = find_duplicates(vec![
        file("/m/MovieX (2020)/MovieX.2020.mkv", 1),
        file("/m/Completely Different/Other.Film.mkv", 2),
    ]);

    // Neither folder has an internal duplicate and they must not merge.
    assert!(report.is_empty());
}

#[test]
fn test_score_symmetry() {
    let entities = build_entities(vec![
        file("/tv/The Show/The.Show.S01E01.mkv", 1),
        file("/tv/The Show HD/The.Show.S01E01.1080p.mkv", 2),
    ]);
    assert_eq!(entities.len(), 2);
    assert_eq!(
        similarity_score(&entities[0], &entities[1]),
        similarity_score(&entities[1], &entities[0])
    );
}

#[test]
fn test_duration_veto_beats_identical_names() {
    // Same episode key, same names, but durations differ by far more
    // than 10%: the pair score must be exactly zero.
    let entities = build_entities(vec![
        file_with_duration("/a/Show/Show.S01E01.mkv", 2_400.0),
        file_with_duration("/b/Show/Show.S01E01.mkv", 1_200.0),
    ]);
    assert_eq!(similarity_score(&entities[0], &entities[1]), 0.0);

    let mut entities = entities;
    merge_entities(&mut entities);
    assert_eq!(entities.len(), 2, "vetoed entities must not merge");
}

#[test]
fn test_matching_durations_allow_merge() {
    let mut entities = build_entities(vec![
        file_with_duration("/a/Show/Show.S01E01.mkv", 1_200.0),
        file_with_duration("/b/Show/Show.S01E01.1080p.mkv", 1_210.0),
    ]);
    assert!(similarity_score(&entities[0], &entities[1]) >= SIMILARITY_THRESHOLD);

    merge_entities(&mut entities);
    assert_eq!(entities.len(), 1);

    let report = find_duplicates(vec![
        file_with_duration("/a/Show/Show.S01E01.mkv", 1_200.0),
        file_with_duration("/b/Show/Show.S01E01.1080p.mkv", 1_210.0),
    ]);
    assert_eq!(report.series.len(), 1);
    let groups = report.series.values().next().unwrap();
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_series_split_across_folders_merges_on_structure() {
    // Same show ripped into two folders with overlapping episodes.
    let report = find_duplicates(vec![
        file("/tv/Show Season 1/Show.S01E01.mkv", 1),
        file("/tv/Show Season 1/Show.S01E02.mkv", 2),
        file("/tv/Show S01 1080p/Show.S01E01.1080p.mkv", 3),
        file("/tv/Show S01 1080p/Show.S01E02.1080p.mkv", 4),
    ]);

    assert_eq!(report.series.len(), 1);
    let groups = report.series.values().next().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].id, "1-1");
    assert_eq!(groups[1].id, "1-2");
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_single_member_episode_groups_dropped() {
    let report = find_duplicates(vec![
        file("/tv/Show/Show.S01E01.mkv", 1),
        file("/tv/Show/Show.S01E02.mkv", 2),
        file("/tv/Show/Show.S01E03.mkv", 3),
    ]);
    assert!(report.is_empty());
}

#[test]
fn test_output_is_deterministic() {
    let make = || {
        vec![
            file("/tv/Show B/Show.B.S01E01.a.mkv", 1),
            file("/tv/Show B/Show.B.S01E01.b.mkv", 2),
            file("/m/MovieX (2020)/MovieX.2020.mkv", 3),
            file("/m/MovieX 2020 Bluray/MovieX.2020.Bluray.mkv", 4),
            file("/tv/Show A/Show.A.S02E05.x.mkv", 5),
            file("/tv/Show A/Show.A.S02E05.y.mkv", 6),
        ]
    };

    let first = serde_json::to_string(&find_duplicates(make())).unwrap();
    let mut shuffled = make();
    shuffled.reverse();
    shuffled.swap(0, 3);
    let second = serde_json::to_string(&find_duplicates(shuffled)).unwrap();

    assert_eq!(first, second);
}
