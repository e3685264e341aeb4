//! Ignore-list filtering.
//!
//! Applied to the assembled report before any recommendation runs, so an
//! ignored group never receives a marking. Keys are standardized with the
//! same normalization used for entity fingerprints:
//!
//! * series: `standardize(series_title)`
//! * episode: `"{standardized_series_id}/{group_id}"`
//! * movie: `standardize(display_title)`

use std::collections::HashSet;

use crate::media::DuplicateReport;
use crate::parser::standardize;

/// The standardized ignore key for a series title.
#[must_use]
pub fn series_key(title: &str) -> String {
    standardize(title)
}

/// The standardized ignore key for one episode group of a series.
#[must_use]
pub fn episode_key(series_title: &str, group_id: &str) -> String {
    format!("{}/{}", standardize(series_title), group_id)
}

/// The standardized ignore key for a movie group.
#[must_use]
pub fn movie_key(display_title: &str) -> String {
    standardize(display_title)
}

/// Drop ignored series, episode groups and movie groups from a report.
///
/// A series with all of its episode groups suppressed is dropped entirely.
#[must_use]
pub fn apply(report: DuplicateReport, ignored: &HashSet<String>) -> DuplicateReport {
    if ignored.is_empty() {
        return report;
    }

    let mut filtered = DuplicateReport::default();

    for (title, groups) in report.series {
        let series_id = series_key(&title);
        if ignored.contains(&series_id) {
            log::debug!("suppressing ignored series '{}'", title);
            continue;
        }

        let kept: Vec<_> = groups
            .into_iter()
            .filter(|group| {
                let key = format!("{}/{}", series_id, group.id);
                if ignored.contains(&key) {
                    log::debug!("suppressing ignored episode group '{}'", key);
                    false
                } else {
                    true
                }
            })
            .collect();

        if !kept.is_empty() {
            filtered.series.insert(title, kept);
        }
    }

    filtered.movies = report
        .movies
        .into_iter()
        .filter(|group| {
            let key = movie_key(&group.display_title);
            if ignored.contains(&key) {
                log::debug!("suppressing ignored movie '{}'", group.display_title);
                false
            } else {
                true
            }
        })
        .collect();

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{DuplicateGroup, MediaFile};
    use std::path::PathBuf;

    fn group(id: &str, title: &str) -> DuplicateGroup {
        DuplicateGroup::new(
            id.to_string(),
            title.to_string(),
            vec![
                MediaFile::new(PathBuf::from("/a.mkv"), 1, 1.0),
                MediaFile::new(PathBuf::from("/b.mkv"), 2, 2.0),
            ],
        )
    }

    fn sample_report() -> DuplicateReport {
        let mut report = DuplicateReport::default();
        report.series.insert(
            "The Show".to_string(),
            vec![group("1-1", "S01E01"), group("1-2", "S01E02")],
        );
        report.movies.push(group("MovieX (2020)", "MovieX (2020)"));
        report
    }

    #[test]
    fn test_no_ignores_is_identity() {
        let report = apply(sample_report(), &HashSet::new());
        assert_eq!(report.group_count(), 3);
    }

    #[test]
    fn test_series_level_suppression() {
        let ignored = HashSet::from(["the show".to_string()]);
        let report = apply(sample_report(), &ignored);
        assert!(report.series.is_empty());
        assert_eq!(report.movies.len(), 1);
    }

    #[test]
    fn test_episode_level_suppression() {
        let ignored = HashSet::from(["the show/1-1".to_string()]);
        let report = apply(sample_report(), &ignored);
        let groups = &report.series["The Show"];
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "1-2");
    }

    #[test]
    fn test_series_dropped_when_all_episodes_suppressed() {
        let ignored = HashSet::from(["the show/1-1".to_string(), "the show/1-2".to_string()]);
        let report = apply(sample_report(), &ignored);
        assert!(report.series.is_empty());
    }

    #[test]
    fn test_movie_suppression_uses_standardized_title() {
        // Bracketed year is stripped by standardization.
        let ignored = HashSet::from(["moviex".to_string()]);
        let report = apply(sample_report(), &ignored);
        assert!(report.movies.is_empty());
    }
}
