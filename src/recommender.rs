//! Recommendation engine.
//!
//! # Overview
//!
//! Within each duplicate group, a user-ordered cascade of tie-break rules
//! narrows the candidate set: each rule keeps only the candidates achieving
//! its extremal value, but a narrowing is adopted only when it is strictly
//! smaller than the current set — a rule that ties everyone is skipped and
//! the next rule decides. After the last rule the first remaining candidate
//! (insertion order) wins.
//!
//! Two marking modes are supported: the non-destructive
//! `SUGGESTED`/`REVIEW` pair (default) and the direct `KEEP`/`DELETE` pair
//! for callers that treat the outcome as actionable.

use serde::{Deserialize, Serialize};

use crate::media::{DuplicateGroup, MediaFile, Recommendation};

/// How winners and losers are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum RecommendationMode {
    /// Winner is SUGGESTED, the rest REVIEW; requires user confirmation.
    Suggest,
    /// Winner is KEEP, the rest DELETE.
    Apply,
}

impl Default for RecommendationMode {
    fn default() -> Self {
        Self::Suggest
    }
}

/// A tie-break rule. Each rule reduces to "keep the candidates with the
/// highest preference value", which keeps the cascade generic and the rule
/// set open for extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Rule {
    /// Highest quality score (probed height, else filename resolution).
    QualityDesc,
    /// Largest file.
    SizeDesc,
    /// Smallest file.
    SizeAsc,
    /// Newest modification time.
    MtimeDesc,
    /// Oldest modification time.
    MtimeAsc,
}

impl Rule {
    /// Preference value for a candidate; higher wins.
    fn preference(self, file: &MediaFile) -> f64 {
        match self {
            Self::QualityDesc => f64::from(quality_score(file)),
            Self::SizeDesc => file.size as f64,
            Self::SizeAsc => -(file.size as f64),
            Self::MtimeDesc => file.mtime,
            Self::MtimeAsc => -file.mtime,
        }
    }

    /// Stable key used in config files and CLI arguments.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QualityDesc => "quality_desc",
            Self::SizeDesc => "size_desc",
            Self::SizeAsc => "size_asc",
            Self::MtimeDesc => "mtime_desc",
            Self::MtimeAsc => "mtime_asc",
        }
    }
}

/// Quality score in 0-5 buckets.
///
/// Probed frame height wins when available; otherwise the resolution token
/// parsed from the filename; otherwise 0 (unknown).
#[must_use]
pub fn quality_score(file: &MediaFile) -> u8 {
    if let Some(metadata) = &file.metadata {
        if metadata.height > 0 {
            return match metadata.height {
                h if h >= 2160 => 5,
                h if h >= 1080 => 4,
                h if h >= 720 => 3,
                h if h >= 480 => 2,
                _ => 1,
            };
        }
    }

    match file.parsed.resolution.as_deref() {
        Some("2160p" | "4k" | "uhd") => 5,
        Some("1080p") => 4,
        Some("720p") => 3,
        Some("480p" | "576p") => 2,
        _ => 0,
    }
}

/// Applies the rule cascade to duplicate groups.
#[derive(Debug, Clone)]
pub struct Recommender {
    rules: Vec<Rule>,
    mode: RecommendationMode,
}

impl Recommender {
    /// Create a recommender with the given priority order and mode.
    #[must_use]
    pub fn new(rules: Vec<Rule>, mode: RecommendationMode) -> Self {
        Self { rules, mode }
    }

    /// Mark every file in the group according to the cascade outcome.
    ///
    /// Groups with fewer than two files get REVIEW across the board; there
    /// is nothing actionable to recommend.
    pub fn apply(&self, group: &mut DuplicateGroup) {
        if group.files.len() < 2 {
            for file in &mut group.files {
                file.recommendation = Recommendation::Review;
                file.reason = "No duplicate to compare against.".to_string();
            }
            return;
        }

        let winner = self.pick_winner(&group.files);

        for (index, file) in group.files.iter_mut().enumerate() {
            if index == winner {
                match self.mode {
                    RecommendationMode::Suggest => {
                        file.recommendation = Recommendation::Suggested;
                        file.reason =
                            "Best version according to your priority rules.".to_string();
                    }
                    RecommendationMode::Apply => {
                        file.recommendation = Recommendation::Keep;
                        file.reason =
                            "Selected as the best version by your priority rules.".to_string();
                    }
                }
            } else {
                match self.mode {
                    RecommendationMode::Suggest => {
                        file.recommendation = Recommendation::Review;
                        file.reason = "A better version is available.".to_string();
                    }
                    RecommendationMode::Apply => {
                        file.recommendation = Recommendation::Delete;
                        file.reason = "A better version is being kept.".to_string();
                    }
                }
            }
        }
    }

    /// Run the cascade and return the winner's index.
    fn pick_winner(&self, files: &[MediaFile]) -> usize {
        let mut candidates: Vec<usize> = (0..files.len()).collect();

        for rule in &self.rules {
            if candidates.len() == 1 {
                break;
            }

            let values: Vec<f64> = candidates
                .iter()
                .map(|&i| rule.preference(&files[i]))
                .collect();
            let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            let narrowed: Vec<usize> = candidates
                .iter()
                .zip(&values)
                .filter(|(_, v)| **v == best)
                .map(|(&i, _)| i)
                .collect();

            // A rule that ties everyone is skipped; the next rule decides.
            if !narrowed.is_empty() && narrowed.len() < candidates.len() {
                log::trace!(
                    "rule {} narrowed {} -> {} candidate(s)",
                    rule.as_str(),
                    candidates.len(),
                    narrowed.len()
                );
                candidates = narrowed;
            }
        }

        candidates[0]
    }

    /// Apply the cascade to every group in a report.
    pub fn apply_to_report(&self, report: &mut crate::media::DuplicateReport) {
        for groups in report.series.values_mut() {
            for group in groups {
                self.apply(group);
            }
        }
        for group in &mut report.movies {
            self.apply(group);
        }
    }
}
