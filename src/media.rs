//! Core data model for media duplicate detection.
//!
//! # Overview
//!
//! This module defines the types that flow through the scan pipeline:
//!
//! * [`MediaFile`]: one physical file with parsed and probed information
//! * [`EpisodeKey`]: an exact, hashable (season, episode) key
//! * [`DuplicateGroup`]: a set of files believed to be the same content
//! * [`DuplicateReport`]: the final result structure returned to the caller
//!
//! `MediaFile` records are persisted in the scan cache (minus the
//! scan-session-local recommendation fields); groups and reports are
//! rebuilt on every scan and never stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Recommendation state for a file within a duplicate group.
///
/// `Suggested`/`Review` is the non-destructive default pair; `Keep`/`Delete`
/// is the direct pair produced when the recommender runs in apply mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    /// Needs human review; no winner determined or file lost a tie-break.
    Review,
    /// Proposed winner, pending user confirmation.
    Suggested,
    /// Confirmed winner of its group.
    Keep,
    /// Redundant copy; a better version exists.
    Delete,
}

impl Default for Recommendation {
    fn default() -> Self {
        Self::Review
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Review => "REVIEW",
            Self::Suggested => "SUGGESTED",
            Self::Keep => "KEEP",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Technical video metadata returned by a metadata probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Duration in seconds.
    #[serde(default)]
    pub duration: f64,
    /// Frame width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Frame height in pixels.
    #[serde(default)]
    pub height: u32,
    /// Video codec name (e.g. "h264", "hevc").
    #[serde(default)]
    pub codec: String,
}

/// Information parsed from a filename.
///
/// Season/episode come from the ordered pattern rules in [`crate::parser`];
/// the resolution token is a secondary field used as a quality fallback when
/// no probe metadata is available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedInfo {
    /// Season number (>= 0) if the filename parsed as an episode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    /// Episode number if the filename parsed as an episode.
    /// Fractional values express half-episodes ("5.5").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<f32>,
    /// Resolution token found in the filename ("1080p", "4k", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl ParsedInfo {
    /// True if both season and episode were parsed.
    #[must_use]
    pub fn is_episode(&self) -> bool {
        self.season.is_some() && self.episode.is_some()
    }
}

/// Exact (season, episode) key.
///
/// Episodes are stored as integer tenths so that half-episodes get exact
/// `Eq`/`Ord`/`Hash` semantics; the parser never produces anything finer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeKey {
    /// Season number.
    pub season: u32,
    /// Episode number multiplied by ten ("E05" -> 50, "E5.5" -> 55).
    pub tenths: u32,
}

impl EpisodeKey {
    /// Build a key from a season and a fractional episode number.
    #[must_use]
    pub fn new(season: u32, episode: f32) -> Self {
        Self {
            season,
            tenths: (episode * 10.0).round() as u32,
        }
    }

    /// The episode number as a float.
    #[must_use]
    pub fn episode(&self) -> f32 {
        self.tenths as f32 / 10.0
    }

    /// Episode rendered without a trailing `.0` ("1", "5.5").
    #[must_use]
    pub fn episode_str(&self) -> String {
        if self.tenths % 10 == 0 {
            format!("{}", self.tenths / 10)
        } else {
            format!("{}.{}", self.tenths / 10, self.tenths % 10)
        }
    }

    /// Stable group id for this key ("1-1", "1-5.5").
    #[must_use]
    pub fn group_id(&self) -> String {
        format!("{}-{}", self.season, self.episode_str())
    }

    /// Display title ("S01E01", "S01E5.5").
    ///
    /// Whole episode numbers are zero-padded to two digits; half-episodes
    /// are rendered with their fraction.
    #[must_use]
    pub fn display_title(&self) -> String {
        if self.tenths % 10 == 0 {
            format!("S{:02}E{:02}", self.season, self.tenths / 10)
        } else {
            format!("S{:02}E{}", self.season, self.episode_str())
        }
    }
}

/// One physical media file discovered under a scan root.
///
/// Identity within a root is the absolute path. Size and mtime drive cache
/// invalidation; `parsed` and `metadata` are reused from the cache when the
/// file is unchanged. Recommendation fields are scan-session-local and are
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Modification time as fractional seconds since the Unix epoch.
    pub mtime: f64,
    /// Information parsed from the filename.
    #[serde(default)]
    pub parsed: ParsedInfo,
    /// Probed technical metadata; absent until probed or if probing failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
    /// Recommendation for this file within its duplicate group.
    #[serde(skip, default)]
    pub recommendation: Recommendation,
    /// Human-readable explanation for the recommendation.
    #[serde(skip, default)]
    pub reason: String,
}

impl MediaFile {
    /// Create a new media file record with no parsed or probed information.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, mtime: f64) -> Self {
        Self {
            path,
            size,
            mtime,
            parsed: ParsedInfo::default(),
            metadata: None,
            recommendation: Recommendation::Review,
            reason: String::new(),
        }
    }

    /// The file name component, lossily converted.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The containing folder.
    #[must_use]
    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// The (season, episode) key if the filename parsed as an episode.
    #[must_use]
    pub fn episode_key(&self) -> Option<EpisodeKey> {
        match (self.parsed.season, self.parsed.episode) {
            (Some(season), Some(episode)) => Some(EpisodeKey::new(season, episode)),
            _ => None,
        }
    }

    /// True if this file is a series episode rather than a movie.
    #[must_use]
    pub fn is_series_episode(&self) -> bool {
        self.parsed.is_episode()
    }
}

/// A finalized set of files believed to represent the same content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Stable group identifier within this scan ("1-1" for S01E01, or the
    /// canonical title for movies).
    pub id: String,
    /// Title shown to the user ("S01E01" or the movie folder name).
    pub display_title: String,
    /// Member files. Groups with a single member carry no actionable
    /// duplicates.
    pub files: Vec<MediaFile>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(id: String, display_title: String, files: Vec<MediaFile>) -> Self {
        Self {
            id,
            display_title,
            files,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Space reclaimable if only the largest copy were kept.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        let largest = self.files.iter().map(|f| f.size).max().unwrap_or(0);
        self.total_size().saturating_sub(largest)
    }
}

/// Final result of a scan: duplicate groups keyed by series title, plus a
/// flat list of movie groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Per-series duplicate episode groups, keyed by canonical series title.
    pub series: BTreeMap<String, Vec<DuplicateGroup>>,
    /// Movie duplicate groups.
    pub movies: Vec<DuplicateGroup>,
}

impl DuplicateReport {
    /// Total number of duplicate groups across series and movies.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.series.values().map(Vec::len).sum::<usize>() + self.movies.len()
    }

    /// True if the scan found no duplicates at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty() && self.movies.is_empty()
    }

    /// Total number of files across all groups.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.series
            .values()
            .flat_map(|groups| groups.iter())
            .map(DuplicateGroup::len)
            .sum::<usize>()
            + self.movies.iter().map(DuplicateGroup::len).sum::<usize>()
    }
}
