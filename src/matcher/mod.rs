//! Entity clustering and duplicate group assembly.
//!
//! # Overview
//!
//! This module implements the fuzzy duplicate identification pipeline:
//!
//! 1. **Entity building**: files are partitioned by containing folder;
//!    each folder becomes one [`MediaEntity`] carrying a standardized
//!    folder name, per-file fingerprints and a (season, episode) map.
//! 2. **Pairwise scoring**: [`similarity_score`] combines four weighted
//!    signals — folder-name similarity, title-set similarity, episode
//!    structure overlap, and duration consistency — into a [0, 100] score.
//!    Structural incompatibility and contradictory durations veto a pair
//!    outright.
//! 3. **Iterative merging**: entity pairs scoring at or above
//!    [`SIMILARITY_THRESHOLD`] are merged, repeating passes until a full
//!    pass produces no merge (fixpoint). Quadratic per pass, but the
//!    entity count is the number of distinct folders, far below the file
//!    count.
//! 4. **Assembly**: each surviving entity yields per-episode duplicate
//!    groups (series) or a single group (movies); entities with no group
//!    of two or more files are dropped.
//!
//! Determinism: entities are built in sorted folder-path order and merge
//! passes scan pairs in that order, so the same input set always produces
//! the same groups and the same retained folder names.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use crate::media::{DuplicateGroup, DuplicateReport, EpisodeKey, MediaFile};
use crate::parser::{parse_episode, parse_resolution, standardize};
use crate::similarity::{partial_ratio, token_set_ratio};

/// Minimum pairwise score for two entities to merge.
pub const SIMILARITY_THRESHOLD: f64 = 65.0;

/// Relative duration difference above which a pair of entities is vetoed.
const DURATION_VETO: f64 = 0.10;

/// Relative duration difference at which a per-pair score reaches zero.
const DURATION_FALLOFF: f64 = 0.05;

/// A folder-scoped aggregate of media files, used only during matching.
///
/// Entities are mutable during the merge pass: one entity absorbs another
/// and the loser is removed from the active set. Folder identity loses
/// meaning after a merge; the standardized name kept is whichever is
/// longer (the more descriptive one).
#[derive(Debug, Clone)]
pub struct MediaEntity {
    /// Folder this entity was created from.
    pub folder_path: PathBuf,
    /// Standardized folder name used for fuzzy comparison.
    pub standardized_name: String,
    /// Standardized per-file fingerprints.
    pub fingerprints: BTreeSet<String>,
    /// Episode-keyed files.
    pub episodes: HashMap<EpisodeKey, Vec<MediaFile>>,
    /// Files without an episode key (movie-like content).
    pub loose_files: Vec<MediaFile>,
}

impl MediaEntity {
    /// Build an entity from one folder's files.
    #[must_use]
    pub fn new(folder_path: PathBuf, files: Vec<MediaFile>) -> Self {
        let standardized_name = standardize(
            &folder_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let mut fingerprints = BTreeSet::new();
        let mut episodes: HashMap<EpisodeKey, Vec<MediaFile>> = HashMap::new();
        let mut loose_files = Vec::new();

        for file in files {
            fingerprints.insert(standardize(&file.file_name()));
            match file.episode_key() {
                Some(key) => episodes.entry(key).or_default().push(file),
                None => loose_files.push(file),
            }
        }

        Self {
            folder_path,
            standardized_name,
            fingerprints,
            episodes,
            loose_files,
        }
    }

    /// The title shown for this entity's groups: the original folder name.
    #[must_use]
    pub fn canonical_title(&self) -> String {
        self.folder_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.folder_path.to_string_lossy().into_owned())
    }

    /// Total number of files in this entity.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.episodes.values().map(Vec::len).sum::<usize>() + self.loose_files.len()
    }

    /// True if any episode key or the loose set has two or more files.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        if self.episodes.is_empty() {
            self.file_count() > 1
        } else {
            self.episodes.values().any(|files| files.len() > 1)
        }
    }

    /// Absorb another entity: union of files, episode maps and
    /// fingerprints. The standardized name kept is whichever is strictly
    /// longer; ties keep this entity's name.
    pub fn merge(&mut self, other: MediaEntity) {
        if other.standardized_name.len() > self.standardized_name.len() {
            self.standardized_name = other.standardized_name;
        }
        self.fingerprints.extend(other.fingerprints);
        for (key, files) in other.episodes {
            self.episodes.entry(key).or_default().extend(files);
        }
        self.loose_files.extend(other.loose_files);
    }
}

/// Fill in parse-derived fields that are missing on a file.
///
/// Cached records normally arrive fully parsed; this covers files cached
/// by older versions and keeps matching independent of cache contents.
fn ensure_parsed(file: &mut MediaFile) {
    if !file.parsed.is_episode() {
        if let Some((season, episode)) = parse_episode(&file.file_name()) {
            file.parsed.season = Some(season);
            file.parsed.episode = Some(episode);
        }
    }
    if file.parsed.resolution.is_none() {
        file.parsed.resolution = parse_resolution(&file.file_name());
    }
}

/// Partition files into per-folder entities, in sorted folder-path order.
#[must_use]
pub fn build_entities(files: Vec<MediaFile>) -> Vec<MediaEntity> {
    let mut by_folder: BTreeMap<PathBuf, Vec<MediaFile>> = BTreeMap::new();
    for mut file in files {
        ensure_parsed(&mut file);
        by_folder
            .entry(file.folder().to_path_buf())
            .or_default()
            .push(file);
    }

    by_folder
        .into_iter()
        .map(|(folder, mut folder_files)| {
            folder_files.sort_by(|a, b| a.path.cmp(&b.path));
            MediaEntity::new(folder, folder_files)
        })
        .collect()
}

/// Pairwise similarity between two entities, in [0, 100].
///
/// Signals and weights:
///
/// * folder-name partial similarity — 0.45
/// * fingerprint token-set similarity — 0.25
/// * episode-structure Jaccard overlap — 0.15 (neutral 0.5 when both are
///   movie-like; a series/movie mismatch or zero key overlap vetoes the
///   pair to 0)
/// * duration consistency — 0.15 (neutral 0.5 with no comparable pairs;
///   any cross-pair relative difference above 10% vetoes the pair to 0)
///
/// Symmetric: `similarity_score(a, b) == similarity_score(b, a)`.
#[must_use]
pub fn similarity_score(a: &MediaEntity, b: &MediaEntity) -> f64 {
    // A series and a movie entity are never the same content.
    if a.episodes.is_empty() != b.episodes.is_empty() {
        return 0.0;
    }

    let folder_score = partial_ratio(&a.standardized_name, &b.standardized_name) / 100.0;

    let titles_a = join_fingerprints(&a.fingerprints);
    let titles_b = join_fingerprints(&b.fingerprints);
    let title_score = token_set_ratio(&titles_a, &titles_b) / 100.0;

    let keys_a: HashSet<EpisodeKey> = a.episodes.keys().copied().collect();
    let keys_b: HashSet<EpisodeKey> = b.episodes.keys().copied().collect();

    let structure_score = if keys_a.is_empty() && keys_b.is_empty() {
        0.5
    } else {
        let intersection = keys_a.intersection(&keys_b).count();
        if intersection == 0 {
            // Two series with disjoint episodes are different content.
            return 0.0;
        }
        let union = keys_a.union(&keys_b).count();
        intersection as f64 / union as f64
    };

    let mut duration_scores = Vec::new();
    for key in keys_a.intersection(&keys_b) {
        for fa in &a.episodes[key] {
            for fb in &b.episodes[key] {
                let (Some(ma), Some(mb)) = (&fa.metadata, &fb.metadata) else {
                    continue;
                };
                if ma.duration > 1.0 && mb.duration > 1.0 {
                    let diff =
                        (ma.duration - mb.duration).abs() / ma.duration.max(mb.duration);
                    if diff > DURATION_VETO {
                        // One contradicting duration invalidates the pair.
                        return 0.0;
                    }
                    duration_scores.push((1.0 - diff / DURATION_FALLOFF).max(0.0));
                }
            }
        }
    }
    let duration_score = if duration_scores.is_empty() {
        0.5
    } else {
        duration_scores.iter().sum::<f64>() / duration_scores.len() as f64
    };

    (folder_score * 0.45 + title_score * 0.25 + structure_score * 0.15 + duration_score * 0.15)
        * 100.0
}

fn join_fingerprints(fingerprints: &BTreeSet<String>) -> String {
    fingerprints
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Iteratively merge entities scoring at or above the threshold.
///
/// Passes repeat until a full pass produces no merge. Pairs are scanned in
/// stable order (`i < j`); the earlier entity absorbs the later one.
pub fn merge_entities(entities: &mut Vec<MediaEntity>) {
    let mut merged_in_pass = true;
    let mut passes = 0usize;

    while merged_in_pass {
        merged_in_pass = false;
        passes += 1;

        let mut i = 0;
        while i < entities.len() {
            let mut j = i + 1;
            while j < entities.len() {
                let score = similarity_score(&entities[i], &entities[j]);
                if score >= SIMILARITY_THRESHOLD {
                    log::debug!(
                        "merging '{}' into '{}' (score {:.1})",
                        entities[j].standardized_name,
                        entities[i].standardized_name,
                        score
                    );
                    let absorbed = entities.remove(j);
                    entities[i].merge(absorbed);
                    merged_in_pass = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    log::debug!(
        "entity merge reached fixpoint after {} pass(es), {} entit(ies) remain",
        passes,
        entities.len()
    );
}

/// Assemble duplicate groups from merged entities.
///
/// Series entities yield one group per episode key with more than one
/// file, keyed by the entity's canonical title; movie entities yield one
/// group when they hold more than one file. Entities producing no group
/// are dropped.
#[must_use]
pub fn assemble_groups(entities: Vec<MediaEntity>) -> DuplicateReport {
    let mut report = DuplicateReport::default();

    for entity in entities {
        if !entity.has_duplicates() {
            continue;
        }

        let title = entity.canonical_title();

        if entity.episodes.is_empty() {
            let mut files = entity.loose_files;
            files.sort_by(|a, b| a.path.cmp(&b.path));
            report
                .movies
                .push(DuplicateGroup::new(title.clone(), title, files));
        } else {
            let mut episodes: Vec<(EpisodeKey, Vec<MediaFile>)> =
                entity.episodes.into_iter().collect();
            episodes.sort_by_key(|(key, _)| *key);

            let groups: Vec<DuplicateGroup> = episodes
                .into_iter()
                .filter(|(_, files)| files.len() > 1)
                .map(|(key, files)| {
                    DuplicateGroup::new(key.group_id(), key.display_title(), files)
                })
                .collect();

            if !groups.is_empty() {
                report.series.entry(title).or_default().extend(groups);
            }
        }
    }

    report
}

/// Run the full matching pipeline over a working set of files.
#[must_use]
pub fn find_duplicates(files: Vec<MediaFile>) -> DuplicateReport {
    let mut entities = build_entities(files);
    log::info!("built {} folder entit(ies)", entities.len());
    merge_entities(&mut entities);
    assemble_groups(entities)
}
