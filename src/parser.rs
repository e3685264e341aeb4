//! Filename parsing for season/episode extraction and text standardization.
//!
//! # Overview
//!
//! [`parse_episode`] applies an ordered list of pattern rules to a filename
//! and returns the first successful (season, episode) match. The rules are
//! tried most-specific first:
//!
//! 1. `S01E02` style markers (separator-delimited)
//! 2. `1x02` style markers
//! 3. multi-segment `S01E01E02` runs, taking the final episode marker
//! 4. an isolated bare number, as a last resort, with the season taken
//!    from a separate "Season N" marker elsewhere in the name (default 1)
//!
//! Episode numbers may carry a `.5` fraction for half-episodes; decimal
//! commas are normalized to dots before conversion. A pattern whose
//! captures fail numeric conversion is skipped, never fatal.
//!
//! [`standardize`] produces the normalized fingerprint used everywhere an
//! identity comparison happens (entity matching, ignore-list keys). It is
//! idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Which capture layout an episode pattern uses.
enum PatternKind {
    /// Group 1 = season, group 2 = episode.
    SeasonEpisode,
    /// Group 1 = episode; season comes from a separate season-only marker.
    EpisodeOnly,
}

/// Ordered episode patterns, most specific first.
static EPISODE_PATTERNS: Lazy<Vec<(Regex, PatternKind)>> = Lazy::new(|| {
    vec![
        // S01E02, S01.E02, S01-E02
        (
            Regex::new(r"[._\s-][Ss]([0-9]{1,2})[._\s-]?[Ee]([0-9]{1,3}(?:[.,]5)?)[._\s-]?")
                .expect("valid regex"),
            PatternKind::SeasonEpisode,
        ),
        // 1x02, 01x02
        (
            Regex::new(r"[._\s-]([0-9]{1,2})[xX]([0-9]{1,3}(?:[.,]5)?)[._\s-]?")
                .expect("valid regex"),
            PatternKind::SeasonEpisode,
        ),
        // S01E01E02 / S01E01-S01E02 runs; the last E marker wins
        (
            Regex::new(
                r"[._\s-][Ss]([0-9]{1,2})(?:[._\s-]?[EeSs][0-9]{1,2})*[._\s-]?[Ee]([0-9]{1,3}(?:[.,]5)?)",
            )
            .expect("valid regex"),
            PatternKind::SeasonEpisode,
        ),
        // Isolated bare number bounded by separators or the extension
        (
            Regex::new(r"(?:^|[\s_.-])([0-9]{1,3}(?:[.,]5)?)(?:\.\w+$|[\s_.-])")
                .expect("valid regex"),
            PatternKind::EpisodeOnly,
        ),
    ]
});

/// Season-only marker ("Season 1", "S01") used by the bare-number rule.
static SEASON_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[._\s-][Ss](eason)?[._\s-]?([0-9]{1,2})[._\s-]?").expect("valid regex")
});

/// Bracketed or parenthesized annotations, stripped by [`standardize`].
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[(\[][^)\]]*[)\]]").expect("valid regex"));

/// Season keyword variants canonicalized to "s".
static SEASON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"season|temporada").expect("valid regex"));

/// Episode keyword variants canonicalized to "e".
static EPISODE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"episode|episodio").expect("valid regex"));

/// Separator punctuation replaced by spaces.
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._\-]").expect("valid regex"));

/// Whitespace runs collapsed to single spaces.
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Resolution tokens recognized in filenames, best first.
static RESOLUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(2160p|4k|uhd|1080p|720p|576p|480p)").expect("valid regex"));

/// Parse a season/episode pair from a filename.
///
/// Returns `None` when no pattern matches. Patterns are tried in strict
/// precedence order and the first successful numeric conversion wins.
///
/// # Examples
///
/// ```
/// use mediadupe::parser::parse_episode;
///
/// assert_eq!(parse_episode("Show.S01E02.1080p.mkv"), Some((1, 2.0)));
/// assert_eq!(parse_episode("Show - 1x02.mkv"), Some((1, 2.0)));
/// assert_eq!(parse_episode("Show.S01E05.5.mkv"), Some((1, 5.5)));
/// assert_eq!(parse_episode("MovieX.2020.mkv"), None);
/// ```
#[must_use]
pub fn parse_episode(filename: &str) -> Option<(u32, f32)> {
    for (pattern, kind) in EPISODE_PATTERNS.iter() {
        let Some(caps) = pattern.captures(filename) else {
            continue;
        };

        let parsed = match kind {
            PatternKind::SeasonEpisode => {
                let season = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                let episode = caps.get(2).and_then(|m| parse_episode_number(m.as_str()));
                season.zip(episode)
            }
            PatternKind::EpisodeOnly => {
                // Season defaults to 1 unless a season-only marker exists
                // elsewhere in the filename.
                let season_caps = SEASON_ONLY.captures(filename);
                let season_span = season_caps
                    .as_ref()
                    .and_then(|c| c.get(0))
                    .map(|m| (m.start(), m.end()));
                let season = season_caps
                    .as_ref()
                    .and_then(|c| c.get(2))
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(1);

                // The first isolated number that is not part of the season
                // marker itself is the episode.
                let mut episode = None;
                for candidate in pattern.captures_iter(filename) {
                    let Some(m) = candidate.get(1) else { continue };
                    if let Some((start, end)) = season_span {
                        if m.start() >= start && m.end() <= end {
                            continue;
                        }
                    }
                    episode = parse_episode_number(m.as_str());
                    break;
                }
                episode.map(|e| (season, e))
            }
        };

        // A failed numeric conversion skips to the next pattern.
        if let Some(result) = parsed {
            return Some(result);
        }
    }
    None
}

/// Convert a captured episode number, normalizing decimal commas to dots.
fn parse_episode_number(raw: &str) -> Option<f32> {
    raw.replace(',', ".").parse::<f32>().ok()
}

/// Standardize a name for fuzzy identity comparison.
///
/// Lower-cases, strips bracketed annotations, canonicalizes season/episode
/// keywords (including Spanish variants), replaces separator punctuation
/// with spaces, and collapses whitespace. Idempotent: applying it twice
/// yields the same string.
///
/// # Examples
///
/// ```
/// use mediadupe::parser::standardize;
///
/// assert_eq!(standardize("The.Show_(2020)-Season 1"), "the show s 1");
/// assert_eq!(standardize("MovieX [BluRay] 1080p"), "moviex 1080p");
/// ```
#[must_use]
pub fn standardize(text: &str) -> String {
    // A single substitution pass can splice a new keyword together
    // (e.g. stripping the middle of "sea[x]son"), so iterate until the
    // output is stable. Every substitution is length-non-increasing,
    // which bounds the loop.
    let mut current = standardize_once(text);
    loop {
        let next = standardize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn standardize_once(text: &str) -> String {
    let clean = text.to_lowercase();
    let clean = BRACKETED.replace_all(&clean, "");
    let clean = SEASON_WORD.replace_all(&clean, "s");
    let clean = EPISODE_WORD.replace_all(&clean, "e");
    let clean = SEPARATORS.replace_all(&clean, " ");
    let clean = WHITESPACE.replace_all(&clean, " ");
    clean.trim().to_string()
}

/// Extract a resolution token from a filename, lowercased.
///
/// Used as the quality fallback when a file was never probed.
#[must_use]
pub fn parse_resolution(filename: &str) -> Option<String> {
    RESOLUTION
        .captures(filename)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_se_pattern() {
        assert_eq!(parse_episode("Show.S01E02.mkv"), Some((1, 2.0)));
        assert_eq!(parse_episode("Show S1E2.mkv"), Some((1, 2.0)));
        assert_eq!(parse_episode("Show-s01e02-x264.mkv"), Some((1, 2.0)));
        assert_eq!(parse_episode("Show.S12E113.mkv"), Some((12, 113.0)));
    }

    #[test]
    fn test_nxnn_pattern() {
        assert_eq!(parse_episode("Show - 1x02.mkv"), Some((1, 2.0)));
        assert_eq!(parse_episode("Show.01x02.mkv"), Some((1, 2.0)));
        assert_eq!(parse_episode("Show 10X13.mkv"), Some((10, 13.0)));
    }

    #[test]
    fn test_multi_segment_pattern() {
        // Intermediate S/E segments are skipped; the final episode marker
        // provides the episode number.
        assert_eq!(parse_episode("Show.S01S02E05.mkv"), Some((1, 5.0)));
        // A directly adjacent SE pair is still handled by the first rule.
        assert_eq!(parse_episode("Show.S02E01E02.mkv"), Some((2, 1.0)));
    }

    #[test]
    fn test_half_episode() {
        assert_eq!(parse_episode("Show.S01E05.5.mkv"), Some((1, 5.5)));
        assert_eq!(parse_episode("Show.S01E05,5.mkv"), Some((1, 5.5)));
    }

    #[test]
    fn test_isolated_number_defaults_to_season_one() {
        assert_eq!(parse_episode("Show - 02.mkv"), Some((1, 2.0)));
    }

    #[test]
    fn test_isolated_number_with_season_marker() {
        assert_eq!(parse_episode("Show Season 3 - 02.mkv"), Some((3, 2.0)));
        assert_eq!(parse_episode("Show Season 1 - 02.mkv"), Some((1, 2.0)));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(parse_episode("MovieX.mkv"), None);
        assert_eq!(parse_episode("readme"), None);
    }

    #[test]
    fn test_precedence_se_over_isolated() {
        // The SE rule must win even though "1080" would match the
        // isolated-number rule.
        assert_eq!(parse_episode("Show.S02E03.1080p.mkv"), Some((2, 3.0)));
    }

    #[test]
    fn test_standardize_basic() {
        assert_eq!(standardize("The.Show-2_final"), "the show 2 final");
        assert_eq!(standardize("  Spaced   Out  "), "spaced out");
    }

    #[test]
    fn test_standardize_strips_brackets() {
        assert_eq!(standardize("Show [1080p] (x265)"), "show");
        assert_eq!(standardize("Show (2020) Extended"), "show extended");
    }

    #[test]
    fn test_standardize_keywords() {
        assert_eq!(standardize("Show Season 2"), "show s 2");
        assert_eq!(standardize("Show Temporada 2"), "show s 2");
        assert_eq!(standardize("Show Episode 5"), "show e 5");
        assert_eq!(standardize("Show Episodio 5"), "show e 5");
    }

    #[test]
    fn test_standardize_idempotent() {
        for input in [
            "The.Show_(2020)-Season 1",
            "MovieX [BluRay] 1080p",
            "Serie Temporada 2 Episodio 3",
            "",
            "already clean",
        ] {
            let once = standardize(input);
            assert_eq!(standardize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(
            parse_resolution("Show.S01E01.1080p.mkv"),
            Some("1080p".to_string())
        );
        assert_eq!(
            parse_resolution("Movie.4K.HDR.mkv"),
            Some("4k".to_string())
        );
        assert_eq!(
            parse_resolution("Movie.2160p.mkv"),
            Some("2160p".to_string())
        );
        assert_eq!(parse_resolution("Movie.mkv"), None);
    }
}
