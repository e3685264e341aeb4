//! Fuzzy string ratios used by the entity matcher.
//!
//! Built on `strsim`'s normalized Levenshtein similarity, these mirror the
//! classic fuzzy-matching ratios: [`ratio`] for whole-string similarity,
//! [`partial_ratio`] for best-substring similarity, and [`token_set_ratio`]
//! for order- and duplication-insensitive token comparison. All return a
//! score in [0, 100].

use std::collections::BTreeSet;

/// Whole-string similarity in [0, 100].
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best similarity between the shorter string and any equal-length
/// substring of the longer one, in [0, 100].
///
/// This is what makes "moviex" score highly against "moviex 2020 bluray":
/// the shorter name is compared against its best-aligned window.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    let long_chars: Vec<char> = long.chars().collect();

    let mut best = 0.0f64;
    for start in 0..=(long_chars.len() - short_len) {
        let window: String = long_chars[start..start + short_len].iter().collect();
        let score = ratio(short, &window);
        if score > best {
            best = score;
        }
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Set-based token similarity in [0, 100].
///
/// Both inputs are tokenized on whitespace and deduplicated. The score is
/// the best whole-string ratio among the sorted intersection and the two
/// intersection-plus-remainder combinations, which makes the measure
/// insensitive to token order and to tokens shared by both sides.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 100.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let base = intersection.join(" ");
    let combined_a = join_parts(&base, &only_a);
    let combined_b = join_parts(&base, &only_b);

    ratio(&base, &combined_a)
        .max(ratio(&base, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

/// Join the shared-token prefix with a side's remaining tokens.
fn join_parts(base: &str, rest: &[&str]) -> String {
    if rest.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return rest.join(" ");
    }
    format!("{} {}", base, rest.join(" "))
}
