//! Rendering of scan results.
//!
//! Text output is a tree of series -> episode groups -> files (and a flat
//! movie section), each file line carrying its recommendation marker and
//! reason. JSON output is the serde form of [`DuplicateReport`] for
//! scripting.

use bytesize::ByteSize;
use yansi::Paint;

use crate::media::{DuplicateGroup, DuplicateReport, MediaFile, Recommendation};

/// Render a report as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(report: &DuplicateReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Render a report as a human-readable tree.
#[must_use]
pub fn render_text(report: &DuplicateReport) -> String {
    let mut out = String::new();

    if report.is_empty() {
        out.push_str("No duplicates found.\n");
        return out;
    }

    if !report.series.is_empty() {
        out.push_str(&format!("{}\n", "Series".bold()));
        for (title, groups) in &report.series {
            out.push_str(&format!("  {}\n", title.underline()));
            for group in groups {
                render_group(&mut out, group, "    ");
            }
        }
    }

    if !report.movies.is_empty() {
        out.push_str(&format!("{}\n", "Movies".bold()));
        for group in &report.movies {
            render_group(&mut out, group, "  ");
        }
    }

    let total_wasted: u64 = report
        .series
        .values()
        .flatten()
        .chain(report.movies.iter())
        .map(DuplicateGroup::wasted_space)
        .sum();
    out.push_str(&format!(
        "\n{} duplicate group(s), {} reclaimable\n",
        report.group_count(),
        ByteSize(total_wasted)
    ));

    out
}

fn render_group(out: &mut String, group: &DuplicateGroup, indent: &str) {
    out.push_str(&format!(
        "{}{} ({} files, {} reclaimable)\n",
        indent,
        group.display_title,
        group.len(),
        ByteSize(group.wasted_space())
    ));
    for file in &group.files {
        render_file(out, file, indent);
    }
}

fn render_file(out: &mut String, file: &MediaFile, indent: &str) {
    let marker = match file.recommendation {
        Recommendation::Suggested => format!("{}", "SUGGESTED".green()),
        Recommendation::Keep => format!("{}", "KEEP".green().bold()),
        Recommendation::Delete => format!("{}", "DELETE".red()),
        Recommendation::Review => format!("{}", "REVIEW".yellow()),
    };
    out.push_str(&format!(
        "{}  [{}] {} ({})",
        indent,
        marker,
        file.path.display(),
        ByteSize(file.size)
    ));
    if !file.reason.is_empty() {
        out.push_str(&format!(" - {}", file.reason.dim()));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_report() -> DuplicateReport {
        let mut winner = MediaFile::new(PathBuf::from("/tv/Show/a.1080p.mkv"), 1_200, 1.0);
        winner.recommendation = Recommendation::Suggested;
        winner.reason = "Best version according to your priority rules.".to_string();
        let mut loser = MediaFile::new(PathBuf::from("/tv/Show/a.720p.mkv"), 700, 1.0);
        loser.recommendation = Recommendation::Review;
        loser.reason = "A better version is available.".to_string();

        let mut report = DuplicateReport::default();
        report.series.insert(
            "Show".to_string(),
            vec![DuplicateGroup::new(
                "1-1".to_string(),
                "S01E01".to_string(),
                vec![winner, loser],
            )],
        );
        report
    }

    #[test]
    fn test_render_empty() {
        let text = render_text(&DuplicateReport::default());
        assert!(text.contains("No duplicates found"));
    }

    #[test]
    fn test_render_text_structure() {
        yansi::disable();
        let text = render_text(&sample_report());
        assert!(text.contains("Series"));
        assert!(text.contains("Show"));
        assert!(text.contains("S01E01"));
        assert!(text.contains("SUGGESTED"));
        assert!(text.contains("REVIEW"));
        assert!(text.contains("a.1080p.mkv"));
        assert!(text.contains("1 duplicate group(s)"));
    }

    #[test]
    fn test_render_json_round_trips() {
        let json = render_json(&sample_report()).unwrap();
        let back: DuplicateReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.group_count(), 1);
        assert_eq!(back.series["Show"][0].id, "1-1");
    }
}
