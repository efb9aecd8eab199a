//! Console summary table.

use super::{Rating, Report};
use crate::alignment::{AlignmentPair, ErrorKind};
use crate::source::MediaMetadata;
use console::style;
use std::fmt::Write;

fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() <= max_chars {
        text
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

fn styled_rating(rating: Rating) -> String {
    let label = format!("{:<7}", rating.as_str());
    match rating {
        Rating::Perfect => style(label).green().to_string(),
        Rating::Good => style(label).yellow().to_string(),
        Rating::Fair => style(label).magenta().to_string(),
        Rating::Poor => style(label).red().to_string(),
    }
}

fn styled_kind(kind: ErrorKind) -> String {
    let label = format!("{:<12}", kind.as_str());
    match kind {
        ErrorKind::Match => style(label).green().to_string(),
        ErrorKind::Substitution => style(label).yellow().to_string(),
        ErrorKind::Deletion | ErrorKind::Insertion => style(label).red().to_string(),
    }
}

/// Lowest similarity first; ties in timeline order.
fn worst_mismatches<'a>(pairs: impl Iterator<Item = &'a AlignmentPair>, limit: usize) -> Vec<&'a AlignmentPair> {
    let mut worst: Vec<&AlignmentPair> = pairs.collect();
    worst.sort_by(|a, b| {
        a.similarity
            .total_cmp(&b.similarity)
            .then(a.timestamp.total_cmp(&b.timestamp))
    });
    worst.truncate(limit);
    worst
}

/// Render the per-language summary and each language's worst mismatches.
pub fn render_table(report: &Report, max_mismatches: usize) -> String {
    let summary = report.summary();
    let info = &report.video_info;
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", style(format!("Caption check: {}", info.title)).bold().underlined());
    let _ = writeln!(out, "  {} {}", style("Mode:").dim(), info.mode);
    if let Some(language) = &info.language {
        let _ = writeln!(out, "  {} {}", style("Transcription language:").dim(), language);
    }
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "  {:<10} {:>8} {:>7} {:>6} {:>6} {:>6} {:>10}  {:<7}",
        "Language", "Segments", "Match", "Sub", "Del", "Ins", "Accuracy", "Rating"
    );
    let _ = writeln!(out, "  {}", "-".repeat(70));

    for language in &summary.per_language {
        match (language.accuracy, language.rating) {
            (Some(accuracy), Some(rating)) => {
                let _ = writeln!(
                    out,
                    "  {:<10} {:>8} {:>7} {:>6} {:>6} {:>6} {:>9.1}%  {}",
                    language.language,
                    language.total_segments,
                    language.matches,
                    language.substitutions,
                    language.deletions,
                    language.insertions,
                    accuracy,
                    styled_rating(rating)
                );
            }
            _ => {
                let _ = writeln!(
                    out,
                    "  {:<10} {}",
                    language.language,
                    style(language.status).dim()
                );
            }
        }
    }

    let _ = writeln!(out, "  {}", "-".repeat(70));
    match summary.accuracy {
        Some(accuracy) => {
            let _ = writeln!(
                out,
                "  {:<10} {:>8} {:>36.1}%  {}",
                "Overall",
                summary.total_segments,
                accuracy,
                styled_rating(Rating::from_percent(accuracy))
            );
        }
        None => {
            let _ = writeln!(out, "  {}", style("No language had captions to compare against.").yellow());
        }
    }

    if max_mismatches == 0 {
        return out;
    }

    for result in report.results() {
        let worst = worst_mismatches(result.mismatches(), max_mismatches);
        if worst.is_empty() {
            continue;
        }

        let _ = writeln!(
            out,
            "\n  {} ({} of {})",
            style(format!("Worst mismatches: {}", result.language)).bold(),
            worst.len(),
            result.mismatch_count()
        );
        for pair in worst {
            let offset = pair
                .offset()
                .map(|o| format!("{:+.2}s", o))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {:>8} {} {:>5.1}%  offset {}",
                MediaMetadata::format_timestamp(pair.timestamp),
                styled_kind(pair.kind),
                pair.similarity * 100.0,
                offset
            );
            if !pair.original().is_empty() {
                let _ = writeln!(out, "      {} {}", style("caption:").dim(), truncate(pair.original(), 80));
            }
            if !pair.transcription().is_empty() {
                let _ = writeln!(
                    out,
                    "      {} {}",
                    style("heard:  ").dim(),
                    style(truncate(pair.transcription(), 80)).red()
                );
            }
        }
    }

    out
}
