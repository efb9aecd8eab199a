//! Comparison reports.
//!
//! A [`Report`] is built once per run from the coordinator's per-language
//! outcomes and rendered as JSON, as an xlsx workbook or as a console table.
//! Every figure is derived from the alignment pairs on demand.

mod json;
mod table;
mod xlsx;

pub use json::{to_json, write_json, MismatchRow};
pub use table::render_table;
pub use xlsx::write_workbook;

use crate::alignment::{ComparisonMode, ComparisonResult, LanguageOutcome, WordErrors};
use crate::source::{sanitize_id, MediaMetadata};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Quality band for a single pair or a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rating {
    Perfect,
    Good,
    Fair,
    Poor,
}

impl Rating {
    /// Rate a percentage score.
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 95.0 {
            Rating::Perfect
        } else if percent >= 90.0 {
            Rating::Good
        } else if percent >= 80.0 {
            Rating::Fair
        } else {
            Rating::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Perfect => "PERFECT",
            Rating::Good => "GOOD",
            Rating::Fair => "FAIR",
            Rating::Poor => "POOR",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing what was compared.
#[derive(Debug, Clone, Serialize)]
pub struct VideoInfo {
    /// URL or path the media came from.
    pub source: String,
    pub title: String,
    pub duration_seconds: Option<f64>,
    /// Language of the transcription (detected or requested).
    pub language: Option<String>,
    pub format: Option<String>,
    pub mode: ComparisonMode,
    pub generated_at: DateTime<Utc>,
    pub run_id: Uuid,
}

impl VideoInfo {
    pub fn new(source: impl Into<String>, title: impl Into<String>, mode: ComparisonMode) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            duration_seconds: None,
            language: None,
            format: None,
            mode,
            generated_at: Utc::now(),
            run_id: Uuid::new_v4(),
        }
    }

    /// Build from resolved media metadata.
    pub fn from_metadata(metadata: &MediaMetadata, mode: ComparisonMode) -> Self {
        Self {
            duration_seconds: metadata.duration_seconds,
            language: metadata.language.clone(),
            format: metadata.format.clone(),
            ..Self::new(metadata.source_url.clone(), metadata.title.clone(), mode)
        }
    }
}

/// Figures for one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageSummary {
    pub language: String,
    pub status: &'static str,
    pub total_segments: usize,
    pub matches: usize,
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
    pub mismatches: usize,
    pub accuracy: Option<f64>,
    pub rating: Option<Rating>,
    pub word_errors: WordErrors,
    pub word_error_rate: Option<f64>,
    /// Mean hypothesis-minus-reference start offset over paired segments.
    pub average_offset: Option<f64>,
}

impl LanguageSummary {
    fn new(language: &str, outcome: &LanguageOutcome) -> Self {
        let mut summary = Self {
            language: language.to_string(),
            status: outcome.status(),
            total_segments: 0,
            matches: 0,
            substitutions: 0,
            deletions: 0,
            insertions: 0,
            mismatches: 0,
            accuracy: None,
            rating: None,
            word_errors: WordErrors::default(),
            word_error_rate: None,
            average_offset: None,
        };

        if let Some(result) = outcome.result() {
            let accuracy = result.accuracy();
            let word_errors = result.word_errors();
            summary.total_segments = result.total_segments();
            summary.matches = result.matches();
            summary.substitutions = result.substitutions();
            summary.deletions = result.deletions();
            summary.insertions = result.insertions();
            summary.mismatches = result.mismatch_count();
            summary.accuracy = Some(accuracy);
            summary.rating = Some(Rating::from_percent(accuracy));
            summary.word_errors = word_errors;
            summary.word_error_rate = word_errors.word_error_rate();
            summary.average_offset = average_offset(result);
        }

        summary
    }
}

fn average_offset(result: &ComparisonResult) -> Option<f64> {
    let offsets: Vec<f64> = result.pairs.iter().filter_map(|p| p.offset()).collect();
    (!offsets.is_empty()).then(|| offsets.iter().sum::<f64>() / offsets.len() as f64)
}

/// Cross-language totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_segments: usize,
    pub mismatches: usize,
    /// Accuracy over all compared languages, weighted by segment count.
    pub accuracy: Option<f64>,
    pub languages_found: Vec<String>,
    pub languages_missing: Vec<String>,
    pub per_language: Vec<LanguageSummary>,
}

/// The result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub video_info: VideoInfo,
    pub outcomes: BTreeMap<String, LanguageOutcome>,
}

impl Report {
    pub fn new(video_info: VideoInfo, outcomes: BTreeMap<String, LanguageOutcome>) -> Self {
        Self {
            video_info,
            outcomes,
        }
    }

    /// Compared results, in language order.
    pub fn results(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.outcomes.values().filter_map(|o| o.result())
    }

    pub fn summary(&self) -> Summary {
        let per_language: Vec<LanguageSummary> = self
            .outcomes
            .iter()
            .map(|(language, outcome)| LanguageSummary::new(language, outcome))
            .collect();

        let (languages_found, languages_missing): (Vec<_>, Vec<_>) = self
            .outcomes
            .iter()
            .partition(|(_, outcome)| outcome.result().is_some());

        let total_segments: usize = self.results().map(|r| r.total_segments()).sum();
        let matches: usize = self.results().map(|r| r.matches()).sum();

        let accuracy = if languages_found.is_empty() {
            None
        } else if total_segments == 0 {
            Some(100.0)
        } else {
            Some(matches as f64 * 100.0 / total_segments as f64)
        };

        Summary {
            total_segments,
            mismatches: self.results().map(|r| r.mismatch_count()).sum(),
            accuracy,
            languages_found: languages_found.into_iter().map(|(l, _)| l.clone()).collect(),
            languages_missing: languages_missing.into_iter().map(|(l, _)| l.clone()).collect(),
            per_language,
        }
    }

    /// File name stem shared by the JSON and xlsx outputs.
    pub fn file_stem(&self) -> String {
        let name = Path::new(&self.video_info.source)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("media");
        format!(
            "capcheck_{}_{}",
            sanitize_id(name),
            self.video_info.generated_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Paths of the JSON and xlsx reports inside a directory.
    pub fn output_paths(&self, dir: &Path) -> (PathBuf, PathBuf) {
        let stem = self.file_stem();
        (dir.join(format!("{}.json", stem)), dir.join(format!("{}.xlsx", stem)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alignment::{Aligner, AlignerConfig, Segment, TranscriptSet};

    fn set(language: &str, items: &[(f64, f64, &str)]) -> TranscriptSet {
        TranscriptSet::new(
            language,
            items.iter().map(|(s, e, t)| Segment::new(*s, *e, language, *t)).collect(),
        )
        .unwrap()
    }

    /// Two compared languages plus one without captions.
    pub(crate) fn sample_report() -> Report {
        let aligner = Aligner::new(AlignerConfig::default()).unwrap();

        let en = aligner.align(
            &set(
                "en",
                &[
                    (0.0, 2.0, "Press the power button"),
                    (3.0, 5.0, "Wait for the light"),
                    (6.0, 8.0, "Open the cover"),
                    (9.0, 11.0, "Remove the battery"),
                ],
            ),
            &set(
                "en",
                &[
                    (0.1, 2.0, "Press the power button"),
                    (3.1, 5.0, "Wait for the light"),
                    (6.2, 8.0, "Open the lid"),
                    (20.0, 21.0, "Thanks for watching"),
                ],
            ),
        );
        let es = aligner.align(
            &set("es", &[(0.0, 2.0, "Pulse el botón")]),
            &set("es", &[(0.5, 2.0, "Pulse el botón")]),
        );

        let mut outcomes = BTreeMap::new();
        outcomes.insert("en".to_string(), LanguageOutcome::Compared(en));
        outcomes.insert("es".to_string(), LanguageOutcome::Compared(es));
        outcomes.insert("fr".to_string(), LanguageOutcome::NoCaptions);

        let mut info = VideoInfo::new(
            "https://example.com/videos/setup-guide.mp4",
            "Setup guide",
            ComparisonMode::CaptionsVsTranscription,
        );
        info.duration_seconds = Some(21.0);
        info.language = Some("en".to_string());
        Report::new(info, outcomes)
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(Rating::from_percent(100.0), Rating::Perfect);
        assert_eq!(Rating::from_percent(95.0), Rating::Perfect);
        assert_eq!(Rating::from_percent(92.0), Rating::Good);
        assert_eq!(Rating::from_percent(80.0), Rating::Fair);
        assert_eq!(Rating::from_percent(79.9), Rating::Poor);
    }

    #[test]
    fn test_summary_weighted_accuracy() {
        let summary = sample_report().summary();

        // en: 2 of 4 matched (one substitution, one deletion), es: 1 of 1.
        assert_eq!(summary.total_segments, 5);
        assert_eq!(summary.accuracy, Some(60.0));
        assert_eq!(summary.languages_found, vec!["en", "es"]);
        assert_eq!(summary.languages_missing, vec!["fr"]);
        assert_eq!(summary.mismatches, 3);

        let en = &summary.per_language[0];
        assert_eq!(en.matches, 2);
        assert_eq!(en.insertions, 1);
        assert_eq!(en.accuracy, Some(50.0));
        assert_eq!(en.rating, Some(Rating::Poor));

        let fr = &summary.per_language[2];
        assert_eq!(fr.status, "no captions available");
        assert_eq!(fr.accuracy, None);
    }

    #[test]
    fn test_summary_without_comparisons() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("de".to_string(), LanguageOutcome::NoCaptions);
        let report = Report::new(
            VideoInfo::new("clip.mp4", "clip", ComparisonMode::TranscriptionOnly),
            outcomes,
        );

        let summary = report.summary();
        assert_eq!(summary.accuracy, None);
        assert_eq!(summary.total_segments, 0);
    }

    #[test]
    fn test_average_offset() {
        let summary = sample_report().summary();
        let es = &summary.per_language[1];
        assert_eq!(es.average_offset, Some(0.5));
    }

    #[test]
    fn test_output_paths() {
        let report = sample_report();
        let (json, xlsx) = report.output_paths(Path::new("/reports"));

        let name = json.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("capcheck_setup-guide_"));
        assert!(name.ends_with(".json"));
        assert_eq!(xlsx.with_extension("json"), json);
    }
}
