//! JSON report output.

use super::{Report, Summary, VideoInfo};
use crate::alignment::{ErrorKind, LanguageOutcome};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One non-matching pair, flattened for the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchRow {
    pub language: String,
    pub timestamp: f64,
    pub original: String,
    pub transcription: String,
    pub similarity: f64,
    pub error_type: ErrorKind,
}

impl MismatchRow {
    /// All mismatches of a report, in language then timeline order.
    pub fn collect(report: &Report) -> Vec<MismatchRow> {
        report
            .results()
            .flat_map(|result| {
                result.mismatches().map(move |pair| MismatchRow {
                    language: result.language.clone(),
                    timestamp: pair.timestamp,
                    original: pair.original().to_string(),
                    transcription: pair.transcription().to_string(),
                    similarity: pair.similarity,
                    error_type: pair.kind,
                })
            })
            .collect()
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    video_info: &'a VideoInfo,
    mismatches: Vec<MismatchRow>,
    summary: Summary,
    /// Full alignment per language.
    languages: &'a BTreeMap<String, LanguageOutcome>,
}

/// Render a report as pretty-printed JSON.
pub fn to_json(report: &Report) -> Result<String> {
    let document = JsonReport {
        video_info: &report.video_info,
        mismatches: MismatchRow::collect(report),
        summary: report.summary(),
        languages: &report.outcomes,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Write the JSON report to a file.
pub fn write_json(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_json(report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    #[test]
    fn test_document_shape() {
        let report = sample_report();
        let value: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();

        assert_eq!(value["video_info"]["title"], "Setup guide");
        assert_eq!(value["video_info"]["mode"], "captions_vs_transcription");
        assert_eq!(value["summary"]["total_segments"], 5);
        assert_eq!(value["summary"]["accuracy"], 60.0);
        assert_eq!(value["summary"]["languages_found"], serde_json::json!(["en", "es"]));
        assert_eq!(value["languages"]["fr"]["status"], "no_captions");
        assert_eq!(value["languages"]["es"]["status"], "compared");

        let mismatches = value["mismatches"].as_array().unwrap();
        assert_eq!(mismatches.len(), 3);
        assert_eq!(mismatches[0]["error_type"], "substitution");
        assert_eq!(mismatches[0]["original"], "Open the cover");
        assert_eq!(mismatches[1]["error_type"], "deletion");
        assert_eq!(mismatches[1]["transcription"], "");
        assert_eq!(mismatches[2]["error_type"], "insertion");
        assert_eq!(mismatches[2]["timestamp"], 20.0);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");

        write_json(&sample_report(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"mismatches\""));
    }
}
