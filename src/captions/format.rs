//! Writing transcript sets back out as SRT, WebVTT or JSON.

use crate::alignment::TranscriptSet;
use serde::Serialize;
use std::fmt::Write;

/// Caption file formats that can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    Json,
    Srt,
    Vtt,
}

impl CaptionFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CaptionFormat::Json => "json",
            CaptionFormat::Srt => "srt",
            CaptionFormat::Vtt => "vtt",
        }
    }
}

impl std::str::FromStr for CaptionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(CaptionFormat::Json),
            "srt" => Ok(CaptionFormat::Srt),
            "vtt" | "webvtt" => Ok(CaptionFormat::Vtt),
            _ => Err(format!("Unknown format: {}. Use json, srt, or vtt.", s)),
        }
    }
}

/// JSON shape of an exported caption track.
#[derive(Debug, Serialize)]
pub struct CaptionExport {
    pub language: String,
    pub duration_seconds: f64,
    pub cues: Vec<CueExport>,
}

#[derive(Debug, Serialize)]
pub struct CueExport {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl From<&TranscriptSet> for CaptionExport {
    fn from(set: &TranscriptSet) -> Self {
        Self {
            language: set.language().to_string(),
            duration_seconds: set.duration(),
            cues: set
                .segments()
                .iter()
                .map(|s| CueExport {
                    start: s.start,
                    end: s.end,
                    text: s.text.clone(),
                })
                .collect(),
        }
    }
}

/// Render a transcript set in the given format.
pub fn format_captions(set: &TranscriptSet, format: CaptionFormat) -> String {
    match format {
        CaptionFormat::Json => serde_json::to_string_pretty(&CaptionExport::from(set))
            .unwrap_or_else(|_| "{}".to_string()),
        CaptionFormat::Srt => write_cues(set, String::new(), ','),
        CaptionFormat::Vtt => write_cues(set, String::from("WEBVTT\n\n"), '.'),
    }
}

/// Numbered cues; SRT and WebVTT differ only in the header and the millisecond separator.
fn write_cues(set: &TranscriptSet, mut output: String, separator: char) -> String {
    for (i, segment) in set.segments().iter().enumerate() {
        let _ = write!(
            output,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            cue_timestamp(segment.start, separator),
            cue_timestamp(segment.end, separator),
            segment.text
        );
    }
    output
}

/// `hh:mm:ss<sep>mmm`, rounded to the nearest millisecond.
fn cue_timestamp(seconds: f64, separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, ms)
}
