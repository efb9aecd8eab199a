//! Timestamped text segments and validated transcript sets.

use crate::error::{CapcheckError, Result};
use serde::{Deserialize, Serialize};

/// A span of text with start and end timestamps in seconds.
///
/// Produced by both caption extraction and transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Language tag of the source (e.g. "en", "en-US").
    pub language: String,
    /// Original text payload.
    pub text: String,
}

impl Segment {
    /// Create a new segment.
    pub fn new(start: f64, end: f64, language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            language: language.into(),
            text: text.into(),
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether this segment's range overlaps `[start, end]` widened by `tolerance` on both sides.
    pub fn overlaps(&self, start: f64, end: f64, tolerance: f64) -> bool {
        self.start <= end + tolerance && self.end >= start - tolerance
    }
}

/// An ordered sequence of segments for one language.
///
/// Construction rejects segments with `end < start`, negative or non-finite
/// times, and start times that decrease.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSet {
    language: String,
    segments: Vec<Segment>,
}

impl TranscriptSet {
    /// Validate and build a transcript set.
    pub fn new(language: impl Into<String>, segments: Vec<Segment>) -> Result<Self> {
        let language = language.into();

        let mut previous_start = f64::NEG_INFINITY;
        for (index, segment) in segments.iter().enumerate() {
            let malformed = |reason: String| CapcheckError::MalformedSegment {
                language: language.clone(),
                index,
                reason,
            };

            if !segment.start.is_finite() || !segment.end.is_finite() {
                return Err(malformed("timestamps must be finite".to_string()));
            }
            if segment.start < 0.0 {
                return Err(malformed(format!("negative start time {:.3}s", segment.start)));
            }
            if segment.end < segment.start {
                return Err(malformed(format!(
                    "end {:.3}s is before start {:.3}s",
                    segment.end, segment.start
                )));
            }
            if segment.start < previous_start {
                return Err(malformed(format!(
                    "start {:.3}s is earlier than the previous segment's start {:.3}s",
                    segment.start, previous_start
                )));
            }
            previous_start = segment.start;
        }

        Ok(Self { language, segments })
    }

    /// Build a transcript set after sorting segments by start time.
    ///
    /// Upstream sources are usually ordered already; this is for cue lists
    /// assembled from several files.
    pub fn from_unsorted(language: impl Into<String>, mut segments: Vec<Segment>) -> Result<Self> {
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self::new(language, segments)
    }

    /// An empty set for the given language.
    pub fn empty(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            segments: Vec::new(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End of the last segment, or 0 for an empty set.
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.end).fold(0.0, f64::max)
    }

    /// Full text (segments joined by spaces).
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Relabel the set with a different language tag.
    pub fn with_language(self, language: impl Into<String>) -> Self {
        let language = language.into();
        let segments = self
            .segments
            .into_iter()
            .map(|mut s| {
                s.language = language.clone();
                s
            })
            .collect();
        Self { language, segments }
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}
