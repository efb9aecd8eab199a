//! Greedy time-window alignment of a reference transcript against a hypothesis.

use super::normalize::{NormalizeOptions, TextNormalizer};
use super::segment::{Segment, TranscriptSet};
use super::similarity::{similarity, WordErrors};
use crate::error::{CapcheckError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Aligner configuration with documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignerConfig {
    /// Similarity at or above which a pair counts as a match.
    pub threshold: f64,
    /// Similarity below which a candidate is not claimed at all.
    pub threshold_min: f64,
    /// Seconds added on each side of a reference segment when looking for candidates.
    pub time_tolerance_seconds: f64,
    /// Text normalization applied before scoring.
    pub normalize: NormalizeOptions,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            threshold_min: 0.1,
            time_tolerance_seconds: 2.0,
            normalize: NormalizeOptions::default(),
        }
    }
}

impl AlignerConfig {
    /// Check thresholds and tolerance before any alignment runs.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("threshold", self.threshold), ("threshold_min", self.threshold_min)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CapcheckError::ThresholdConfiguration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.threshold_min > self.threshold {
            return Err(CapcheckError::ThresholdConfiguration(format!(
                "threshold_min ({}) must not exceed threshold ({})",
                self.threshold_min, self.threshold
            )));
        }
        if !self.time_tolerance_seconds.is_finite() || self.time_tolerance_seconds < 0.0 {
            return Err(CapcheckError::ThresholdConfiguration(format!(
                "time tolerance must be a non-negative number of seconds, got {}",
                self.time_tolerance_seconds
            )));
        }
        Ok(())
    }
}

/// Outcome class of one alignment pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Match,
    Substitution,
    Insertion,
    Deletion,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Match => "match",
            ErrorKind::Substitution => "substitution",
            ErrorKind::Insertion => "insertion",
            ErrorKind::Deletion => "deletion",
        }
    }

    pub fn is_mismatch(&self) -> bool {
        *self != ErrorKind::Match
    }

    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::Match,
        ErrorKind::Substitution,
        ErrorKind::Deletion,
        ErrorKind::Insertion,
    ];
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pairing between a reference segment and a hypothesis segment, either of which may be absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentPair {
    /// Position of the pair on the timeline (reference start, or hypothesis start for insertions).
    pub timestamp: f64,
    pub reference: Option<Segment>,
    pub hypothesis: Option<Segment>,
    /// Similarity of the normalized texts (0 for unpaired segments).
    pub similarity: f64,
    pub kind: ErrorKind,
    /// Word-level edit counts between the normalized texts.
    pub word_errors: WordErrors,
}

impl AlignmentPair {
    /// Original caption text, or empty for insertions.
    pub fn original(&self) -> &str {
        self.reference.as_ref().map(|s| s.text.as_str()).unwrap_or("")
    }

    /// Transcribed text, or empty for deletions.
    pub fn transcription(&self) -> &str {
        self.hypothesis.as_ref().map(|s| s.text.as_str()).unwrap_or("")
    }

    /// Hypothesis start minus reference start, when both are present.
    pub fn offset(&self) -> Option<f64> {
        match (&self.reference, &self.hypothesis) {
            (Some(r), Some(h)) => Some(h.start - r.start),
            _ => None,
        }
    }
}

/// All alignment pairs for one language.
///
/// Every statistic is derived from `pairs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub language: String,
    pub pairs: Vec<AlignmentPair>,
}

impl ComparisonResult {
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.pairs.iter().filter(|p| p.kind == kind).count()
    }

    pub fn matches(&self) -> usize {
        self.count(ErrorKind::Match)
    }

    pub fn substitutions(&self) -> usize {
        self.count(ErrorKind::Substitution)
    }

    pub fn deletions(&self) -> usize {
        self.count(ErrorKind::Deletion)
    }

    pub fn insertions(&self) -> usize {
        self.count(ErrorKind::Insertion)
    }

    /// Reference segments accounted for (matches + substitutions + deletions).
    pub fn total_segments(&self) -> usize {
        self.pairs.iter().filter(|p| p.reference.is_some()).count()
    }

    /// Pairs that are not matches, insertions included.
    pub fn mismatch_count(&self) -> usize {
        self.pairs.iter().filter(|p| p.kind.is_mismatch()).count()
    }

    /// Matched reference segments as a percentage of all reference segments.
    ///
    /// Insertions do not enter the denominator. With no reference segments the
    /// accuracy is reported as 100.
    pub fn accuracy(&self) -> f64 {
        let total = self.total_segments();
        if total == 0 {
            100.0
        } else {
            self.matches() as f64 / total as f64 * 100.0
        }
    }

    /// Summed word-level errors over all pairs.
    pub fn word_errors(&self) -> WordErrors {
        let mut total = WordErrors::default();
        for pair in &self.pairs {
            total += pair.word_errors;
        }
        total
    }

    /// Iterate over non-matching pairs.
    pub fn mismatches(&self) -> impl Iterator<Item = &AlignmentPair> {
        self.pairs.iter().filter(|p| p.kind.is_mismatch())
    }
}

/// Aligns reference and hypothesis transcript sets.
///
/// Stateless apart from its validated configuration; running it twice on the
/// same inputs yields identical results.
#[derive(Debug, Clone)]
pub struct Aligner {
    config: AlignerConfig,
    normalizer: TextNormalizer,
}

impl Aligner {
    /// Validate the configuration and build an aligner.
    pub fn new(config: AlignerConfig) -> Result<Self> {
        config.validate()?;
        let normalizer = TextNormalizer::new(config.normalize.clone());
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Align `reference` (captions) against `hypothesis` (transcription).
    pub fn align(&self, reference: &TranscriptSet, hypothesis: &TranscriptSet) -> ComparisonResult {
        let tolerance = self.config.time_tolerance_seconds;

        let reference_tokens: Vec<Vec<String>> = reference
            .segments()
            .iter()
            .map(|s| self.normalizer.tokens(&s.text))
            .collect();
        let hypothesis_tokens: Vec<Vec<String>> = hypothesis
            .segments()
            .iter()
            .map(|s| self.normalizer.tokens(&s.text))
            .collect();
        let hypothesis_text: Vec<String> = hypothesis_tokens.iter().map(|t| t.join(" ")).collect();

        let mut claimed = vec![false; hypothesis.len()];
        let mut paired = Vec::with_capacity(reference.len());

        for (ref_idx, ref_segment) in reference.segments().iter().enumerate() {
            let ref_text = reference_tokens[ref_idx].join(" ");

            let mut best: Option<(usize, f64)> = None;
            for (hyp_idx, hyp_segment) in hypothesis.segments().iter().enumerate() {
                if claimed[hyp_idx] || !hyp_segment.overlaps(ref_segment.start, ref_segment.end, tolerance) {
                    continue;
                }
                let score = similarity(&ref_text, &hypothesis_text[hyp_idx]);
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((hyp_idx, score));
                }
            }

            let pair = match best {
                Some((hyp_idx, score)) if score >= self.config.threshold_min => {
                    claimed[hyp_idx] = true;
                    let kind = if score >= self.config.threshold {
                        ErrorKind::Match
                    } else {
                        ErrorKind::Substitution
                    };
                    AlignmentPair {
                        timestamp: ref_segment.start,
                        reference: Some(ref_segment.clone()),
                        hypothesis: Some(hypothesis.segments()[hyp_idx].clone()),
                        similarity: score,
                        kind,
                        word_errors: WordErrors::between(&reference_tokens[ref_idx], &hypothesis_tokens[hyp_idx]),
                    }
                }
                _ => AlignmentPair {
                    timestamp: ref_segment.start,
                    reference: Some(ref_segment.clone()),
                    hypothesis: None,
                    similarity: best.map(|(_, score)| score).unwrap_or(0.0),
                    kind: ErrorKind::Deletion,
                    word_errors: WordErrors::between(&reference_tokens[ref_idx], &[] as &[String]),
                },
            };
            paired.push(pair);
        }

        let insertions: Vec<AlignmentPair> = hypothesis
            .segments()
            .iter()
            .enumerate()
            .filter(|(idx, _)| !claimed[*idx])
            .map(|(idx, segment)| AlignmentPair {
                timestamp: segment.start,
                reference: None,
                hypothesis: Some(segment.clone()),
                similarity: 0.0,
                kind: ErrorKind::Insertion,
                word_errors: WordErrors::between(&[] as &[String], &hypothesis_tokens[idx]),
            })
            .collect();

        let result = ComparisonResult {
            language: reference.language().to_string(),
            pairs: merge_by_timestamp(paired, insertions),
        };

        debug!(
            language = %result.language,
            matches = result.matches(),
            substitutions = result.substitutions(),
            deletions = result.deletions(),
            insertions = result.insertions(),
            "Alignment complete"
        );

        result
    }
}

/// Merge reference-ordered pairs with insertions by timestamp.
///
/// Both inputs are already time-ordered; a reference pair sorts before an
/// insertion at the same timestamp.
fn merge_by_timestamp(paired: Vec<AlignmentPair>, insertions: Vec<AlignmentPair>) -> Vec<AlignmentPair> {
    let mut merged = Vec::with_capacity(paired.len() + insertions.len());
    let mut paired = paired.into_iter().peekable();
    let mut insertions = insertions.into_iter().peekable();

    loop {
        let take_insertion = match (paired.peek(), insertions.peek()) {
            (Some(p), Some(i)) => i.timestamp < p.timestamp,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (None, None) => break,
        };
        let next = if take_insertion { insertions.next() } else { paired.next() };
        merged.extend(next);
    }

    merged
}
