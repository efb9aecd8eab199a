//! Transcript alignment.
//!
//! Pairs caption segments with transcription segments by time, scores each pair
//! on normalized text and classifies it as a match, substitution, deletion or
//! insertion. The [`Coordinator`] runs this per language.

mod aligner;
mod coordinator;
mod normalize;
mod segment;
mod similarity;

pub use aligner::{Aligner, AlignerConfig, AlignmentPair, ComparisonResult, ErrorKind};
pub use coordinator::{
    find_track, normalize_languages, ComparisonMode, Coordinator, Hypotheses, LanguageOutcome,
};
pub use normalize::{NormalizeOptions, TextNormalizer, DEFAULT_FILLERS};
pub use segment::{Segment, TranscriptSet};
pub use similarity::{similarity, WordErrors};
