//! Raw transcription output and its conversion into transcript sets.

use crate::alignment::{Segment, TranscriptSet};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A single word with timing from Whisper word-level timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperWord {
    pub word: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

/// A segment as returned by the model, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl RawSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Output of transcribing one audio chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkTranscript {
    pub segments: Vec<RawSegment>,
    pub words: Vec<WhisperWord>,
    /// Language reported by the model.
    pub language: Option<String>,
}

impl ChunkTranscript {
    /// Shift all timestamps by a chunk's offset in the full audio.
    pub fn offset(mut self, seconds: f64) -> Self {
        for segment in &mut self.segments {
            segment.start += seconds;
            segment.end += seconds;
        }
        for word in &mut self.words {
            word.start += seconds;
            word.end += seconds;
        }
        self
    }
}

/// Regroup words into caption-sized segments.
///
/// A segment is closed once it spans at least `chunk_seconds`; the next one
/// starts where the previous ended.
pub fn resegment_words(words: &[WhisperWord], chunk_seconds: f64) -> Vec<RawSegment> {
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut chunk_start: Option<f64> = None;
    let mut last_end = 0.0;

    for word in words {
        let text = word.word.trim();
        if text.is_empty() {
            continue;
        }

        let start = *chunk_start.get_or_insert(word.start);
        current.push(text);
        last_end = word.end;

        if word.end - start >= chunk_seconds {
            segments.push(RawSegment::new(start, word.end, current.join(" ")));
            current.clear();
            chunk_start = Some(word.end);
        }
    }

    if let (false, Some(start)) = (current.is_empty(), chunk_start) {
        segments.push(RawSegment::new(start, last_end.max(start), current.join(" ")));
    }

    segments
}

/// Clamp raw segments into a valid transcript set.
///
/// Non-finite and empty segments are dropped, negative times become zero and
/// an end before its start is raised to the start.
pub fn into_transcript_set(language: &str, raw: Vec<RawSegment>) -> Result<TranscriptSet> {
    let segments = raw
        .into_iter()
        .filter(|s| s.start.is_finite() && s.end.is_finite())
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| {
            let start = s.start.max(0.0);
            let end = s.end.max(start);
            Segment::new(start, end, language, s.text.trim())
        })
        .collect();

    TranscriptSet::from_unsorted(language, segments)
}

/// Map a model-reported language to a language tag.
///
/// Whisper reports full English names ("english"); tags pass through.
pub fn language_code(reported: &str) -> String {
    let reported = reported.trim().to_lowercase();
    let code = match reported.as_str() {
        "english" => "en",
        "spanish" => "es",
        "french" => "fr",
        "german" => "de",
        "italian" => "it",
        "portuguese" => "pt",
        "dutch" => "nl",
        "japanese" => "ja",
        "chinese" => "zh",
        "korean" => "ko",
        "russian" => "ru",
        "arabic" => "ar",
        "hindi" => "hi",
        "polish" => "pl",
        "turkish" => "tr",
        "swedish" => "sv",
        "czech" => "cs",
        "ukrainian" => "uk",
        _ => return reported,
    };
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> WhisperWord {
        WhisperWord {
            word: text.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_resegment_words() {
        let words = vec![
            word(" Press", 0.0, 0.5),
            word(" the", 0.5, 1.0),
            word(" power", 1.0, 5.2),
            word(" button", 5.4, 6.0),
            word(" now", 6.0, 7.0),
        ];

        let segments = resegment_words(&words, 5.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Press the power");
        assert_eq!(segments[0].end, 5.2);
        assert_eq!(segments[1].start, 5.2);
        assert_eq!(segments[1].end, 7.0);
        assert_eq!(segments[1].text, "button now");
    }

    #[test]
    fn test_resegment_empty() {
        assert!(resegment_words(&[], 5.0).is_empty());
        assert!(resegment_words(&[word("  ", 0.0, 1.0)], 5.0).is_empty());
    }

    #[test]
    fn test_into_transcript_set_clamps() {
        let raw = vec![
            RawSegment::new(4.0, 3.5, " second "),
            RawSegment::new(-0.2, 2.0, "first"),
            RawSegment::new(5.0, f64::NAN, "broken"),
            RawSegment::new(6.0, 7.0, "   "),
        ];

        let set = into_transcript_set("en", raw).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.segments()[0].start, 0.0);
        assert_eq!(set.segments()[1].text, "second");
        assert_eq!(set.segments()[1].end, 4.0);
    }

    #[test]
    fn test_chunk_offset() {
        let chunk = ChunkTranscript {
            segments: vec![RawSegment::new(1.0, 2.0, "hi")],
            words: vec![word("hi", 1.0, 1.5)],
            language: None,
        }
        .offset(600.0);

        assert_eq!(chunk.segments[0].start, 601.0);
        assert_eq!(chunk.words[0].end, 601.5);
    }

    #[test]
    fn test_language_code() {
        assert_eq!(language_code("English"), "en");
        assert_eq!(language_code("es"), "es");
        assert_eq!(language_code("klingon"), "klingon");
    }
}
