//! Caption tracks: extraction, parsing and export.

mod extractor;
mod format;
mod parse;

pub use extractor::{
    discover_sidecars, load_caption_file, select_tracks, CaptionExtractor, CaptionStrategy, RemoteTrack,
};
pub use format::{format_captions, CaptionExport, CaptionFormat, CueExport};
pub use parse::{detect_format, parse_captions, parse_timestamp, playlist_urls, BodyFormat};

use crate::alignment::TranscriptSet;
use serde::{Deserialize, Serialize};

/// Whether a track was authored or generated by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionKind {
    Manual,
    Automatic,
}

impl std::fmt::Display for CaptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionKind::Manual => write!(f, "manual"),
            CaptionKind::Automatic => write!(f, "automatic"),
        }
    }
}

/// A parsed caption track for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    /// Language tag as reported by the source.
    pub language: String,
    pub kind: CaptionKind,
    pub set: TranscriptSet,
}

/// Primary language subtag, lowercased (`en-US` -> `en`).
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Whether two tags share a primary subtag.
pub fn same_primary_language(a: &str, b: &str) -> bool {
    let a = primary_subtag(a);
    !a.is_empty() && a == primary_subtag(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_subtag() {
        assert_eq!(primary_subtag("en-US"), "en");
        assert_eq!(primary_subtag("pt_BR"), "pt");
        assert_eq!(primary_subtag("DE"), "de");
    }

    #[test]
    fn test_same_primary_language() {
        assert!(same_primary_language("en", "en-GB"));
        assert!(same_primary_language("en-US", "EN-gb"));
        assert!(!same_primary_language("en", "es"));
        assert!(!same_primary_language("", ""));
    }

    #[test]
    fn test_manual_sorts_before_automatic() {
        assert!(CaptionKind::Manual < CaptionKind::Automatic);
    }
}
