//! Runs the aligner once per requested language.

use super::aligner::{Aligner, ComparisonResult};
use super::segment::TranscriptSet;
use crate::captions::{same_primary_language, CaptionKind, CaptionTrack};
use crate::error::{CapcheckError, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// What is compared against what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Platform captions (reference) against the speech model (hypothesis).
    #[default]
    CaptionsVsTranscription,
    /// Manual captions (reference) against automatic captions (hypothesis).
    ManualVsAutomatic,
    /// No captions were available; only the transcription was produced.
    TranscriptionOnly,
}

impl std::fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ComparisonMode::CaptionsVsTranscription => "captions vs transcription",
            ComparisonMode::ManualVsAutomatic => "manual vs automatic captions",
            ComparisonMode::TranscriptionOnly => "transcription only",
        };
        f.write_str(label)
    }
}

/// Result for a single language.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LanguageOutcome {
    Compared(ComparisonResult),
    /// No reference captions exist for this language.
    NoCaptions,
    /// Captions exist but there is nothing to compare them against.
    NoTranscription,
}

impl LanguageOutcome {
    pub fn result(&self) -> Option<&ComparisonResult> {
        match self {
            LanguageOutcome::Compared(result) => Some(result),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            LanguageOutcome::Compared(_) => "compared",
            LanguageOutcome::NoCaptions => "no captions available",
            LanguageOutcome::NoTranscription => "no transcription available",
        }
    }
}

/// Hypothesis transcripts handed to the coordinator.
#[derive(Debug, Clone)]
pub enum Hypotheses {
    /// One transcript compared against every language's captions.
    Shared(TranscriptSet),
    /// A transcript per language tag.
    PerLanguage(HashMap<String, TranscriptSet>),
}

impl Hypotheses {
    /// Hypothesis for a language: exact tag first, then primary subtag.
    pub fn for_language(&self, language: &str) -> Option<&TranscriptSet> {
        match self {
            Hypotheses::Shared(set) => Some(set),
            Hypotheses::PerLanguage(sets) => sets
                .iter()
                .find(|(tag, _)| tag.eq_ignore_ascii_case(language))
                .or_else(|| {
                    let mut related: Vec<_> = sets
                        .iter()
                        .filter(|(tag, _)| same_primary_language(tag, language))
                        .collect();
                    related.sort_by(|a, b| a.0.cmp(b.0));
                    related.into_iter().next()
                })
                .map(|(_, set)| set),
        }
    }
}

/// Trim, drop empty tags and deduplicate (case-insensitively) keeping first occurrence order.
pub fn normalize_languages<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .map(|tag| tag.as_ref().trim())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Find the caption track for a language.
///
/// An exact tag match wins over a primary-subtag match (`en` for `en-US`);
/// within each tier a manual track is preferred unless `kind` restricts the search.
/// Tracks without cues are never returned.
pub fn find_track<'a>(
    tracks: &'a [CaptionTrack],
    language: &str,
    kind: Option<CaptionKind>,
) -> Option<&'a CaptionTrack> {
    let eligible = |track: &CaptionTrack| !track.set.is_empty() && kind.map_or(true, |k| track.kind == k);

    tracks
        .iter()
        .filter(|t| eligible(t) && t.language.eq_ignore_ascii_case(language))
        .min_by_key(|t| t.kind)
        .or_else(|| {
            tracks
                .iter()
                .filter(|t| eligible(t) && same_primary_language(&t.language, language))
                .min_by_key(|t| t.kind)
        })
}

/// Per-language alignment with bounded parallelism.
#[derive(Debug, Clone)]
pub struct Coordinator {
    aligner: Arc<Aligner>,
    max_concurrent: usize,
}

type Job = (String, TranscriptSet, TranscriptSet);

impl Coordinator {
    pub fn new(aligner: Aligner, max_concurrent: usize) -> Self {
        Self {
            aligner: Arc::new(aligner),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn aligner(&self) -> &Aligner {
        &self.aligner
    }

    /// Compare each language's captions against the transcription.
    ///
    /// Languages without captions are recorded as [`LanguageOutcome::NoCaptions`];
    /// languages with captions but no hypothesis as [`LanguageOutcome::NoTranscription`].
    #[instrument(skip_all, fields(languages = languages.len()))]
    pub async fn compare<S: AsRef<str>>(
        &self,
        languages: &[S],
        tracks: &[CaptionTrack],
        hypotheses: &Hypotheses,
    ) -> Result<BTreeMap<String, LanguageOutcome>> {
        let mut outcomes = BTreeMap::new();
        let mut jobs: Vec<Job> = Vec::new();

        for language in normalize_languages(languages) {
            let Some(track) = find_track(tracks, &language, None) else {
                debug!("No captions for {}", language);
                outcomes.insert(language, LanguageOutcome::NoCaptions);
                continue;
            };
            let Some(hypothesis) = hypotheses.for_language(&language) else {
                outcomes.insert(language, LanguageOutcome::NoTranscription);
                continue;
            };
            debug!("Comparing {} ({} {} captions)", language, track.set.len(), track.kind);
            jobs.push((language, track.set.clone(), hypothesis.clone()));
        }

        self.run(jobs, outcomes).await
    }

    /// Compare manual captions against automatic captions of the same language.
    #[instrument(skip_all, fields(languages = languages.len()))]
    pub async fn compare_manual_automatic<S: AsRef<str>>(
        &self,
        languages: &[S],
        tracks: &[CaptionTrack],
    ) -> Result<BTreeMap<String, LanguageOutcome>> {
        let mut outcomes = BTreeMap::new();
        let mut jobs: Vec<Job> = Vec::new();

        for language in normalize_languages(languages) {
            let manual = find_track(tracks, &language, Some(CaptionKind::Manual));
            let automatic = find_track(tracks, &language, Some(CaptionKind::Automatic));
            match (manual, automatic) {
                (None, _) => {
                    outcomes.insert(language, LanguageOutcome::NoCaptions);
                }
                (Some(_), None) => {
                    outcomes.insert(language, LanguageOutcome::NoTranscription);
                }
                (Some(manual), Some(automatic)) => {
                    jobs.push((language, manual.set.clone(), automatic.set.clone()));
                }
            }
        }

        self.run(jobs, outcomes).await
    }

    /// Align every job on the blocking pool and collect results into `outcomes`.
    async fn run(
        &self,
        jobs: Vec<Job>,
        mut outcomes: BTreeMap<String, LanguageOutcome>,
    ) -> Result<BTreeMap<String, LanguageOutcome>> {
        if jobs.is_empty() {
            return Ok(outcomes);
        }

        info!("Aligning {} language(s)", jobs.len());

        let mut stream = stream::iter(jobs)
            .map(|(language, reference, hypothesis)| {
                let aligner = Arc::clone(&self.aligner);
                async move {
                    let joined =
                        tokio::task::spawn_blocking(move || aligner.align(&reference, &hypothesis)).await;
                    (language, joined)
                }
            })
            .buffer_unordered(self.max_concurrent);

        while let Some((language, joined)) = stream.next().await {
            let mut result = joined
                .map_err(|e| CapcheckError::Task(format!("Alignment for {} failed: {}", language, e)))?;
            // Report under the requested tag, not the matched track's (`en` for `en-US`)
            result.language = language.clone();
            outcomes.insert(language, LanguageOutcome::Compared(result));
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{AlignerConfig, Segment};

    fn set(language: &str, texts: &[(f64, f64, &str)]) -> TranscriptSet {
        TranscriptSet::new(
            language,
            texts
                .iter()
                .map(|(s, e, t)| Segment::new(*s, *e, language, *t))
                .collect(),
        )
        .unwrap()
    }

    fn track(language: &str, kind: CaptionKind, texts: &[(f64, f64, &str)]) -> CaptionTrack {
        CaptionTrack {
            language: language.to_string(),
            kind,
            set: set(language, texts),
        }
    }

    fn coordinator() -> Coordinator {
        Coordinator::new(Aligner::new(AlignerConfig::default()).unwrap(), 2)
    }

    #[test]
    fn test_normalize_languages() {
        let tags = normalize_languages(&[" en ", "es", "EN", "", "es", "fr"]);
        assert_eq!(tags, vec!["en", "es", "fr"]);
    }

    #[test]
    fn test_find_track_prefers_exact_then_manual() {
        let cue = [(0.0, 1.0, "hi")];
        let tracks = vec![
            track("en", CaptionKind::Automatic, &cue),
            track("en-US", CaptionKind::Manual, &cue),
            track("en", CaptionKind::Manual, &cue),
        ];

        let found = find_track(&tracks, "en", None).unwrap();
        assert_eq!(found.language, "en");
        assert_eq!(found.kind, CaptionKind::Manual);

        let found = find_track(&tracks, "en-GB", None).unwrap();
        assert_eq!(found.kind, CaptionKind::Manual);

        let found = find_track(&tracks, "en", Some(CaptionKind::Automatic)).unwrap();
        assert_eq!(found.kind, CaptionKind::Automatic);

        assert!(find_track(&tracks, "de", None).is_none());
    }

    #[tokio::test]
    async fn test_missing_captions_recorded() {
        let tracks = vec![track("en", CaptionKind::Manual, &[(0.0, 2.0, "Hello there")])];
        let hypotheses = Hypotheses::Shared(set("en", &[(0.0, 2.0, "hello there")]));

        let outcomes = coordinator()
            .compare(&["en", "es", "en"], &tracks, &hypotheses)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes["es"], LanguageOutcome::NoCaptions);
        let en = outcomes["en"].result().unwrap();
        assert_eq!(en.matches(), 1);
        assert_eq!(en.accuracy(), 100.0);
    }

    #[test]
    fn test_find_track_skips_empty_tracks() {
        let tracks = vec![
            track("en", CaptionKind::Manual, &[]),
            track("en", CaptionKind::Automatic, &[(0.0, 1.0, "hi")]),
        ];

        let found = find_track(&tracks, "en", None).unwrap();
        assert_eq!(found.kind, CaptionKind::Automatic);
        assert!(find_track(&tracks, "en", Some(CaptionKind::Manual)).is_none());
    }

    #[tokio::test]
    async fn test_empty_track_counts_as_no_captions() {
        let tracks = vec![CaptionTrack {
            language: "en".to_string(),
            kind: CaptionKind::Manual,
            set: TranscriptSet::empty("en"),
        }];
        let hypotheses = Hypotheses::Shared(set("en", &[(0.0, 2.0, "hello there")]));

        let outcomes = coordinator().compare(&["en"], &tracks, &hypotheses).await.unwrap();
        assert_eq!(outcomes["en"], LanguageOutcome::NoCaptions);

        let outcomes = coordinator()
            .compare_manual_automatic(&["en"], &tracks)
            .await
            .unwrap();
        assert_eq!(outcomes["en"], LanguageOutcome::NoCaptions);
    }

    #[tokio::test]
    async fn test_result_labelled_with_requested_language() {
        let tracks = vec![track("en-US", CaptionKind::Manual, &[(0.0, 2.0, "good morning")])];
        let hypotheses = Hypotheses::Shared(set("en", &[(0.0, 2.0, "good morning")]));

        let outcomes = coordinator().compare(&["en"], &tracks, &hypotheses).await.unwrap();
        let en = outcomes["en"].result().unwrap();
        assert_eq!(en.language, "en");
        assert_eq!(en.matches(), 1);
    }

    #[tokio::test]
    async fn test_per_language_hypotheses() {
        let tracks = vec![
            track("en", CaptionKind::Manual, &[(0.0, 2.0, "good morning")]),
            track("es", CaptionKind::Manual, &[(0.0, 2.0, "buenos días")]),
        ];
        let mut sets = HashMap::new();
        sets.insert("en-US".to_string(), set("en-US", &[(0.0, 2.0, "good morning")]));

        let outcomes = coordinator()
            .compare(&["en", "es"], &tracks, &Hypotheses::PerLanguage(sets))
            .await
            .unwrap();

        assert_eq!(outcomes["en"].result().unwrap().matches(), 1);
        assert_eq!(outcomes["es"], LanguageOutcome::NoTranscription);
    }

    #[tokio::test]
    async fn test_manual_against_automatic() {
        let tracks = vec![
            track("en", CaptionKind::Manual, &[(0.0, 2.0, "Check the cable."), (2.0, 4.0, "Restart it.")]),
            track("en", CaptionKind::Automatic, &[(0.0, 2.0, "check the cable"), (2.0, 4.0, "reset it")]),
            track("fr", CaptionKind::Manual, &[(0.0, 2.0, "bonjour")]),
        ];

        let outcomes = coordinator()
            .compare_manual_automatic(&["en", "fr", "de"], &tracks)
            .await
            .unwrap();

        let en = outcomes["en"].result().unwrap();
        assert_eq!(en.total_segments(), 2);
        assert_eq!(en.matches(), 1);
        assert_eq!(en.substitutions(), 1);
        assert_eq!(outcomes["fr"], LanguageOutcome::NoTranscription);
        assert_eq!(outcomes["de"], LanguageOutcome::NoCaptions);
    }

    #[tokio::test]
    async fn test_parallel_results_match_sequential() {
        let languages = ["en", "es", "fr", "de"];
        let tracks: Vec<CaptionTrack> = languages
            .iter()
            .map(|l| track(l, CaptionKind::Manual, &[(0.0, 1.0, "one two"), (1.0, 2.0, "three four")]))
            .collect();
        let hypothesis = set("en", &[(0.0, 1.0, "one two"), (1.0, 2.0, "three for")]);

        let coordinator = coordinator();
        let outcomes = coordinator
            .compare(&languages, &tracks, &Hypotheses::Shared(hypothesis.clone()))
            .await
            .unwrap();

        for track in &tracks {
            let expected = coordinator.aligner().align(&track.set, &hypothesis);
            assert_eq!(outcomes[&track.language].result().unwrap(), &expected);
        }
    }

    #[test]
    fn test_no_languages_requested() {
        let coordinator = coordinator();
        let empty: [&str; 0] = [];
        let outcomes = tokio_test::block_on(coordinator.compare(
            &empty,
            &[],
            &Hypotheses::Shared(TranscriptSet::empty("en")),
        ))
        .unwrap();
        assert!(outcomes.is_empty());
    }
}
