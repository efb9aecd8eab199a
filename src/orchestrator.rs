//! Pipeline orchestrator for capcheck.
//!
//! Resolves the input, fetches captions and audio, transcribes, aligns each
//! language and assembles the report.

use crate::alignment::{
    normalize_languages, Aligner, ComparisonMode, Coordinator, Hypotheses, LanguageOutcome,
    TranscriptSet,
};
use crate::audio::{download_audio, download_direct, extract_local_audio};
use crate::captions::{
    discover_sidecars, load_caption_file, CaptionExtractor, CaptionKind, CaptionStrategy,
    CaptionTrack,
};
use crate::config::Settings;
use crate::error::{CapcheckError, Result};
use crate::report::{write_json, write_workbook, Report, VideoInfo};
use crate::source::{parse_input, MediaMetadata, MediaSource, PlatformSource, SourceType};
use crate::transcription::{Transcriber, WhisperTranscriber};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// What a `compare` run should do.
#[derive(Debug, Clone, Default)]
pub struct CompareRequest {
    /// URL, video ID or local path.
    pub input: String,
    /// Languages to compare; the configured list when empty.
    pub languages: Vec<String>,
    /// Skip captions and only transcribe.
    pub force_whisper: bool,
    /// Compare manual captions against automatic ones instead of transcribing.
    pub manual_vs_automatic: bool,
    /// Caption file used as the reference for the first language.
    pub caption_file: Option<PathBuf>,
    /// Language hint for the transcription.
    pub transcription_language: Option<String>,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct CompareOutcome {
    pub report: Report,
    pub metadata: MediaMetadata,
    pub captions: Vec<CaptionTrack>,
    pub transcript: Option<TranscriptSet>,
}

/// The main orchestrator for the capcheck pipeline.
pub struct Orchestrator {
    settings: Settings,
    transcriber: Arc<dyn Transcriber>,
    extractor: CaptionExtractor,
    coordinator: Coordinator,
    http: reqwest::Client,
    temp_dir: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator using Whisper for transcription.
    pub fn new(settings: Settings) -> Result<Self> {
        let t = &settings.transcription;
        let mut whisper =
            WhisperTranscriber::with_config(&t.model, t.chunk_duration_seconds, t.max_concurrent_chunks);
        if t.word_timestamps {
            whisper = whisper.with_word_timestamps(t.resegment_seconds);
        }
        info!("Using {} for transcription", t.model);

        Self::with_components(settings, Arc::new(whisper))
    }

    /// Create an orchestrator with a custom transcriber.
    pub fn with_components(settings: Settings, transcriber: Arc<dyn Transcriber>) -> Result<Self> {
        let aligner = Aligner::new(settings.aligner_config()?)?;
        let coordinator = Coordinator::new(aligner, settings.alignment.max_concurrent_languages);

        let user_agent = settings
            .acquisition
            .user_agent
            .as_deref()
            .map(crate::audio::resolve_user_agent);
        let extractor = CaptionExtractor::new(
            CaptionStrategy::defaults(),
            settings.acquisition.cookies_from_browser.clone(),
            user_agent,
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.acquisition.download_timeout_seconds.max(1)))
            .build()
            .unwrap_or_default();

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        Ok(Self {
            settings,
            transcriber,
            extractor,
            coordinator,
            http,
            temp_dir,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Requested languages, or the configured ones.
    pub fn resolve_languages(&self, requested: &[String]) -> Vec<String> {
        let languages = normalize_languages(requested);
        if languages.is_empty() {
            normalize_languages(&self.settings.captions.languages)
        } else {
            languages
        }
    }

    /// Resolve an input into media metadata.
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str) -> Result<MediaMetadata> {
        let (source, locator) = parse_input(input)?;

        let metadata = if source.source_type() == SourceType::Platform {
            PlatformSource::new()
                .with_args(self.ytdlp_args())
                .fetch_media(&locator)
                .await?
        } else {
            source.fetch_media(&locator).await?
        };

        info!("Resolved {} ({:?})", metadata.title, metadata.kind);
        self.check_duration(&metadata)?;
        Ok(metadata)
    }

    fn ytdlp_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(browser) = &self.settings.acquisition.cookies_from_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        }
        if let Some(ua) = &self.settings.acquisition.user_agent {
            args.push("--user-agent".to_string());
            args.push(crate::audio::resolve_user_agent(ua));
        }
        args
    }

    fn check_duration(&self, metadata: &MediaMetadata) -> Result<()> {
        let max = f64::from(self.settings.transcription.max_duration_seconds);
        match metadata.duration_seconds {
            Some(duration) if duration > max => Err(CapcheckError::InvalidInput(format!(
                "Media duration ({:.0} seconds) exceeds maximum ({:.0} seconds)",
                duration, max
            ))),
            _ => Ok(()),
        }
    }

    /// Caption tracks for the requested languages.
    ///
    /// Local media uses sidecar files; platform media uses the captions listed
    /// in its info document, then the caption strategies.
    #[instrument(skip(self, metadata), fields(media = %metadata.id))]
    pub async fn fetch_captions(&self, metadata: &MediaMetadata, languages: &[String]) -> Result<Vec<CaptionTrack>> {
        let mut tracks = match metadata.source_type {
            SourceType::Local => {
                let default_language = languages.first().map(String::as_str).unwrap_or("en");
                let mut tracks = Vec::new();
                for (path, language) in discover_sidecars(Path::new(&metadata.source_url), default_language) {
                    match load_caption_file(&path, &language, CaptionKind::Manual).await {
                        Ok(track) => tracks.push(track),
                        Err(e) => warn!("Skipping {}: {}", path.display(), e),
                    }
                }
                tracks
            }
            SourceType::DirectUrl => Vec::new(),
            SourceType::Platform => {
                let listed = match &metadata.info {
                    Some(info) => self.extractor.tracks_from_info(info, languages, true).await,
                    None => Vec::new(),
                };
                if listed.is_empty() {
                    self.extractor.extract(&metadata.source_url, languages).await?
                } else {
                    listed
                }
            }
        };

        if !self.settings.captions.include_automatic {
            tracks.retain(|t| t.kind == CaptionKind::Manual);
        }
        drop_empty_tracks(&mut tracks);
        info!("Found {} caption track(s)", tracks.len());
        Ok(tracks)
    }

    /// Download or extract the audio track.
    #[instrument(skip(self, metadata), fields(media = %metadata.id))]
    pub async fn acquire_audio(&self, metadata: &MediaMetadata) -> Result<PathBuf> {
        match metadata.source_type {
            SourceType::Local => {
                extract_local_audio(Path::new(&metadata.source_url), &metadata.id, &self.temp_dir).await
            }
            SourceType::DirectUrl => {
                download_direct(&self.http, &metadata.source_url, &metadata.id, &self.temp_dir).await
            }
            SourceType::Platform => {
                let options = self.settings.download_options()?;
                download_audio(&metadata.source_url, &metadata.id, &self.temp_dir, &options).await
            }
        }
    }

    /// Transcribe an audio file.
    pub async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<TranscriptSet> {
        let hint = language.or(self.settings.transcription.language.as_deref());
        self.transcriber.transcribe(audio_path, hint).await
    }

    /// Run the full pipeline for one input.
    #[instrument(skip(self, request), fields(input = %request.input))]
    pub async fn compare(&self, request: &CompareRequest) -> Result<CompareOutcome> {
        let languages = self.resolve_languages(&request.languages);
        let metadata = self.resolve(&request.input).await?;

        if request.manual_vs_automatic {
            let captions = self.fetch_captions(&metadata, &languages).await?;
            let outcomes = self
                .coordinator
                .compare_manual_automatic(&languages, &captions)
                .await?;
            let info = VideoInfo::from_metadata(&metadata, ComparisonMode::ManualVsAutomatic);
            return Ok(CompareOutcome {
                report: Report::new(info, outcomes),
                metadata,
                captions,
                transcript: None,
            });
        }

        let mut captions = Vec::new();
        if !request.force_whisper {
            if let Some(path) = &request.caption_file {
                let language = languages.first().map(String::as_str).unwrap_or("en");
                captions.push(load_caption_file(path, language, CaptionKind::Manual).await?);
            }
            captions.extend(self.fetch_captions(&metadata, &languages).await?);
            drop_empty_tracks(&mut captions);
        }

        let mode = if captions.is_empty() {
            if !request.force_whisper {
                warn!("No captions found; producing the transcription only");
            }
            ComparisonMode::TranscriptionOnly
        } else {
            ComparisonMode::CaptionsVsTranscription
        };

        let audio_path = self.acquire_audio(&metadata).await?;
        let transcript = self
            .transcribe(&audio_path, request.transcription_language.as_deref())
            .await;

        if !self.settings.general.keep_audio && audio_path.starts_with(&self.temp_dir) {
            if let Err(e) = std::fs::remove_file(&audio_path) {
                warn!("Failed to cleanup audio file: {}", e);
            }
        }
        let transcript = transcript?;

        let mut info = VideoInfo::from_metadata(&metadata, mode);
        info.language = Some(transcript.language().to_string());
        let report = self
            .build_report(info, &languages, &captions, Some(&transcript))
            .await?;

        Ok(CompareOutcome {
            report,
            metadata,
            captions,
            transcript: Some(transcript),
        })
    }

    /// Align the captions against a transcript and assemble the report.
    pub async fn build_report(
        &self,
        info: VideoInfo,
        languages: &[String],
        captions: &[CaptionTrack],
        transcript: Option<&TranscriptSet>,
    ) -> Result<Report> {
        let outcomes = match transcript {
            Some(set) => {
                self.coordinator
                    .compare(languages, captions, &Hypotheses::Shared(set.clone()))
                    .await?
            }
            None => normalize_languages(languages)
                .into_iter()
                .map(|language| (language, LanguageOutcome::NoTranscription))
                .collect::<BTreeMap<_, _>>(),
        };
        Ok(Report::new(info, outcomes))
    }

    /// Compare two caption files directly.
    #[instrument(skip(self))]
    pub async fn align_files(&self, reference: &Path, hypothesis: &Path, language: &str) -> Result<Report> {
        let reference_track = load_caption_file(reference, language, CaptionKind::Manual).await?;
        let hypothesis_track = load_caption_file(hypothesis, language, CaptionKind::Automatic).await?;

        let title = reference
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("captions")
            .to_string();
        let mut info = VideoInfo::new(
            reference.to_string_lossy(),
            title,
            ComparisonMode::CaptionsVsTranscription,
        );
        info.language = Some(language.to_string());
        info.duration_seconds = Some(reference_track.set.duration().max(hypothesis_track.set.duration()));

        let languages = vec![language.to_string()];
        self.build_report(info, &languages, &[reference_track], Some(&hypothesis_track.set))
            .await
    }

    /// Write the configured report files into `dir` and return their paths.
    pub fn write_reports(&self, report: &Report, dir: &Path) -> Result<Vec<PathBuf>> {
        let (json_path, xlsx_path) = report.output_paths(dir);
        let mut written = Vec::new();

        if self.settings.report.json {
            write_json(report, &json_path)?;
            written.push(json_path);
        }
        if self.settings.report.xlsx {
            write_workbook(report, &xlsx_path)?;
            written.push(xlsx_path);
        }
        Ok(written)
    }
}

/// Remove tracks that parsed to zero cues.
fn drop_empty_tracks(tracks: &mut Vec<CaptionTrack>) {
    tracks.retain(|t| {
        if t.set.is_empty() {
            warn!("Ignoring {} {} captions with no cues", t.language, t.kind);
        }
        !t.set.is_empty()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::Segment;
    use crate::source::MediaKind;
    use async_trait::async_trait;

    struct FixedTranscriber(TranscriptSet);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio_path: &Path, language: Option<&str>) -> Result<TranscriptSet> {
            Ok(match language {
                Some(lang) => self.0.clone().with_language(lang),
                None => self.0.clone(),
            })
        }
    }

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.temp_dir = dir.join("tmp").to_string_lossy().to_string();
        settings
    }

    fn transcript() -> TranscriptSet {
        TranscriptSet::new(
            "en",
            vec![
                Segment::new(0.0, 2.0, "en", "Hello and welcome"),
                Segment::new(2.5, 4.0, "en", "to the setup guide"),
            ],
        )
        .unwrap()
    }

    fn orchestrator(dir: &Path) -> Orchestrator {
        Orchestrator::with_components(settings(dir), Arc::new(FixedTranscriber(transcript()))).unwrap()
    }

    fn metadata(source_url: &str, source_type: SourceType) -> MediaMetadata {
        MediaMetadata {
            id: "local_talk".to_string(),
            title: "talk".to_string(),
            duration_seconds: Some(4.0),
            kind: MediaKind::Video,
            source_type,
            source_url: source_url.to_string(),
            format: None,
            language: None,
            channel: None,
            content_length: None,
            info: None,
        }
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.alignment.threshold = 1.5;

        let result = Orchestrator::with_components(settings, Arc::new(FixedTranscriber(transcript())));
        assert!(matches!(result, Err(CapcheckError::ThresholdConfiguration(_))));
    }

    #[test]
    fn test_resolve_languages() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());

        assert_eq!(orchestrator.resolve_languages(&[]), vec!["en"]);
        assert_eq!(
            orchestrator.resolve_languages(&[" es ".to_string(), "ES".to_string(), "de".to_string()]),
            vec!["es", "de"]
        );
    }

    #[test]
    fn test_duration_limit() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());

        let mut long = metadata("/tmp/talk.mp4", SourceType::Local);
        long.duration_seconds = Some(10_000.0);
        assert!(orchestrator.check_duration(&long).is_err());
        assert!(orchestrator.check_duration(&metadata("/tmp/talk.mp4", SourceType::Local)).is_ok());
    }

    #[tokio::test]
    async fn test_sidecar_captions_for_local_media() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("talk.mp4");
        std::fs::write(&media, b"").unwrap();
        std::fs::write(
            dir.path().join("talk.en.vtt"),
            "WEBVTT\n\n00:00.000 --> 00:02.000\nHello and welcome\n",
        )
        .unwrap();

        let orchestrator = orchestrator(dir.path());
        let tracks = orchestrator
            .fetch_captions(&metadata(&media.to_string_lossy(), SourceType::Local), &["en".to_string()])
            .await
            .unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language, "en");
        assert_eq!(tracks[0].kind, CaptionKind::Manual);
    }

    #[tokio::test]
    async fn test_empty_sidecar_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("talk.mp4");
        std::fs::write(&media, b"").unwrap();
        std::fs::write(dir.path().join("talk.en.vtt"), "WEBVTT\n\n").unwrap();

        let orchestrator = orchestrator(dir.path());
        let tracks = orchestrator
            .fetch_captions(&metadata(&media.to_string_lossy(), SourceType::Local), &["en".to_string()])
            .await
            .unwrap();

        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn test_build_report_marks_missing_languages() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());

        let captions = vec![CaptionTrack {
            language: "en".to_string(),
            kind: CaptionKind::Manual,
            set: transcript(),
        }];
        let set = orchestrator.transcribe(Path::new("unused.mp3"), None).await.unwrap();
        let report = orchestrator
            .build_report(
                VideoInfo::new("talk.mp4", "talk", ComparisonMode::CaptionsVsTranscription),
                &["en".to_string(), "fr".to_string()],
                &captions,
                Some(&set),
            )
            .await
            .unwrap();

        let summary = report.summary();
        assert_eq!(summary.accuracy, Some(100.0));
        assert_eq!(report.outcomes["fr"], LanguageOutcome::NoCaptions);
    }

    #[tokio::test]
    async fn test_build_report_without_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());

        let report = orchestrator
            .build_report(
                VideoInfo::new("talk.mp4", "talk", ComparisonMode::ManualVsAutomatic),
                &["en".to_string()],
                &[],
                None,
            )
            .await
            .unwrap();
        assert_eq!(report.outcomes["en"], LanguageOutcome::NoTranscription);
    }

    #[tokio::test]
    async fn test_align_files_and_write_reports() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("authored.srt");
        let hypothesis = dir.path().join("auto.vtt");
        std::fs::write(
            &reference,
            "1\n00:00:00,000 --> 00:00:02,000\nHello and welcome\n\n2\n00:00:02,500 --> 00:00:04,000\nto the setup guide\n",
        )
        .unwrap();
        std::fs::write(
            &hypothesis,
            "WEBVTT\n\n00:00.100 --> 00:02.000\nhello and welcome\n\n00:02.600 --> 00:04.000\nto the set of guide\n",
        )
        .unwrap();

        let orchestrator = orchestrator(dir.path());
        let report = orchestrator.align_files(&reference, &hypothesis, "en").await.unwrap();
        let result = report.results().next().unwrap();
        assert_eq!(result.total_segments(), 2);
        assert_eq!(result.mismatch_count(), 0);

        let written = orchestrator.write_reports(&report, &dir.path().join("reports")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.exists()));
    }
}
