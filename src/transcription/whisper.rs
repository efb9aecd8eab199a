//! OpenAI Whisper transcription implementation.

use super::{
    into_transcript_set, language_code, resegment_words, ChunkTranscript, RawSegment, Transcriber,
    WhisperWord,
};
use crate::alignment::TranscriptSet;
use crate::audio::split_audio;
use crate::error::{CapcheckError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs, TimestampGranularity,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Timeout for a single Whisper request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// OpenAI client with a request timeout.
fn create_client(timeout: Duration) -> async_openai::Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default();
    async_openai::Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
    word_timestamps: bool,
    resegment_seconds: f64,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(model: &str, chunk_duration_seconds: u32, max_concurrent_chunks: usize) -> Self {
        Self {
            client: create_client(REQUEST_TIMEOUT),
            model: model.to_string(),
            chunk_duration_seconds,
            max_concurrent_chunks: max_concurrent_chunks.max(1),
            word_timestamps: false,
            resegment_seconds: 5.0,
        }
    }

    /// Request word-level timestamps and regroup them into segments of about
    /// `resegment_seconds`.
    pub fn with_word_timestamps(mut self, resegment_seconds: f64) -> Self {
        self.word_timestamps = true;
        self.resegment_seconds = resegment_seconds;
        self
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(&self, audio_path: &Path, language: Option<&str>) -> Result<ChunkTranscript> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if self.word_timestamps {
            request_builder.timestamp_granularities(vec![
                TimestampGranularity::Word,
                TimestampGranularity::Segment,
            ]);
        }
        if let Some(lang) = language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| CapcheckError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| CapcheckError::OpenAI(format!("Whisper API error: {}", e)))?;

        let segments: Vec<RawSegment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .map(|s| RawSegment::new(s.start as f64, s.end as f64, s.text.trim()))
                    .collect()
            })
            .unwrap_or_else(|| {
                // Fallback: one segment spanning the whole response
                vec![RawSegment::new(0.0, response.duration as f64, response.text.trim())]
            });

        let words: Vec<WhisperWord> = response
            .words
            .map(|ws| {
                ws.iter()
                    .map(|w| WhisperWord {
                        word: w.word.clone(),
                        start: w.start as f64,
                        end: w.end as f64,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if self.word_timestamps && words.is_empty() {
            warn!("No word-level timestamps returned, falling back to segment-level");
        }

        let language = Some(response.language).filter(|l| !l.trim().is_empty());
        debug!("Transcribed {} segments, {} words", segments.len(), words.len());

        Ok(ChunkTranscript {
            segments,
            words,
            language,
        })
    }

    /// Transcribe an audio file, splitting it into chunks if necessary.
    ///
    /// Chunks run concurrently; the first failure aborts the whole file.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_with_splitting(&self, audio_path: &Path, language: Option<&str>) -> Result<ChunkTranscript> {
        let temp_dir = tempfile::tempdir()?;
        let chunks = split_audio(audio_path, temp_dir.path(), self.chunk_duration_seconds).await?;

        if chunks.len() == 1 {
            return self.transcribe_single(audio_path, language).await;
        }

        let chunk_count = chunks.len();
        info!("Processing {} audio chunks with {}", chunk_count, self.model);

        let pb = ProgressBar::new(chunk_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Whisper   [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("█▓░"),
        );

        let mut results: Vec<(usize, ChunkTranscript)> = Vec::with_capacity(chunk_count);

        let mut stream = stream::iter(chunks.into_iter().enumerate())
            .map(|(idx, (chunk_path, time_offset))| async move {
                let result = self.transcribe_single(&chunk_path, language).await;
                (idx, time_offset, result)
            })
            .buffer_unordered(self.max_concurrent_chunks);

        while let Some((idx, time_offset, result)) = stream.next().await {
            pb.inc(1);
            match result {
                Ok(chunk) => results.push((idx, chunk.offset(time_offset))),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(CapcheckError::Transcription(format!(
                        "Chunk {} at {:.0}s failed: {}",
                        idx, time_offset, e
                    )));
                }
            }
        }

        pb.finish_and_clear();
        results.sort_by_key(|(idx, _)| *idx);

        let mut merged = ChunkTranscript::default();
        for (_, chunk) in results {
            merged.language = merged.language.or(chunk.language);
            merged.segments.extend(chunk.segments);
            merged.words.extend(chunk.words);
        }

        Ok(merged)
    }
}

impl Default for WhisperTranscriber {
    fn default() -> Self {
        Self::with_config("whisper-1", 600, 3)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<TranscriptSet> {
        if !is_api_key_configured() {
            return Err(CapcheckError::Config("OPENAI_API_KEY not set".to_string()));
        }
        let transcript = self.transcribe_with_splitting(audio_path, language).await?;

        let tag = match language {
            Some(lang) => lang.to_string(),
            None => transcript
                .language
                .as_deref()
                .map(language_code)
                .unwrap_or_else(|| "und".to_string()),
        };

        let raw = if self.word_timestamps && !transcript.words.is_empty() {
            resegment_words(&transcript.words, self.resegment_seconds)
        } else {
            transcript.segments
        };

        let set = into_transcript_set(&tag, raw)?;
        info!("Transcription has {} segments ({})", set.len(), tag);
        Ok(set)
    }
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.trim().is_empty())
}
