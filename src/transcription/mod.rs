//! Speech-to-text transcription.
//!
//! The model is a black box behind [`Transcriber`]; the Whisper
//! implementation splits long audio, transcribes chunks concurrently and
//! returns a validated [`TranscriptSet`].

mod models;
mod whisper;

pub use models::{
    into_transcript_set, language_code, resegment_words, ChunkTranscript, RawSegment, WhisperWord,
};
pub use whisper::{is_api_key_configured, WhisperTranscriber};

use crate::alignment::TranscriptSet;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file.
    ///
    /// With `language` unset the model detects it; the returned set carries
    /// the language used.
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<TranscriptSet>;
}
