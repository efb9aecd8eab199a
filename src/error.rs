//! Error types for capcheck.

use thiserror::Error;

/// Library-level error type for capcheck operations.
#[derive(Error, Debug)]
pub enum CapcheckError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid alignment thresholds: {0}")]
    ThresholdConfiguration(String),

    #[error("Malformed segment {index} in {language} transcript: {reason}")]
    MalformedSegment {
        language: String,
        index: usize,
        reason: String,
    },

    #[error("Media source error: {0}")]
    MediaSource(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Caption extraction failed: {0}")]
    CaptionExtraction(String),

    #[error("Caption parse error: {0}")]
    CaptionParse(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Media not found: {0}")]
    MediaNotFound(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type alias for capcheck operations.
pub type Result<T> = std::result::Result<T, CapcheckError>;
