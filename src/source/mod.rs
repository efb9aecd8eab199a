//! Media input resolution.
//!
//! Classifies an input (local path, direct media URL, streaming URL or a page
//! on a platform yt-dlp understands) and fetches its metadata.

mod local;
mod remote;

pub use local::LocalSource;
pub use remote::{DirectUrlSource, PlatformSource};
pub(crate) use remote::ytdlp_info;

use crate::error::{CapcheckError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Audio file extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "m4a", "aac", "ogg", "flac", "wma", "opus", "aiff", "au", "ra", "amr", "ac3",
    "dts", "ape", "mka",
];

/// Video file extensions (audio is extracted).
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "webm", "flv", "wmv", "m4v", "3gp", "ogv", "ts", "mts", "m2ts",
    "vob", "asf", "rm", "rmvb", "divx", "xvid", "f4v", "mpg", "mpeg", "m2v",
];

/// Adaptive streaming manifests.
pub const STREAMING_EXTENSIONS: &[&str] = &["m3u8", "mpd", "ism", "f4m"];

/// What an input points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Streaming,
    /// A page on a video platform.
    Platform,
    Unknown,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Streaming => write!(f, "streaming"),
            MediaKind::Platform => write!(f, "platform"),
            MediaKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Where the media comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Resolved through yt-dlp.
    Platform,
    /// Plain HTTP download of a media file.
    DirectUrl,
    Local,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Platform => write!(f, "platform"),
            SourceType::DirectUrl => write!(f, "direct url"),
            SourceType::Local => write!(f, "local"),
        }
    }
}

/// Metadata about a media asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Identifier safe for use in file names.
    pub id: String,
    pub title: String,
    /// Duration in seconds (if known).
    pub duration_seconds: Option<f64>,
    pub kind: MediaKind,
    pub source_type: SourceType,
    /// URL or canonical path of the media.
    pub source_url: String,
    /// Container or content type (e.g. "mp4", "audio/mpeg").
    pub format: Option<String>,
    /// Spoken language reported by the platform.
    pub language: Option<String>,
    pub channel: Option<String>,
    /// Size in bytes (direct downloads).
    pub content_length: Option<u64>,
    /// Raw yt-dlp info document, used for caption discovery.
    #[serde(skip)]
    pub info: Option<serde_json::Value>,
}

impl MediaMetadata {
    /// Format seconds as MM:SS or HH:MM:SS.
    pub fn format_timestamp(seconds: f64) -> String {
        let total_seconds = seconds.max(0.0) as u32;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let secs = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{:02}:{:02}", minutes, secs)
        }
    }
}

/// A provider that can resolve some class of inputs.
#[async_trait]
pub trait MediaSource: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Check if this source can handle the given input.
    fn can_handle(&self, input: &str) -> bool;

    /// Extract the locator this source works with (URL or path).
    fn extract_id(&self, input: &str) -> Option<String>;

    /// Fetch metadata for the locator returned by [`MediaSource::extract_id`].
    async fn fetch_media(&self, id: &str) -> Result<MediaMetadata>;
}

/// Lowercased extension of a path or URL path.
fn extension_of(input: &str) -> Option<String> {
    let path = match url::Url::parse(input) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url.path().to_string(),
        _ => input.to_string(),
    };
    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Media kind implied by a file extension.
pub fn kind_for_extension(ext: &str) -> MediaKind {
    let ext = ext.trim_start_matches('.').to_lowercase();
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Audio
    } else if STREAMING_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Streaming
    } else {
        MediaKind::Unknown
    }
}

/// Classify an input by extension, falling back to platform for web URLs.
pub fn detect_media_kind(input: &str) -> MediaKind {
    let by_extension = extension_of(input)
        .map(|ext| kind_for_extension(&ext))
        .unwrap_or(MediaKind::Unknown);

    if by_extension != MediaKind::Unknown {
        by_extension
    } else if is_web_url(input) {
        MediaKind::Platform
    } else {
        MediaKind::Unknown
    }
}

/// Whether the input is an http(s) URL.
pub fn is_web_url(input: &str) -> bool {
    url::Url::parse(input.trim())
        .map(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(false)
}

/// Make an identifier safe for file names.
pub fn sanitize_id(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "media".to_string()
    } else {
        trimmed.chars().take(80).collect()
    }
}

/// Detect the appropriate source for the given input.
pub fn detect_source(input: &str) -> Option<Box<dyn MediaSource>> {
    let local = LocalSource::new();
    if local.can_handle(input) {
        return Some(Box::new(local));
    }

    let direct = DirectUrlSource::new();
    if direct.can_handle(input) {
        return Some(Box::new(direct));
    }

    let platform = PlatformSource::new();
    if platform.can_handle(input) {
        return Some(Box::new(platform));
    }

    None
}

/// Parse input and return the appropriate source and locator.
pub fn parse_input(input: &str) -> Result<(Box<dyn MediaSource>, String)> {
    detect_source(input)
        .and_then(|source| source.extract_id(input).map(|id| (source, id)))
        .ok_or_else(|| {
            CapcheckError::InvalidInput(format!(
                "Not a media file, media URL or supported video page: {}",
                input
            ))
        })
}
