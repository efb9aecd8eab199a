//! Remote media: platform pages resolved by yt-dlp and direct media URLs.

use super::{
    detect_media_kind, extension_of, is_web_url, kind_for_extension, sanitize_id, MediaKind,
    MediaMetadata, MediaSource, SourceType,
};
use crate::error::{CapcheckError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};

/// Run `yt-dlp --dump-json` for a URL and return the info document.
pub(crate) async fn ytdlp_info(url: &str, extra_args: &[String]) -> Result<serde_json::Value> {
    let output = tokio::process::Command::new("yt-dlp")
        .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings"])
        .args(extra_args)
        .arg(url)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CapcheckError::ToolNotFound("yt-dlp".to_string())
            } else {
                CapcheckError::MediaSource(format!("Failed to run yt-dlp: {}", e))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CapcheckError::MediaNotFound(format!(
            "{} is unavailable: {}",
            url,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| CapcheckError::MediaSource(format!("yt-dlp returned no metadata for {}", url)))?;

    serde_json::from_str(line)
        .map_err(|e| CapcheckError::MediaSource(format!("Failed to parse yt-dlp output: {}", e)))
}

/// Pages and streams resolved through yt-dlp.
pub struct PlatformSource {
    video_id_regex: Regex,
    extra_args: Vec<String>,
}

impl PlatformSource {
    pub fn new() -> Self {
        // Bare YouTube video IDs are accepted as a shorthand.
        let video_id_regex = Regex::new(r"^([a-zA-Z0-9_-]{11})$").expect("Invalid regex");

        Self {
            video_id_regex,
            extra_args: Vec::new(),
        }
    }

    /// Extra yt-dlp arguments (cookies, user agent) used for metadata requests.
    pub fn with_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    fn to_url(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if is_web_url(input) {
            Some(input.to_string())
        } else if self.video_id_regex.is_match(input) {
            Some(format!("https://www.youtube.com/watch?v={}", input))
        } else {
            None
        }
    }

    fn metadata_from_info(url: &str, json: serde_json::Value) -> MediaMetadata {
        let raw_id = json["id"].as_str().unwrap_or(url);
        let title = json["title"].as_str().unwrap_or("Unknown Title").to_string();

        let kind = match detect_media_kind(url) {
            MediaKind::Streaming => MediaKind::Streaming,
            _ => MediaKind::Platform,
        };

        MediaMetadata {
            id: sanitize_id(raw_id),
            title,
            duration_seconds: json["duration"].as_f64(),
            kind,
            source_type: SourceType::Platform,
            source_url: json["webpage_url"].as_str().unwrap_or(url).to_string(),
            format: json["ext"].as_str().map(|s| s.to_string()),
            language: json["language"].as_str().map(|s| s.to_string()),
            channel: json["channel"]
                .as_str()
                .or_else(|| json["uploader"].as_str())
                .map(|s| s.to_string()),
            content_length: json["filesize"]
                .as_u64()
                .or_else(|| json["filesize_approx"].as_u64()),
            info: Some(json),
        }
    }
}

impl Default for PlatformSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSource for PlatformSource {
    fn source_type(&self) -> SourceType {
        SourceType::Platform
    }

    fn can_handle(&self, input: &str) -> bool {
        self.to_url(input).is_some()
    }

    fn extract_id(&self, input: &str) -> Option<String> {
        self.to_url(input)
    }

    async fn fetch_media(&self, id: &str) -> Result<MediaMetadata> {
        let url = self
            .to_url(id)
            .ok_or_else(|| CapcheckError::InvalidInput(format!("Not a URL: {}", id)))?;

        debug!("Resolving {} with yt-dlp", url);
        let json = ytdlp_info(&url, &self.extra_args).await?;
        Ok(Self::metadata_from_info(&url, json))
    }
}

/// A URL pointing straight at an audio or video file.
pub struct DirectUrlSource {
    client: reqwest::Client,
}

impl DirectUrlSource {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for DirectUrlSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSource for DirectUrlSource {
    fn source_type(&self) -> SourceType {
        SourceType::DirectUrl
    }

    fn can_handle(&self, input: &str) -> bool {
        is_web_url(input)
            && matches!(detect_media_kind(input), MediaKind::Audio | MediaKind::Video)
    }

    fn extract_id(&self, input: &str) -> Option<String> {
        self.can_handle(input).then(|| input.trim().to_string())
    }

    async fn fetch_media(&self, id: &str) -> Result<MediaMetadata> {
        let response = self.client.head(id).send().await?;

        if !response.status().is_success() {
            return Err(CapcheckError::MediaNotFound(format!(
                "{} returned HTTP {}",
                id,
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let content_length = response.content_length();

        if let Some(ct) = &content_type {
            if !(ct.starts_with("audio/") || ct.starts_with("video/") || ct.contains("octet-stream")) {
                warn!("{} reports content type {}; it may not be a media file", id, ct);
            }
        }

        let file_name = url::Url::parse(id)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next_back().map(|s| s.to_string()))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "media".to_string());
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| file_name.clone());

        let kind = extension_of(id)
            .map(|ext| kind_for_extension(&ext))
            .unwrap_or(MediaKind::Unknown);

        Ok(MediaMetadata {
            id: sanitize_id(&stem),
            title: file_name,
            duration_seconds: None,
            kind,
            source_type: SourceType::DirectUrl,
            source_url: id.to_string(),
            format: content_type.or_else(|| extension_of(id)),
            language: None,
            channel: None,
            content_length,
            info: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_inputs() {
        let source = PlatformSource::new();

        assert_eq!(
            source.extract_id("dQw4w9WgXcQ"),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            source.extract_id("https://www.dell.com/support/videos/6364425976112"),
            Some("https://www.dell.com/support/videos/6364425976112".to_string())
        );
        assert!(!source.can_handle("not-a-video-id"));
        assert!(!source.can_handle("/path/to/video.mp4"));
    }

    #[test]
    fn test_metadata_from_info() {
        let info = json!({
            "id": "abc123",
            "title": "Deploying the appliance",
            "duration": 312.5,
            "ext": "mp4",
            "language": "en",
            "uploader": "Support",
            "webpage_url": "https://example.com/watch/abc123",
            "subtitles": {}
        });

        let meta = PlatformSource::metadata_from_info("https://example.com/watch/abc123", info);
        assert_eq!(meta.id, "abc123");
        assert_eq!(meta.duration_seconds, Some(312.5));
        assert_eq!(meta.kind, MediaKind::Platform);
        assert_eq!(meta.channel.as_deref(), Some("Support"));
        assert_eq!(meta.language.as_deref(), Some("en"));
        assert!(meta.info.is_some());
    }

    #[test]
    fn test_streaming_kind_kept() {
        let meta = PlatformSource::metadata_from_info("https://cdn.example.com/master.m3u8", json!({}));
        assert_eq!(meta.kind, MediaKind::Streaming);
        assert_eq!(meta.title, "Unknown Title");
    }

    #[test]
    fn test_direct_url_handling() {
        let source = DirectUrlSource::new();
        assert!(source.can_handle("https://example.com/a/b/clip.mp4?x=1"));
        assert!(source.can_handle("http://example.com/podcast.mp3"));
        assert!(!source.can_handle("https://example.com/master.m3u8"));
        assert!(!source.can_handle("https://vimeo.com/123"));
        assert!(!source.can_handle("clip.mp4"));
    }
}
