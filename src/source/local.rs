//! Local audio and video files.

use super::{
    is_web_url, kind_for_extension, sanitize_id, MediaKind, MediaMetadata, MediaSource, SourceType,
};
use crate::error::{CapcheckError, Result};
use async_trait::async_trait;
use std::path::Path;

/// Local file source for audio and video files.
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }

    fn media_kind(path: &Path) -> MediaKind {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(kind_for_extension)
            .unwrap_or(MediaKind::Unknown)
    }

    /// Check if path is a supported audio or video file.
    fn is_media_file(path: &Path) -> bool {
        matches!(Self::media_kind(path), MediaKind::Audio | MediaKind::Video)
    }

    /// Duration, embedded title and container name from ffprobe.
    async fn probe(path: &Path) -> Result<(Option<f64>, Option<String>, Option<String>)> {
        let output = tokio::process::Command::new("ffprobe")
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CapcheckError::ToolNotFound("ffprobe".to_string())
                } else {
                    CapcheckError::MediaSource(format!("Failed to run ffprobe: {}", e))
                }
            })?;

        if !output.status.success() {
            // Metadata is optional; the file may still decode.
            return Ok((None, None, None));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap_or_default();

        let duration = json["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok());
        let title = json["format"]["tags"]["title"].as_str().map(|s| s.to_string());
        let format = json["format"]["format_name"].as_str().map(|s| s.to_string());

        Ok((duration, title, format))
    }
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSource for LocalSource {
    fn source_type(&self) -> SourceType {
        SourceType::Local
    }

    fn can_handle(&self, input: &str) -> bool {
        if is_web_url(input) {
            return false;
        }
        let path = Path::new(input);
        path.is_file() || Self::is_media_file(path)
    }

    fn extract_id(&self, input: &str) -> Option<String> {
        self.can_handle(input).then(|| input.to_string())
    }

    async fn fetch_media(&self, id: &str) -> Result<MediaMetadata> {
        let path = Path::new(id);

        if !path.exists() {
            return Err(CapcheckError::MediaNotFound(format!("File not found: {}", id)));
        }

        let kind = Self::media_kind(path);
        if !matches!(kind, MediaKind::Audio | MediaKind::Video) {
            return Err(CapcheckError::InvalidInput(format!(
                "Not a recognized audio or video file: {}",
                id
            )));
        }

        let (duration, embedded_title, container) = Self::probe(path).await?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("media")
            .to_string();
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        Ok(MediaMetadata {
            id: format!("local_{}", sanitize_id(&stem)),
            title: embedded_title.unwrap_or(stem),
            duration_seconds: duration,
            kind,
            source_type: SourceType::Local,
            source_url: canonical.to_string_lossy().to_string(),
            format: container.or_else(|| {
                path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase())
            }),
            language: None,
            channel: None,
            content_length: std::fs::metadata(path).ok().map(|m| m.len()),
            info: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_media_file() {
        assert!(LocalSource::is_media_file(Path::new("video.mp4")));
        assert!(LocalSource::is_media_file(Path::new("audio.WAV")));
        assert!(LocalSource::is_media_file(Path::new("/path/to/audio.flac")));
        assert!(!LocalSource::is_media_file(Path::new("playlist.m3u8")));
        assert!(!LocalSource::is_media_file(Path::new("document.pdf")));
    }

    #[test]
    fn test_urls_not_local() {
        let source = LocalSource::new();
        assert!(!source.can_handle("https://example.com/clip.mp4"));
        assert!(source.can_handle("clip.mp4"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = LocalSource::new()
            .fetch_media("/definitely/not/here.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, CapcheckError::MediaNotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_non_media_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let err = LocalSource::new()
            .fetch_media(path.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CapcheckError::InvalidInput(_)));
    }
}
