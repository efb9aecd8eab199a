//! Caption discovery and download.

use super::parse::{detect_format, parse_captions, playlist_urls, BodyFormat};
use super::{same_primary_language, CaptionKind, CaptionTrack};
use crate::alignment::TranscriptSet;
use crate::audio::CHROME_USER_AGENT;
use crate::error::{CapcheckError, Result};
use crate::source::ytdlp_info;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// One way of asking a platform for its caption list.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStrategy {
    pub name: String,
    pub user_agent: Option<String>,
    /// Whether authored captions are considered (automatic ones always are).
    pub include_manual: bool,
}

impl CaptionStrategy {
    /// The built-in strategies, in the order they are tried.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "standard".to_string(),
                user_agent: None,
                include_manual: true,
            },
            Self {
                name: "desktop-user-agent".to_string(),
                user_agent: Some(CHROME_USER_AGENT.to_string()),
                include_manual: true,
            },
            Self {
                name: "automatic-only".to_string(),
                user_agent: Some(CHROME_USER_AGENT.to_string()),
                include_manual: false,
            },
        ]
    }
}

/// A caption track advertised by the platform but not yet downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTrack {
    pub language: String,
    pub kind: CaptionKind,
    pub url: String,
    pub ext: String,
}

impl RemoteTrack {
    /// Tracks listed in a yt-dlp info document.
    pub fn from_info(info: &Value, include_manual: bool) -> Vec<RemoteTrack> {
        let mut tracks = Vec::new();
        if include_manual {
            tracks.extend(Self::from_map(&info["subtitles"], CaptionKind::Manual));
        }
        tracks.extend(Self::from_map(&info["automatic_captions"], CaptionKind::Automatic));
        tracks
    }

    fn from_map(map: &Value, kind: CaptionKind) -> Vec<RemoteTrack> {
        let Some(map) = map.as_object() else {
            return Vec::new();
        };

        let mut tracks: Vec<RemoteTrack> = map
            .iter()
            .filter(|(language, _)| language.as_str() != "live_chat")
            .filter_map(|(language, entries)| {
                let entries = entries.as_array()?;
                let entry = ["vtt", "srt"]
                    .iter()
                    .find_map(|ext| entries.iter().find(|e| e["ext"].as_str() == Some(*ext)))
                    .or_else(|| entries.first())?;

                Some(RemoteTrack {
                    language: language.clone(),
                    kind,
                    url: entry["url"].as_str()?.to_string(),
                    ext: entry["ext"].as_str().unwrap_or("vtt").to_string(),
                })
            })
            .collect();
        tracks.sort_by(|a, b| a.language.cmp(&b.language));
        tracks
    }
}

/// Pick at most one track per requested language and kind.
///
/// An exact tag wins over a primary-subtag match; among related tags the
/// alphabetically first is taken.
pub fn select_tracks(available: &[RemoteTrack], languages: &[String]) -> Vec<RemoteTrack> {
    let mut selected: Vec<RemoteTrack> = Vec::new();

    for language in languages {
        for kind in [CaptionKind::Manual, CaptionKind::Automatic] {
            let candidates = available.iter().filter(|t| t.kind == kind);
            let pick = candidates
                .clone()
                .find(|t| t.language.eq_ignore_ascii_case(language))
                .or_else(|| candidates.clone().find(|t| same_primary_language(&t.language, language)));

            if let Some(track) = pick {
                if !selected.contains(track) {
                    selected.push(track.clone());
                }
            }
        }
    }

    selected
}

/// Downloads and parses platform caption tracks.
pub struct CaptionExtractor {
    client: reqwest::Client,
    strategies: Vec<CaptionStrategy>,
    cookies_from_browser: Option<String>,
    user_agent: Option<String>,
}

impl CaptionExtractor {
    pub fn new(
        strategies: Vec<CaptionStrategy>,
        cookies_from_browser: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            strategies,
            cookies_from_browser,
            user_agent,
        }
    }

    fn strategy_args(&self, strategy: &CaptionStrategy) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ua) = self.user_agent.as_deref().or(strategy.user_agent.as_deref()) {
            args.push("--user-agent".to_string());
            args.push(ua.to_string());
        }
        if let Some(browser) = &self.cookies_from_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        }
        args
    }

    /// Fetch caption tracks for the requested languages.
    ///
    /// Strategies are tried in order until one yields a track. Returns an
    /// empty list when the platform has no captions for these languages; an
    /// error only when every strategy failed to reach the platform.
    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str, languages: &[String]) -> Result<Vec<CaptionTrack>> {
        let total = self.strategies.len();
        let mut last_error = None;
        let mut reached = false;

        for (i, strategy) in self.strategies.iter().enumerate() {
            info!("Trying caption strategy {}/{} ({})", i + 1, total, strategy.name);

            let info = match ytdlp_info(url, &self.strategy_args(strategy)).await {
                Ok(info) => info,
                Err(e @ CapcheckError::ToolNotFound(_)) => return Err(e),
                Err(e) => {
                    warn!("Caption strategy {} failed: {}", strategy.name, e);
                    last_error = Some(e);
                    continue;
                }
            };
            reached = true;

            let tracks = self.tracks_from_info(&info, languages, strategy.include_manual).await;
            if !tracks.is_empty() {
                return Ok(tracks);
            }
        }

        match last_error {
            Some(e) if !reached => Err(CapcheckError::CaptionExtraction(e.to_string())),
            _ => {
                info!("No captions found for {}", languages.join(", "));
                Ok(Vec::new())
            }
        }
    }

    /// Download the requested languages' tracks listed in an info document.
    pub async fn tracks_from_info(
        &self,
        info: &Value,
        languages: &[String],
        include_manual: bool,
    ) -> Vec<CaptionTrack> {
        let available = RemoteTrack::from_info(info, include_manual);
        debug!("Platform lists {} caption tracks", available.len());

        let mut tracks = Vec::new();
        for remote in select_tracks(&available, languages) {
            match self.fetch_track(&remote).await {
                Ok(track) if track.set.is_empty() => {
                    warn!("Skipping {} {} captions: no cues", track.language, track.kind);
                }
                Ok(track) => {
                    info!("Found {} {} captions ({} cues)", track.language, track.kind, track.set.len());
                    tracks.push(track);
                }
                Err(e) => warn!("Could not load {} {} captions: {}", remote.language, remote.kind, e),
            }
        }
        tracks
    }

    /// Download and parse one advertised track.
    pub async fn fetch_track(&self, remote: &RemoteTrack) -> Result<CaptionTrack> {
        let body = self.fetch_text(&remote.url).await?;
        let set = self.parse_body(&body, &remote.url, &remote.language).await?;
        Ok(CaptionTrack {
            language: remote.language.clone(),
            kind: remote.kind,
            set,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(ua) = &self.user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua);
        }
        Ok(request.send().await?.error_for_status()?.text().await?)
    }

    /// Parse a caption body, following HLS playlists to their WebVTT fragments.
    async fn parse_body(&self, body: &str, base_url: &str, language: &str) -> Result<TranscriptSet> {
        if detect_format(body) != Some(BodyFormat::Playlist) {
            return parse_captions(body, language);
        }

        let base = url::Url::parse(base_url).ok();
        let mut segments = Vec::new();

        for fragment in playlist_urls(body) {
            let resolved = match base.as_ref().and_then(|b| b.join(&fragment).ok()) {
                Some(u) => u.to_string(),
                None => fragment.clone(),
            };

            let parsed = async {
                let text = self.fetch_text(&resolved).await?;
                parse_captions(&text, language)
            }
            .await;

            match parsed {
                Ok(set) => segments.extend(set.into_segments()),
                Err(e) => warn!("Could not parse caption fragment {}: {}", resolved, e),
            }
        }

        TranscriptSet::from_unsorted(language, segments)
    }
}

/// Caption files next to a local media file.
///
/// Matches `<stem>.<lang>.vtt|srt` and the untagged `<stem>.vtt|srt`, which is
/// assigned `default_language`. Results are sorted by path.
pub fn discover_sidecars(media: &Path, default_language: &str) -> Vec<(PathBuf, String)> {
    let Some(stem) = media.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let dir = match media.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(rest) = name.strip_prefix(stem).and_then(|r| r.strip_prefix('.')) else {
            continue;
        };

        for ext in ["vtt", "srt"] {
            let Some(middle) = rest.strip_suffix(ext) else {
                continue;
            };
            if middle.is_empty() {
                found.push((entry.path(), default_language.to_string()));
            } else if let Some(tag) = middle.strip_suffix('.') {
                if !tag.is_empty() && !tag.contains('.') {
                    found.push((entry.path(), tag.to_string()));
                }
            }
        }
    }

    found.sort();
    found
}

/// Load a caption file from disk.
pub async fn load_caption_file(path: &Path, language: &str, kind: CaptionKind) -> Result<CaptionTrack> {
    let body = tokio::fs::read_to_string(path).await.map_err(|e| {
        CapcheckError::CaptionExtraction(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let set = parse_captions(&body, language)?;
    Ok(CaptionTrack {
        language: language.to_string(),
        kind,
        set,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info() -> Value {
        json!({
            "subtitles": {
                "en": [
                    {"ext": "json3", "url": "https://x/en.json3"},
                    {"ext": "vtt", "url": "https://x/en.vtt"}
                ],
                "live_chat": [{"ext": "json", "url": "https://x/chat"}]
            },
            "automatic_captions": {
                "en-US": [{"ext": "srv3", "url": "https://x/a-en-us.srv3"}, {"ext": "srt", "url": "https://x/a-en-us.srt"}],
                "en": [{"ext": "vtt", "url": "https://x/a-en.vtt"}],
                "es": [{"ext": "vtt", "url": "https://x/a-es.vtt"}]
            }
        })
    }

    #[test]
    fn test_from_info_prefers_vtt() {
        let tracks = RemoteTrack::from_info(&info(), true);
        let manual: Vec<_> = tracks.iter().filter(|t| t.kind == CaptionKind::Manual).collect();

        assert_eq!(manual.len(), 1);
        assert_eq!(manual[0].url, "https://x/en.vtt");

        let en_us = tracks.iter().find(|t| t.language == "en-US").unwrap();
        assert_eq!(en_us.ext, "srt");
    }

    #[test]
    fn test_automatic_only() {
        let tracks = RemoteTrack::from_info(&info(), false);
        assert!(tracks.iter().all(|t| t.kind == CaptionKind::Automatic));
        assert_eq!(tracks.len(), 3);
    }

    #[test]
    fn test_select_tracks() {
        let available = RemoteTrack::from_info(&info(), true);

        let picked = select_tracks(&available, &["en".to_string()]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].kind, CaptionKind::Manual);
        assert_eq!(picked[1].url, "https://x/a-en.vtt");

        let picked = select_tracks(&available, &["es-MX".to_string(), "fr".to_string()]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].language, "es");
    }

    #[test]
    fn test_default_strategies() {
        let strategies = CaptionStrategy::defaults();
        assert_eq!(strategies.len(), 3);
        assert!(strategies[0].user_agent.is_none());
        assert!(!strategies[2].include_manual);
    }

    #[test]
    fn test_strategy_args() {
        let extractor = CaptionExtractor::new(Vec::new(), Some("firefox".to_string()), None);
        let args = extractor.strategy_args(&CaptionStrategy::defaults()[1]);
        assert_eq!(
            args,
            vec!["--user-agent", CHROME_USER_AGENT, "--cookies-from-browser", "firefox"]
        );
    }

    #[test]
    fn test_discover_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["talk.mp4", "talk.vtt", "talk.es.srt", "talk.en-US.vtt", "talk2.en.vtt", "talk.notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let found = discover_sidecars(&dir.path().join("talk.mp4"), "en");
        let tags: Vec<&str> = found.iter().map(|(_, tag)| tag.as_str()).collect();
        assert_eq!(tags, vec!["en-US", "es", "en"]);
    }

    #[tokio::test]
    async fn test_load_caption_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.srt");
        std::fs::write(&path, "1\n00:00:01,000 --> 00:00:02,000\nHi there\n").unwrap();

        let track = load_caption_file(&path, "en", CaptionKind::Manual).await.unwrap();
        assert_eq!(track.set.len(), 1);
        assert_eq!(track.set.segments()[0].text, "Hi there");

        let missing = load_caption_file(&dir.path().join("nope.vtt"), "en", CaptionKind::Manual).await;
        assert!(matches!(missing, Err(CapcheckError::CaptionExtraction(_))));
    }

    #[tokio::test]
    async fn test_parse_body_plain_vtt() {
        let extractor = CaptionExtractor::new(CaptionStrategy::defaults(), None, None);
        let set = extractor
            .parse_body("WEBVTT\n\n00:00.000 --> 00:01.000\nhey\n", "https://x/a.vtt", "en")
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
    }
}
