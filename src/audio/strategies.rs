//! yt-dlp download strategies.
//!
//! Platforms throttle or block some clients, so audio downloads walk an
//! ordered list of strategies, each a different format selector and client
//! identity, until one succeeds.

use crate::error::{CapcheckError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const FIREFOX_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0";
pub const SAFARI_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";
pub const IOS_SAFARI_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
pub const ANDROID_CHROME_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; SM-G973F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
pub const ANDROID_LEGACY_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; SM-G981B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.162 Mobile Safari/537.36";
pub const IOS_YOUTUBE_USER_AGENT: &str =
    "com.google.ios.youtube/19.29.1 (iPhone16,2; U; CPU iOS 17_5_1 like Mac OS X;)";

/// Resolve a user agent preset name, or return the value unchanged.
pub fn resolve_user_agent(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "chrome" => CHROME_USER_AGENT.to_string(),
        "firefox" => FIREFOX_USER_AGENT.to_string(),
        "safari" => SAFARI_USER_AGENT.to_string(),
        "ios" | "iphone" => IOS_SAFARI_USER_AGENT.to_string(),
        "android" => ANDROID_CHROME_USER_AGENT.to_string(),
        _ => value.trim().to_string(),
    }
}

/// One way of asking yt-dlp for audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadStrategy {
    pub name: String,
    /// yt-dlp format selector.
    pub format: String,
    /// Target mp3 bitrate in kbps.
    pub audio_quality: u32,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// YouTube player clients to impersonate.
    #[serde(default)]
    pub player_clients: Vec<String>,
    #[serde(default)]
    pub player_skip: Vec<String>,
}

impl DownloadStrategy {
    /// The built-in strategies, in the order they are tried.
    pub fn defaults() -> Vec<Self> {
        let browser_headers: BTreeMap<String, String> = [
            ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            ("Accept-Language", "en-US,en;q=0.5"),
            ("Accept-Encoding", "gzip, deflate"),
            ("Connection", "keep-alive"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        vec![
            Self {
                name: "standard".to_string(),
                format: "bestaudio/best".to_string(),
                audio_quality: 192,
                user_agent: Some(CHROME_USER_AGENT.to_string()),
                headers: browser_headers,
                player_clients: Vec::new(),
                player_skip: Vec::new(),
            },
            Self {
                name: "m4a-android-web".to_string(),
                format: "bestaudio[ext=m4a]/bestaudio/best[height<=480]".to_string(),
                audio_quality: 128,
                user_agent: Some(CHROME_USER_AGENT.to_string()),
                headers: BTreeMap::new(),
                player_clients: vec!["android".to_string(), "web".to_string()],
                player_skip: vec!["configs".to_string(), "webpage".to_string()],
            },
            Self {
                name: "lowest-quality".to_string(),
                format: "worst[ext=mp4]/worst".to_string(),
                audio_quality: 96,
                user_agent: Some(ANDROID_LEGACY_USER_AGENT.to_string()),
                headers: BTreeMap::new(),
                player_clients: vec!["android".to_string()],
                player_skip: Vec::new(),
            },
            Self {
                name: "ios-client".to_string(),
                format: "bestaudio/best".to_string(),
                audio_quality: 128,
                user_agent: Some(IOS_YOUTUBE_USER_AGENT.to_string()),
                headers: BTreeMap::new(),
                player_clients: vec!["ios".to_string()],
                player_skip: Vec::new(),
            },
        ]
    }

    /// Select built-in strategies by name, in the given order.
    ///
    /// An empty list selects all of them.
    pub fn by_names(names: &[String]) -> Result<Vec<Self>> {
        let defaults = Self::defaults();
        if names.is_empty() {
            return Ok(defaults);
        }

        names
            .iter()
            .map(|name| {
                defaults
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
                    .cloned()
                    .ok_or_else(|| {
                        let known: Vec<&str> = defaults.iter().map(|s| s.name.as_str()).collect();
                        CapcheckError::Config(format!(
                            "Unknown download strategy '{}'. Known strategies: {}",
                            name,
                            known.join(", ")
                        ))
                    })
            })
            .collect()
    }

    /// Client identity arguments (user agent, headers, extractor args).
    pub fn request_args(&self, user_agent_override: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(ua) = user_agent_override.or(self.user_agent.as_deref()) {
            args.push("--user-agent".to_string());
            args.push(ua.to_string());
        }
        for (name, value) in &self.headers {
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }

        let mut youtube_args = Vec::new();
        if !self.player_clients.is_empty() {
            youtube_args.push(format!("player_client={}", self.player_clients.join(",")));
        }
        if !self.player_skip.is_empty() {
            youtube_args.push(format!("player_skip={}", self.player_skip.join(",")));
        }
        if !youtube_args.is_empty() {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:{}", youtube_args.join(";")));
        }

        args
    }

    /// Format selection and mp3 extraction arguments.
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "--format".to_string(),
            self.format.clone(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            format!("{}K", self.audio_quality),
        ]
    }
}
