//! Audio download and processing.

mod downloader;
mod strategies;

pub use downloader::{
    download_audio, download_direct, extract_local_audio, normalize_to_mp3, probe_duration,
    split_audio, DownloadOptions,
};
pub use strategies::{
    resolve_user_agent, DownloadStrategy, ANDROID_CHROME_USER_AGENT, CHROME_USER_AGENT,
    FIREFOX_USER_AGENT, IOS_SAFARI_USER_AGENT, IOS_YOUTUBE_USER_AGENT, SAFARI_USER_AGENT,
};
