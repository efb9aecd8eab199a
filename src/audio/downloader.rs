//! Audio acquisition and processing.
//!
//! Downloads audio through yt-dlp (trying each configured strategy in turn) or
//! plain HTTP, and uses ffmpeg/ffprobe to normalize and split audio files.

use super::strategies::DownloadStrategy;
use crate::error::{CapcheckError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Options shared by all yt-dlp download attempts.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub strategies: Vec<DownloadStrategy>,
    /// Browser to read cookies from (`--cookies-from-browser`).
    pub cookies_from_browser: Option<String>,
    /// Replaces each strategy's user agent when set.
    pub user_agent: Option<String>,
    /// Upper bound for a single strategy attempt.
    pub timeout: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            strategies: DownloadStrategy::defaults(),
            cookies_from_browser: None,
            user_agent: None,
            timeout: Duration::from_secs(600),
        }
    }
}

/// Downloads audio from a URL and saves it as MP3.
///
/// Strategies are tried in order; a failed attempt's partial files are
/// removed before the next one starts. If the target file already exists it
/// is returned without downloading.
#[instrument(skip(output_dir, options), fields(media_id = %media_id))]
pub async fn download_audio(
    url: &str,
    media_id: &str,
    output_dir: &Path,
    options: &DownloadOptions,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let target_path = output_dir.join(format!("{}.mp3", media_id));
    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    let total = options.strategies.len();
    let mut last_error = None;

    for (i, strategy) in options.strategies.iter().enumerate() {
        info!("Trying download strategy {}/{} ({})", i + 1, total, strategy.name);

        let attempt = tokio::time::timeout(
            options.timeout,
            run_strategy(url, media_id, output_dir, strategy, options),
        )
        .await
        .unwrap_or_else(|_| {
            Err(CapcheckError::AudioDownload(format!(
                "timed out after {}s",
                options.timeout.as_secs()
            )))
        });

        match attempt {
            Ok(path) => {
                info!("Audio downloaded with strategy {}", strategy.name);
                return Ok(path);
            }
            Err(e @ CapcheckError::ToolNotFound(_)) => return Err(e),
            Err(e) => {
                warn!("Download strategy {} failed: {}", strategy.name, e);
                remove_partial_files(output_dir, media_id);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        CapcheckError::AudioDownload("no download strategies configured".to_string())
    }))
}

async fn run_strategy(
    url: &str,
    media_id: &str,
    output_dir: &Path,
    strategy: &DownloadStrategy,
    options: &DownloadOptions,
) -> Result<PathBuf> {
    let template = output_dir.join(format!("{}.%(ext)s", media_id));
    let target_path = output_dir.join(format!("{}.mp3", media_id));

    let mut command = Command::new("yt-dlp");
    command
        .args(strategy.audio_args())
        .args(strategy.request_args(options.user_agent.as_deref()))
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--no-overwrites")
        .arg("--quiet")
        .arg("--no-warnings");
    if let Some(browser) = &options.cookies_from_browser {
        command.arg("--cookies-from-browser").arg(browser);
    }

    let result = command
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CapcheckError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(CapcheckError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CapcheckError::AudioDownload(format!("yt-dlp failed: {}", stderr.trim())));
    }

    // yt-dlp may leave another container behind if post-processing was skipped
    let downloaded = find_audio_file(output_dir, media_id)?;
    if downloaded != target_path {
        normalize_to_mp3(&downloaded, &target_path).await?;
        let _ = std::fs::remove_file(&downloaded);
    }

    Ok(target_path)
}

/// Locates a downloaded audio file by media ID.
fn find_audio_file(dir: &Path, media_id: &str) -> Result<PathBuf> {
    for ext in &["mp3", "opus", "m4a", "webm", "ogg", "mp4"] {
        let candidate = dir.join(format!("{}.{}", media_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let prefix = format!("{}.", media_id);
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CapcheckError::AudioDownload(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl") {
            return Ok(entry.path());
        }
    }

    Err(CapcheckError::AudioDownload("Audio file not found after download".into()))
}

/// Remove everything a failed attempt left behind for this media ID.
fn remove_partial_files(dir: &Path, media_id: &str) {
    let prefix = format!("{}.", media_id);
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            if let Err(e) = std::fs::remove_file(entry.path()) {
                debug!("Could not remove {:?}: {}", entry.path(), e);
            }
        }
    }
}

/// Stream a media file over HTTP and convert it to MP3.
#[instrument(skip(client, output_dir), fields(media_id = %media_id))]
pub async fn download_direct(
    client: &reqwest::Client,
    url: &str,
    media_id: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let target_path = output_dir.join(format!("{}.mp3", media_id));
    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    let mut response = client.get(url).send().await?.error_for_status()?;
    let download_path = output_dir.join(format!("{}.download", media_id));

    let pb = match response.content_length() {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {spinner:.green} Download  [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}")
                    .unwrap()
                    .progress_chars("█▓░"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let result: Result<()> = async {
        let mut file = tokio::fs::File::create(&download_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await?;
        Ok(())
    }
    .await;
    pb.finish_and_clear();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&download_path);
        return Err(e);
    }

    let converted = normalize_to_mp3(&download_path, &target_path).await;
    let _ = std::fs::remove_file(&download_path);
    converted?;

    Ok(target_path)
}

/// Prepare a local media file for transcription.
///
/// MP3 files are used in place; anything else is converted into `output_dir`.
pub async fn extract_local_audio(path: &Path, media_id: &str, output_dir: &Path) -> Result<PathBuf> {
    let is_mp3 = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));
    if is_mp3 {
        return Ok(path.to_path_buf());
    }

    std::fs::create_dir_all(output_dir)?;
    let target_path = output_dir.join(format!("{}.mp3", media_id));
    normalize_to_mp3(path, &target_path).await?;
    Ok(target_path)
}

/// Converts an audio or video file to MP3 using ffmpeg.
pub async fn normalize_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(CapcheckError::AudioDownload(format!("ffmpeg conversion failed: {}", err.trim())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CapcheckError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(CapcheckError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}

/// Segments a long audio file into smaller chunks for transcription.
///
/// Returns tuples of (chunk_path, offset_seconds).
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let chunk_len = f64::from(chunk_seconds.max(1));

    if total_duration <= chunk_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let segment_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let segment_len = chunk_len.min(total_duration - offset);

        extract_segment(source, &segment_path, offset, segment_len).await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push((segment_path, offset));

        offset += chunk_len;
        idx += 1;
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

/// Extracts a time segment from an audio file.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    // Stream copy first; re-encode if the container does not allow it.
    let copy_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Ok(status) = copy_result {
        if status.success() && dest.exists() {
            return Ok(());
        }
    }

    warn!("Stream copy failed, re-encoding segment");

    let encode_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match encode_result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(CapcheckError::AudioDownload(format!("Segment extraction failed: {}", err.trim())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CapcheckError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(CapcheckError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}

/// Queries the duration of an audio file using ffprobe with JSON output.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CapcheckError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(CapcheckError::AudioDownload(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(CapcheckError::AudioDownload("ffprobe returned error".into()));
    }

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|_| CapcheckError::AudioDownload("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| CapcheckError::AudioDownload("Could not determine audio duration".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_audio_file_prefers_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vid.m4a"), b"x").unwrap();
        std::fs::write(dir.path().join("vid.info.json"), b"{}").unwrap();

        let found = find_audio_file(dir.path(), "vid").unwrap();
        assert_eq!(found, dir.path().join("vid.m4a"));
    }

    #[test]
    fn test_find_audio_file_skips_partials() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vid.webm.part"), b"x").unwrap();

        assert!(find_audio_file(dir.path(), "vid").is_err());
    }

    #[test]
    fn test_remove_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vid.webm.part"), b"x").unwrap();
        std::fs::write(dir.path().join("vid.m4a"), b"x").unwrap();
        std::fs::write(dir.path().join("other.mp3"), b"x").unwrap();

        remove_partial_files(dir.path(), "vid");

        assert!(!dir.path().join("vid.webm.part").exists());
        assert!(!dir.path().join("vid.m4a").exists());
        assert!(dir.path().join("other.mp3").exists());
    }

    #[tokio::test]
    async fn test_cached_audio_returned() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("vid.mp3");
        std::fs::write(&cached, b"x").unwrap();

        let options = DownloadOptions {
            strategies: Vec::new(),
            ..DownloadOptions::default()
        };
        let path = download_audio("https://example.com/v", "vid", dir.path(), &options)
            .await
            .unwrap();
        assert_eq!(path, cached);
    }

    #[tokio::test]
    async fn test_no_strategies_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = DownloadOptions {
            strategies: Vec::new(),
            ..DownloadOptions::default()
        };
        let err = download_audio("https://example.com/v", "vid", dir.path(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, CapcheckError::AudioDownload(_)));
    }

    #[tokio::test]
    async fn test_local_mp3_used_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.MP3");
        std::fs::write(&source, b"x").unwrap();

        let path = extract_local_audio(&source, "talk", dir.path()).await.unwrap();
        assert_eq!(path, source);
    }
}
