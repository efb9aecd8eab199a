//! Captions command: list or download the caption tracks of a video.

use crate::captions::{format_captions, CaptionFormat, CaptionKind, CaptionTrack, RemoteTrack};
use crate::cli::preflight::{self, Operation};
use crate::cli::{AcquisitionArgs, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::source::{sanitize_id, SourceType};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the captions command.
pub async fn run_captions(
    input: &str,
    languages: &[String],
    download: bool,
    format: Option<&str>,
    output_dir: &str,
    acquisition: &AcquisitionArgs,
    mut settings: Settings,
) -> Result<()> {
    acquisition.apply(&mut settings);
    let format: CaptionFormat = format
        .unwrap_or(settings.captions.save_format.as_str())
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    if !Path::new(input).exists() {
        if let Err(e) = preflight::check(Operation::Captions) {
            Output::error(&format!("{}", e));
            Output::info("Run 'capcheck doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let orchestrator = Orchestrator::new(settings)?;
    let languages = orchestrator.resolve_languages(languages);

    let spinner = Output::spinner("Resolving media...");
    let metadata = orchestrator.resolve(input).await;
    spinner.finish_and_clear();
    let metadata = metadata?;

    Output::header("Media");
    Output::media_info(
        &metadata.title,
        &metadata.id,
        &metadata.kind.to_string(),
        metadata.duration_seconds,
    );

    if let Some(info) = &metadata.info {
        let listed = RemoteTrack::from_info(info, true);
        Output::kv("Manual captions", &language_list(&listed, CaptionKind::Manual));
        Output::kv("Automatic captions", &language_list(&listed, CaptionKind::Automatic));
    }

    let spinner = Output::spinner(&format!("Fetching captions ({})...", languages.join(", ")));
    let tracks = orchestrator.fetch_captions(&metadata, &languages).await;
    spinner.finish_and_clear();
    let tracks = tracks?;

    if tracks.is_empty() {
        Output::warning(&format!("No captions found for {}", languages.join(", ")));
        if metadata.source_type == SourceType::Local {
            Output::info("Place a sidecar next to the media (e.g. talk.en.vtt) or pass --captions to compare.");
        }
        return Ok(());
    }

    Output::header("Caption tracks");
    for track in &tracks {
        Output::track_info(
            &track.language,
            &track.kind.to_string(),
            track.set.len(),
            track.set.duration(),
            track.set.segments().first().map(|s| s.text.as_str()),
        );
    }

    if download {
        println!();
        let dir = Settings::expand_path(output_dir);
        for track in &tracks {
            let path = write_track(track, &metadata.id, format, &dir)?;
            Output::success(&format!("Saved {}", path.display()));
        }
    }

    Ok(())
}

/// Comma-separated languages of one kind, or "none".
fn language_list(tracks: &[RemoteTrack], kind: CaptionKind) -> String {
    let languages: Vec<&str> = tracks
        .iter()
        .filter(|t| t.kind == kind)
        .map(|t| t.language.as_str())
        .collect();
    if languages.is_empty() {
        "none".to_string()
    } else {
        languages.join(", ")
    }
}

/// Write one track as `<id>.<language>.<kind>.<ext>`.
fn write_track(track: &CaptionTrack, media_id: &str, format: CaptionFormat, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "{}.{}.{}.{}",
        sanitize_id(media_id),
        track.language,
        track.kind,
        format.extension()
    ));
    std::fs::write(&path, format_captions(&track.set, format))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{Segment, TranscriptSet};

    #[test]
    fn test_language_list() {
        let info = serde_json::json!({
            "subtitles": {
                "en": [{"ext": "vtt", "url": "https://example.com/en.vtt"}]
            },
            "automatic_captions": {
                "de": [{"ext": "vtt", "url": "https://example.com/de.vtt"}],
                "en": [{"ext": "srt", "url": "https://example.com/en.srt"}]
            }
        });
        let tracks = RemoteTrack::from_info(&info, true);

        assert_eq!(language_list(&tracks, CaptionKind::Manual), "en");
        assert_eq!(language_list(&tracks, CaptionKind::Automatic), "de, en");
        assert_eq!(language_list(&[], CaptionKind::Manual), "none");
    }

    #[test]
    fn test_write_track() {
        let dir = tempfile::tempdir().unwrap();
        let track = CaptionTrack {
            language: "es".to_string(),
            kind: CaptionKind::Automatic,
            set: TranscriptSet::new("es", vec![Segment::new(1.0, 2.0, "es", "Hola")]).unwrap(),
        };

        let path = write_track(&track, "abc/123", CaptionFormat::Vtt, &dir.path().join("out")).unwrap();
        assert_eq!(path.file_name().unwrap(), "abc_123.es.automatic.vtt");

        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.starts_with("WEBVTT"));
        assert!(body.contains("00:00:01.000 --> 00:00:02.000"));
    }
}
