//! Compare command implementation.

use crate::alignment::{ComparisonMode, TranscriptSet};
use crate::captions::{format_captions, CaptionFormat};
use crate::cli::preflight::{self, Operation};
use crate::cli::{AcquisitionArgs, AlignmentArgs, Output, ReportArgs};
use crate::config::Settings;
use crate::orchestrator::{CompareRequest, Orchestrator};
use crate::report::{render_table, Report};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Options for a compare run, as parsed from the command line.
#[derive(Debug, Default)]
pub struct CompareArgs {
    pub input: String,
    pub languages: Vec<String>,
    pub force_whisper: bool,
    pub manual_vs_auto: bool,
    pub captions: Option<String>,
    pub transcription_language: Option<String>,
    pub save_transcript: bool,
    pub save_format: Option<String>,
    pub keep_audio: bool,
    pub alignment: AlignmentArgs,
    pub report: ReportArgs,
    pub acquisition: AcquisitionArgs,
}

impl CompareArgs {
    fn apply(&self, settings: &mut Settings) {
        self.alignment.apply(settings);
        self.report.apply(settings);
        self.acquisition.apply(settings);
        if self.keep_audio {
            settings.general.keep_audio = true;
        }
        if let Some(format) = &self.save_format {
            settings.captions.save_format = format.clone();
        }
    }

    fn request(&self) -> CompareRequest {
        CompareRequest {
            input: self.input.clone(),
            languages: self.languages.clone(),
            force_whisper: self.force_whisper,
            manual_vs_automatic: self.manual_vs_auto,
            caption_file: self.captions.as_ref().map(|p| Settings::expand_path(p)),
            transcription_language: self.transcription_language.clone(),
        }
    }

    fn operation(&self) -> Operation {
        let local = Path::new(&self.input).exists();
        match (self.manual_vs_auto, local) {
            (true, true) => Operation::Align,
            (true, false) => Operation::CompareCaptions,
            (false, true) => Operation::CompareLocal,
            (false, false) => Operation::Compare,
        }
    }
}

/// Run the compare command.
pub async fn run_compare(args: CompareArgs, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);

    // Validate before any download starts
    let save_format: CaptionFormat = settings
        .captions
        .save_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    settings.aligner_config()?;

    if let Err(e) = preflight::check(args.operation()) {
        Output::error(&format!("{}", e));
        Output::info("Run 'capcheck doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    Output::info(&format!("Checking captions for: {}", args.input));

    let orchestrator = Orchestrator::new(settings)?;
    let outcome = match orchestrator.compare(&args.request()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            Output::error(&format!("Comparison failed: {}", e));
            return Err(e.into());
        }
    };

    Output::kv("Title", &outcome.metadata.title);
    for track in &outcome.captions {
        Output::list_item(&format!(
            "{} {} captions ({} cues)",
            track.language,
            track.kind,
            track.set.len()
        ));
    }

    let settings = orchestrator.settings();
    print!("{}", render_table(&outcome.report, settings.report.console_mismatches));
    println!();

    if outcome.report.video_info.mode == ComparisonMode::TranscriptionOnly {
        Output::warning("No captions to compare; the report only covers the transcription.");
    }

    let output_dir = settings.output_dir();
    for path in orchestrator.write_reports(&outcome.report, &output_dir)? {
        Output::success(&format!("Report written to {}", path.display()));
    }

    if args.save_transcript {
        match &outcome.transcript {
            Some(transcript) => {
                let path = save_transcript(&outcome.report, transcript, save_format, &output_dir)?;
                Output::success(&format!("Transcription saved to {}", path.display()));
            }
            None => Output::warning("No transcription was produced in this mode; nothing to save."),
        }
    }

    Ok(())
}

/// Write the transcription next to the reports.
fn save_transcript(report: &Report, transcript: &TranscriptSet, format: CaptionFormat, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "{}_transcript.{}.{}",
        report.file_stem(),
        transcript.language(),
        format.extension()
    ));
    std::fs::write(&path, format_captions(transcript, format))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::Segment;
    use crate::report::VideoInfo;
    use std::collections::BTreeMap;

    #[test]
    fn test_overrides_applied() {
        let args = CompareArgs {
            input: "clip.mp4".to_string(),
            keep_audio: true,
            save_format: Some("vtt".to_string()),
            alignment: AlignmentArgs {
                tolerance: Some(3.5),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert!(settings.general.keep_audio);
        assert_eq!(settings.captions.save_format, "vtt");
        assert_eq!(settings.alignment.time_tolerance_seconds, 3.5);
    }

    #[test]
    fn test_operation_for_input() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("talk.mp4");
        std::fs::write(&media, b"").unwrap();

        let local = CompareArgs {
            input: media.to_string_lossy().to_string(),
            ..Default::default()
        };
        assert!(matches!(local.operation(), Operation::CompareLocal));

        let remote = CompareArgs {
            input: "https://example.com/watch/1".to_string(),
            manual_vs_auto: true,
            ..Default::default()
        };
        assert!(matches!(remote.operation(), Operation::CompareCaptions));
    }

    #[test]
    fn test_save_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::new(
            VideoInfo::new("talk.mp4", "talk", ComparisonMode::TranscriptionOnly),
            BTreeMap::new(),
        );
        let transcript = TranscriptSet::new("en", vec![Segment::new(0.0, 1.5, "en", "Hello there")]).unwrap();

        let path = save_transcript(&report, &transcript, CaptionFormat::Srt, dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_transcript.en.srt"));

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("00:00:00,000 --> 00:00:01,500"));
        assert!(body.contains("Hello there"));
    }
}
