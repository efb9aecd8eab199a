//! CLI module for capcheck.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::Settings;
use clap::{Args, Parser, Subcommand};

/// capcheck - caption accuracy checker
///
/// Compares a video's captions with an independent speech-to-text
/// transcription and reports where they disagree.
#[derive(Parser, Debug)]
#[command(name = "capcheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CAPCHECK_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Alignment overrides shared by `compare` and `align`.
#[derive(Args, Debug, Clone, Default)]
pub struct AlignmentArgs {
    /// Similarity at or above which segments match (0.0-1.0)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Similarity below which a candidate segment is not paired (0.0-1.0)
    #[arg(long)]
    pub threshold_min: Option<f64>,

    /// Seconds of timing slack on each side of a caption
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Keep filler words (um, uh, you know, ...) when comparing
    #[arg(long)]
    pub keep_fillers: bool,
}

impl AlignmentArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(v) = self.threshold {
            settings.alignment.threshold = v;
        }
        if let Some(v) = self.threshold_min {
            settings.alignment.threshold_min = v;
        }
        if let Some(v) = self.tolerance {
            settings.alignment.time_tolerance_seconds = v;
        }
        if self.keep_fillers {
            settings.alignment.remove_fillers = false;
        }
    }
}

/// Report overrides shared by `compare` and `align`.
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Directory for the JSON and xlsx reports
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Do not write the JSON report
    #[arg(long)]
    pub no_json: bool,

    /// Do not write the xlsx workbook
    #[arg(long)]
    pub no_xlsx: bool,

    /// Mismatches shown per language in the console (0 to hide)
    #[arg(long)]
    pub mismatches: Option<usize>,
}

impl ReportArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.output_dir {
            settings.report.output_dir = dir.clone();
        }
        if self.no_json {
            settings.report.json = false;
        }
        if self.no_xlsx {
            settings.report.xlsx = false;
        }
        if let Some(n) = self.mismatches {
            settings.report.console_mismatches = n;
        }
    }
}

/// Download overrides shared by commands that reach a platform.
#[derive(Args, Debug, Clone, Default)]
pub struct AcquisitionArgs {
    /// Browser to read cookies from (chrome, firefox, safari, ...)
    #[arg(long)]
    pub cookies_from_browser: Option<String>,

    /// User agent string or preset (chrome, firefox, safari, ios, android)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Download strategy to try (repeatable, in order)
    #[arg(long = "strategy")]
    pub strategies: Vec<String>,
}

impl AcquisitionArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(browser) = &self.cookies_from_browser {
            settings.acquisition.cookies_from_browser = Some(browser.clone());
        }
        if let Some(ua) = &self.user_agent {
            settings.acquisition.user_agent = Some(ua.clone());
        }
        if !self.strategies.is_empty() {
            settings.acquisition.strategies = self.strategies.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare a video's captions with a Whisper transcription
    Compare {
        /// URL, video ID, or local audio/video file path
        input: String,

        /// Caption language to compare (repeatable; default from config)
        #[arg(short, long = "language")]
        languages: Vec<String>,

        /// Skip captions and only transcribe
        #[arg(long)]
        force_whisper: bool,

        /// Compare manual captions against automatic captions instead of transcribing
        #[arg(long, conflicts_with = "force_whisper")]
        manual_vs_auto: bool,

        /// Use this caption file as the reference for the first language
        #[arg(long)]
        captions: Option<String>,

        /// Spoken language hint for Whisper (detected when omitted)
        #[arg(long)]
        transcription_language: Option<String>,

        /// Save the transcription next to the reports
        #[arg(long)]
        save_transcript: bool,

        /// Format for the saved transcription (srt, vtt, json)
        #[arg(long)]
        save_format: Option<String>,

        /// Keep the downloaded audio
        #[arg(long)]
        keep_audio: bool,

        #[command(flatten)]
        alignment: AlignmentArgs,

        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        acquisition: AcquisitionArgs,
    },

    /// Compare two caption files without downloading anything
    Align {
        /// Reference caption file (SRT or WebVTT)
        reference: String,

        /// Caption file to check against the reference
        hypothesis: String,

        /// Language tag for both files
        #[arg(short, long, default_value = "en")]
        language: String,

        #[command(flatten)]
        alignment: AlignmentArgs,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// List or download the captions available for a video
    Captions {
        /// URL, video ID, or local audio/video file path
        input: String,

        /// Caption language (repeatable; default from config)
        #[arg(short, long = "language")]
        languages: Vec<String>,

        /// Write each track to a file
        #[arg(short, long)]
        download: bool,

        /// Output format when downloading (srt, vtt, json)
        #[arg(long)]
        format: Option<String>,

        /// Directory for downloaded tracks
        #[arg(short, long, default_value = ".")]
        output_dir: String,

        #[command(flatten)]
        acquisition: AcquisitionArgs,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "alignment.threshold")
        key: String,
        /// Configuration value (comma-separated for lists)
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compare() {
        let cli = Cli::try_parse_from([
            "capcheck",
            "compare",
            "https://example.com/watch/1",
            "-l",
            "en",
            "-l",
            "es",
            "--threshold",
            "0.9",
            "--no-xlsx",
            "--strategy",
            "ios-client",
        ])
        .unwrap();

        let Commands::Compare {
            languages,
            alignment,
            report,
            acquisition,
            ..
        } = cli.command
        else {
            panic!("expected compare");
        };
        assert_eq!(languages, vec!["en", "es"]);

        let mut settings = Settings::default();
        alignment.apply(&mut settings);
        report.apply(&mut settings);
        acquisition.apply(&mut settings);
        assert_eq!(settings.alignment.threshold, 0.9);
        assert!(!settings.report.xlsx);
        assert!(settings.report.json);
        assert_eq!(settings.acquisition.strategies, vec!["ios-client"]);
    }

    #[test]
    fn test_conflicting_modes() {
        let result = Cli::try_parse_from(["capcheck", "compare", "x.mp4", "--force-whisper", "--manual-vs-auto"]);
        assert!(result.is_err());
    }
}
