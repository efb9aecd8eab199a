//! Configuration settings for capcheck.

use crate::alignment::{AlignerConfig, NormalizeOptions, DEFAULT_FILLERS};
use crate::audio::{resolve_user_agent, DownloadOptions, DownloadStrategy};
use crate::error::{CapcheckError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub acquisition: AcquisitionSettings,
    pub captions: CaptionSettings,
    pub transcription: TranscriptionSettings,
    pub alignment: AlignmentSettings,
    pub report: ReportSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for downloaded audio and intermediate files.
    pub temp_dir: String,
    /// Keep downloaded audio after a run.
    pub keep_audio: bool,
    /// Log level when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/capcheck".to_string(),
            keep_audio: false,
            log_level: "warn".to_string(),
        }
    }
}

/// Media download settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AcquisitionSettings {
    /// Download strategies to try, in order. Empty means all built-in ones.
    pub strategies: Vec<String>,
    /// Browser to read cookies from (chrome, firefox, ...).
    pub cookies_from_browser: Option<String>,
    /// User agent, or a preset name (chrome, firefox, safari, ios, android).
    pub user_agent: Option<String>,
    /// Timeout for one download attempt, in seconds.
    pub download_timeout_seconds: u64,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            strategies: Vec::new(),
            cookies_from_browser: None,
            user_agent: None,
            download_timeout_seconds: 600,
        }
    }
}

/// Caption settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptionSettings {
    /// Languages compared when none are given on the command line.
    pub languages: Vec<String>,
    /// Fall back to automatic captions when no authored track exists.
    pub include_automatic: bool,
    /// Format for saved captions and transcripts (srt, vtt, json).
    pub save_format: String,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            include_automatic: true,
            save_format: "srt".to_string(),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Duration in seconds for splitting long audio files.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent chunk requests.
    pub max_concurrent_chunks: usize,
    /// Maximum media duration to process (in seconds).
    pub max_duration_seconds: u32,
    /// Request word timestamps and regroup them into caption-sized segments.
    pub word_timestamps: bool,
    /// Target segment length when regrouping words.
    pub resegment_seconds: f64,
    /// Language hint for the model; detected when unset.
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 3,
            max_duration_seconds: 7200, // 2 hours
            word_timestamps: false,
            resegment_seconds: 5.0,
            language: None,
        }
    }
}

/// Alignment settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignmentSettings {
    pub threshold: f64,
    pub threshold_min: f64,
    pub time_tolerance_seconds: f64,
    pub spoken_symbols: bool,
    pub remove_fillers: bool,
    pub fillers: Vec<String>,
    /// Languages aligned at the same time.
    pub max_concurrent_languages: usize,
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            threshold_min: 0.1,
            time_tolerance_seconds: 2.0,
            spoken_symbols: true,
            remove_fillers: true,
            fillers: DEFAULT_FILLERS.iter().map(|s| s.to_string()).collect(),
            max_concurrent_languages: 4,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportSettings {
    /// Directory reports are written to.
    pub output_dir: String,
    /// Write a JSON report.
    pub json: bool,
    /// Write an xlsx workbook.
    pub xlsx: bool,
    /// Mismatches printed per language in the console summary.
    pub console_mismatches: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            json: true,
            xlsx: true,
            console_mismatches: 5,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CapcheckError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("capcheck")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded report directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.report.output_dir)
    }

    /// Validated aligner configuration.
    pub fn aligner_config(&self) -> Result<AlignerConfig> {
        let a = &self.alignment;
        let config = AlignerConfig {
            threshold: a.threshold,
            threshold_min: a.threshold_min,
            time_tolerance_seconds: a.time_tolerance_seconds,
            normalize: NormalizeOptions {
                spoken_symbols: a.spoken_symbols,
                remove_fillers: a.remove_fillers,
                fillers: a.fillers.clone(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// yt-dlp download options.
    pub fn download_options(&self) -> Result<DownloadOptions> {
        let a = &self.acquisition;
        Ok(DownloadOptions {
            strategies: DownloadStrategy::by_names(&a.strategies)?,
            cookies_from_browser: a.cookies_from_browser.clone(),
            user_agent: a.user_agent.as_deref().map(resolve_user_agent),
            timeout: Duration::from_secs(a.download_timeout_seconds.max(1)),
        })
    }

    /// Set a value by dotted key (`alignment.threshold`).
    ///
    /// The value is parsed according to the current field type; list fields
    /// take comma-separated values.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        let [section, field] = parts.as_slice() else {
            return Err(CapcheckError::Config(format!(
                "Key must look like section.field, got '{}'",
                key
            )));
        };

        let mut root = toml::Value::try_from(&*self).map_err(|e| CapcheckError::Config(e.to_string()))?;
        let table = root
            .get_mut(*section)
            .and_then(|v| v.as_table_mut())
            .ok_or_else(|| CapcheckError::Config(format!("Unknown section '{}'", section)))?;

        let parsed = match table.get(*field) {
            Some(toml::Value::Boolean(_)) => toml::Value::Boolean(value.trim().parse().map_err(|_| {
                CapcheckError::Config(format!("{} expects true or false, got '{}'", key, value))
            })?),
            Some(toml::Value::Integer(_)) => toml::Value::Integer(value.trim().parse().map_err(|_| {
                CapcheckError::Config(format!("{} expects an integer, got '{}'", key, value))
            })?),
            Some(toml::Value::Float(_)) => toml::Value::Float(value.trim().parse().map_err(|_| {
                CapcheckError::Config(format!("{} expects a number, got '{}'", key, value))
            })?),
            Some(toml::Value::Array(_)) => toml::Value::Array(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| toml::Value::String(v.to_string()))
                    .collect(),
            ),
            _ => toml::Value::String(value.to_string()),
        };
        table.insert(field.to_string(), parsed);

        let updated: Settings = root.try_into()?;

        // Unset optional fields are absent from the table, so unknown keys
        // only show up as missing after the round trip.
        let check = toml::Value::try_from(&updated).map_err(|e| CapcheckError::Config(e.to_string()))?;
        if check.get(*section).and_then(|s| s.get(*field)).is_none() {
            return Err(CapcheckError::Config(format!("Unknown setting '{}'", key)));
        }

        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let settings = Settings::default();
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Settings = toml::from_str("[alignment]\nthreshold = 0.9\n").unwrap();
        assert_eq!(parsed.alignment.threshold, 0.9);
        assert_eq!(parsed.alignment.threshold_min, 0.1);
        assert_eq!(parsed.captions.languages, vec!["en"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[captions]\nlanguages = [\"en\", \"es\"]\n").unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.captions.languages, vec!["en", "es"]);

        let missing = Settings::load_from(Some(&dir.path().join("none.toml"))).unwrap();
        assert_eq!(missing, Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.report.xlsx = false;
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(Some(&path)).unwrap(), settings);
    }

    #[test]
    fn test_aligner_config_validated() {
        let mut settings = Settings::default();
        assert_eq!(settings.aligner_config().unwrap(), AlignerConfig::default());

        settings.alignment.threshold_min = 0.9;
        assert!(matches!(
            settings.aligner_config(),
            Err(CapcheckError::ThresholdConfiguration(_))
        ));
    }

    #[test]
    fn test_download_options() {
        let mut settings = Settings::default();
        settings.acquisition.strategies = vec!["ios-client".to_string()];
        settings.acquisition.user_agent = Some("firefox".to_string());

        let options = settings.download_options().unwrap();
        assert_eq!(options.strategies.len(), 1);
        assert_eq!(options.user_agent.as_deref(), Some(crate::audio::FIREFOX_USER_AGENT));
        assert_eq!(options.timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_set_value() {
        let mut settings = Settings::default();

        settings.set_value("alignment.threshold", "0.95").unwrap();
        settings.set_value("report.xlsx", "false").unwrap();
        settings.set_value("captions.languages", "en, es,fr").unwrap();
        settings.set_value("acquisition.cookies_from_browser", "chrome").unwrap();
        settings.set_value("transcription.max_concurrent_chunks", "5").unwrap();

        assert_eq!(settings.alignment.threshold, 0.95);
        assert!(!settings.report.xlsx);
        assert_eq!(settings.captions.languages, vec!["en", "es", "fr"]);
        assert_eq!(settings.acquisition.cookies_from_browser.as_deref(), Some("chrome"));
        assert_eq!(settings.transcription.max_concurrent_chunks, 5);
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut settings = Settings::default();

        assert!(settings.set_value("alignment.threshold", "high").is_err());
        assert!(settings.set_value("alignment.nope", "1").is_err());
        assert!(settings.set_value("nope.threshold", "1").is_err());
        assert!(settings.set_value("threshold", "1").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_expand_path() {
        let path = Settings::expand_path("/tmp/capcheck");
        assert_eq!(path, PathBuf::from("/tmp/capcheck"));
    }
}
