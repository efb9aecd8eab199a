//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("capcheck doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    let tools = vec![
        check_tool("yt-dlp", "yt-dlp --version", install_hint_ytdlp()),
        check_tool("ffmpeg", "ffmpeg -version", install_hint_ffmpeg()),
        check_tool("ffprobe", "ffprobe -version", install_hint_ffmpeg()),
    ];
    print_section("External Tools", &tools);
    checks.extend(tools);

    let api = vec![check_openai_api_key()];
    print_section("API Configuration", &api);
    checks.extend(api);

    let dirs = check_directories(settings);
    print_section("Directories", &dirs);
    checks.extend(dirs);

    let config = vec![check_config_file(config_path), check_alignment(settings)];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using capcheck.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! capcheck is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_cmd: &str, hint: &str) -> CheckResult {
    let mut parts = version_cmd.split_whitespace();
    let cmd = parts.next().unwrap_or(name);

    match Command::new(cmd).args(parts).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            // Truncate long version strings
            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::error(name, "not found", hint),
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    api_key_result(std::env::var("OPENAI_API_KEY").ok().as_deref())
}

fn api_key_result(key: Option<&str>) -> CheckResult {
    const HINT: &str = "Set with: export OPENAI_API_KEY='sk-...' (only needed for transcription)";
    match key {
        Some(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Some("") => CheckResult::error("OPENAI_API_KEY", "empty", HINT),
        Some(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::warning("OPENAI_API_KEY", "not set", HINT),
    }
}

/// Check the work and report directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let temp_dir = settings.temp_dir();
    if temp_dir.exists() {
        let leftover = dir_size(&temp_dir);
        if leftover > 0 && !settings.general.keep_audio {
            results.push(CheckResult::warning(
                "Temp directory",
                &format!("{} ({} of leftover audio)", temp_dir.display(), format_size(leftover)),
                "Safe to delete; audio is removed after each run",
            ));
        } else {
            results.push(CheckResult::ok(
                "Temp directory",
                &format!("{} ({})", temp_dir.display(), format_size(leftover)),
            ));
        }
    } else {
        results.push(CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let output_dir = settings.output_dir();
    match std::fs::metadata(&output_dir) {
        Ok(meta) if meta.permissions().readonly() => results.push(CheckResult::error(
            "Report directory",
            &format!("{} (read-only)", output_dir.display()),
            "Change report.output_dir or pass --output-dir",
        )),
        Ok(_) => results.push(CheckResult::ok("Report directory", &format!("{}", output_dir.display()))),
        Err(_) => results.push(CheckResult::warning(
            "Report directory",
            &format!("{} (will be created)", output_dir.display()),
            "Directory will be created when the first report is written",
        )),
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: capcheck config edit",
        )
    }
}

/// Check the alignment thresholds.
fn check_alignment(settings: &Settings) -> CheckResult {
    match settings.aligner_config() {
        Ok(config) => CheckResult::ok(
            "Alignment",
            &format!(
                "threshold {}, minimum {}, tolerance {}s",
                config.threshold, config.threshold_min, config.time_tolerance_seconds
            ),
        ),
        Err(e) => CheckResult::error(
            "Alignment",
            &e.to_string(),
            "Fix with: capcheck config set alignment.threshold 0.8",
        ),
    }
}

/// Total size of the files directly inside a directory.
fn dir_size(dir: &Path) -> u64 {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_api_key_states() {
        assert_eq!(api_key_result(None).status, CheckStatus::Warning);
        assert_eq!(api_key_result(Some("")).status, CheckStatus::Error);
        assert_eq!(api_key_result(Some("not-a-key")).status, CheckStatus::Warning);
        assert_eq!(
            api_key_result(Some("sk-abcdefghijklmnopqrstuvwxyz")).status,
            CheckStatus::Ok
        );
    }

    #[test]
    fn test_alignment_check() {
        let mut settings = Settings::default();
        assert_eq!(check_alignment(&settings).status, CheckStatus::Ok);

        settings.alignment.threshold_min = 0.9;
        settings.alignment.threshold = 0.5;
        assert_eq!(check_alignment(&settings).status, CheckStatus::Error);
    }

    #[test]
    fn test_dir_size_and_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), vec![0u8; 2048]).unwrap();
        assert_eq!(dir_size(dir.path()), 2048);
        assert_eq!(dir_size(&dir.path().join("missing")), 0);

        let result = check_config_file(&dir.path().join("config.toml"));
        assert_eq!(result.status, CheckStatus::Warning);
    }
}
