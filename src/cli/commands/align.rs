//! Align command: compare two caption files directly.

use crate::cli::{AlignmentArgs, Output, ReportArgs};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::report::render_table;
use anyhow::Result;

/// Run the align command.
pub async fn run_align(
    reference: &str,
    hypothesis: &str,
    language: &str,
    alignment: &AlignmentArgs,
    report: &ReportArgs,
    mut settings: Settings,
) -> Result<()> {
    alignment.apply(&mut settings);
    report.apply(&mut settings);

    let reference = Settings::expand_path(reference);
    let hypothesis = Settings::expand_path(hypothesis);
    for path in [&reference, &hypothesis] {
        if !path.exists() {
            Output::error(&format!("File not found: {}", path.display()));
            return Err(anyhow::anyhow!("File not found: {}", path.display()));
        }
    }

    let orchestrator = Orchestrator::new(settings)?;
    let result = orchestrator.align_files(&reference, &hypothesis, language).await?;

    let settings = orchestrator.settings();
    print!("{}", render_table(&result, settings.report.console_mismatches));
    println!();

    for path in orchestrator.write_reports(&result, &settings.output_dir())? {
        Output::success(&format!("Report written to {}", path.display()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_align_writes_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("a.srt");
        let hypothesis = dir.path().join("b.srt");
        let body = "1\n00:00:00,000 --> 00:00:02,000\nGood morning\n";
        std::fs::write(&reference, body).unwrap();
        std::fs::write(&hypothesis, body).unwrap();

        let mut settings = Settings::default();
        settings.general.temp_dir = dir.path().join("tmp").to_string_lossy().to_string();
        let report = ReportArgs {
            output_dir: Some(dir.path().join("reports").to_string_lossy().to_string()),
            no_xlsx: true,
            ..Default::default()
        };

        run_align(
            &reference.to_string_lossy(),
            &hypothesis.to_string_lossy(),
            "en",
            &AlignmentArgs::default(),
            &report,
            settings,
        )
        .await
        .unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path().join("reports"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].extension().unwrap(), "json");
    }

    #[tokio::test]
    async fn test_align_missing_file() {
        let result = run_align(
            "/nonexistent/a.srt",
            "/nonexistent/b.srt",
            "en",
            &AlignmentArgs::default(),
            &ReportArgs::default(),
            Settings::default(),
        )
        .await;
        assert!(result.is_err());
    }
}
