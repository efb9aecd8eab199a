//! capcheck CLI entry point.

use anyhow::Result;
use capcheck::cli::{commands, Cli, Commands};
use capcheck::config::Settings;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = match &cli.config {
        Some(path) => Settings::expand_path(path),
        None => Settings::default_config_path(),
    };
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging; -v flags win over the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("capcheck={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Compare {
            input,
            languages,
            force_whisper,
            manual_vs_auto,
            captions,
            transcription_language,
            save_transcript,
            save_format,
            keep_audio,
            alignment,
            report,
            acquisition,
        } => {
            let args = commands::CompareArgs {
                input,
                languages,
                force_whisper,
                manual_vs_auto,
                captions,
                transcription_language,
                save_transcript,
                save_format,
                keep_audio,
                alignment,
                report,
                acquisition,
            };
            commands::run_compare(args, settings).await?;
        }

        Commands::Align {
            reference,
            hypothesis,
            language,
            alignment,
            report,
        } => {
            commands::run_align(&reference, &hypothesis, &language, &alignment, &report, settings).await?;
        }

        Commands::Captions {
            input,
            languages,
            download,
            format,
            output_dir,
            acquisition,
        } => {
            commands::run_captions(
                &input,
                &languages,
                download,
                format.as_deref(),
                &output_dir,
                &acquisition,
                settings,
            )
            .await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, &config_path)?;
        }
    }

    Ok(())
}
