//! capcheck - caption accuracy checker
//!
//! Compares the captions published with a video against an independent
//! speech-to-text transcription and reports where they disagree.
//!
//! # Overview
//!
//! capcheck can:
//! - Resolve platform URLs, direct media links and local files
//! - Fetch manual and automatic caption tracks for several languages
//! - Transcribe the audio with OpenAI Whisper
//! - Align captions and transcription segment by segment
//! - Write JSON and xlsx reports and print a console summary
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `source` - Input resolution (platform, direct URL, local file)
//! - `audio` - Audio download and processing
//! - `captions` - Caption extraction, parsing and export
//! - `transcription` - Speech-to-text transcription
//! - `alignment` - Segment alignment and per-language coordination
//! - `report` - JSON, xlsx and console output
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use capcheck::config::Settings;
//! use capcheck::orchestrator::{CompareRequest, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let request = CompareRequest {
//!         input: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
//!         languages: vec!["en".to_string()],
//!         ..Default::default()
//!     };
//!     let outcome = orchestrator.compare(&request).await?;
//!     println!("{:?}", outcome.report.summary().accuracy);
//!
//!     Ok(())
//! }
//! ```

pub mod alignment;
pub mod audio;
pub mod captions;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod source;
pub mod transcription;

pub use error::{CapcheckError, Result};
