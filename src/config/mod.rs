//! Configuration loading and editing.

mod settings;

pub use settings::{
    AcquisitionSettings, AlignmentSettings, CaptionSettings, GeneralSettings, ReportSettings,
    Settings, TranscriptionSettings,
};
