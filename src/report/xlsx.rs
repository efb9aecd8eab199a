//! xlsx workbook output.

use super::{Rating, Report};
use crate::alignment::ErrorKind;
use crate::error::Result;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use std::path::Path;

const MISMATCH_HEADERS: &[&str] = &[
    "Language",
    "Timestamp (s)",
    "Caption Start (s)",
    "Caption End (s)",
    "Original Caption",
    "Transcribed",
    "Similarity (%)",
    "Time Offset (s)",
    "Error Type",
    "Status",
    "Substitution Errors",
    "Deletion Errors",
    "Insertion Errors",
    "Total Errors",
];

fn write_header(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, format)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_optional(sheet: &mut Worksheet, row: u32, col: u16, value: Option<f64>, format: &Format) -> Result<()> {
    if let Some(v) = value {
        sheet.write_number_with_format(row, col, v, format)?;
    }
    Ok(())
}

/// Build the workbook in memory.
pub fn build_workbook(report: &Report) -> Result<Workbook> {
    let summary = report.summary();
    let info = &report.video_info;

    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xDDEBF7));
    let number = Format::new().set_num_format("0.00");
    let bad = Format::new().set_font_color(Color::RGB(0xC00000));

    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary")?;
    let rows: Vec<(&str, String)> = vec![
        ("Source", info.source.clone()),
        ("Title", info.title.clone()),
        (
            "Duration (s)",
            info.duration_seconds.map(|d| format!("{:.1}", d)).unwrap_or_default(),
        ),
        ("Transcription Language", info.language.clone().unwrap_or_default()),
        ("Format", info.format.clone().unwrap_or_default()),
        ("Comparison Mode", info.mode.to_string()),
        ("Generated", info.generated_at.to_rfc3339()),
        ("Run ID", info.run_id.to_string()),
        ("Total Segments", summary.total_segments.to_string()),
        ("Mismatches", summary.mismatches.to_string()),
        (
            "Accuracy (%)",
            summary.accuracy.map(|a| format!("{:.2}", a)).unwrap_or_else(|| "n/a".to_string()),
        ),
        ("Languages Found", summary.languages_found.join(", ")),
        ("Languages Without Captions", summary.languages_missing.join(", ")),
    ];
    for (row, (key, value)) in rows.iter().enumerate() {
        sheet.write_string_with_format(row as u32, 0, *key, &header)?;
        sheet.write_string(row as u32, 1, value.as_str())?;
    }
    sheet.set_column_width(0, 28)?;
    sheet.set_column_width(1, 60)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Mismatches")?;
    write_header(sheet, MISMATCH_HEADERS, &header)?;
    let mut row = 1u32;
    for result in report.results() {
        for pair in result.mismatches() {
            let rating = Rating::from_percent(pair.similarity * 100.0);
            sheet.write_string(row, 0, result.language.as_str())?;
            sheet.write_number_with_format(row, 1, pair.timestamp, &number)?;
            write_optional(sheet, row, 2, pair.reference.as_ref().map(|s| s.start), &number)?;
            write_optional(sheet, row, 3, pair.reference.as_ref().map(|s| s.end), &number)?;
            sheet.write_string(row, 4, pair.original())?;
            sheet.write_string_with_format(row, 5, pair.transcription(), &bad)?;
            sheet.write_number_with_format(row, 6, pair.similarity * 100.0, &number)?;
            write_optional(sheet, row, 7, pair.offset(), &number)?;
            sheet.write_string(row, 8, pair.kind.as_str())?;
            sheet.write_string(row, 9, rating.as_str())?;
            sheet.write_number(row, 10, pair.word_errors.substitutions as f64)?;
            sheet.write_number(row, 11, pair.word_errors.deletions as f64)?;
            sheet.write_number(row, 12, pair.word_errors.insertions as f64)?;
            sheet.write_number(row, 13, pair.word_errors.total() as f64)?;
            row += 1;
        }
    }
    sheet.set_column_width(4, 50)?;
    sheet.set_column_width(5, 50)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Error Types")?;
    write_header(
        sheet,
        &[
            "Language",
            "Matches",
            "Substitutions",
            "Deletions",
            "Insertions",
            "Word Hits",
            "Word Substitutions",
            "Word Deletions",
            "Word Insertions",
            "Word Error Rate (%)",
        ],
        &header,
    )?;
    for (i, result) in report.results().enumerate() {
        let row = i as u32 + 1;
        let words = result.word_errors();
        sheet.write_string(row, 0, result.language.as_str())?;
        for (offset, kind) in [
            ErrorKind::Match,
            ErrorKind::Substitution,
            ErrorKind::Deletion,
            ErrorKind::Insertion,
        ]
        .iter()
        .enumerate()
        {
            sheet.write_number(row, 1 + offset as u16, result.count(*kind) as f64)?;
        }
        sheet.write_number(row, 5, words.hits as f64)?;
        sheet.write_number(row, 6, words.substitutions as f64)?;
        sheet.write_number(row, 7, words.deletions as f64)?;
        sheet.write_number(row, 8, words.insertions as f64)?;
        write_optional(sheet, row, 9, words.word_error_rate().map(|w| w * 100.0), &number)?;
    }
    sheet.autofit();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Languages")?;
    write_header(
        sheet,
        &[
            "Language",
            "Status",
            "Reference Segments",
            "Accuracy (%)",
            "Rating",
            "Mismatches",
            "Average Offset (s)",
        ],
        &header,
    )?;
    for (i, language) in summary.per_language.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, language.language.as_str())?;
        sheet.write_string(row, 1, language.status)?;
        sheet.write_number(row, 2, language.total_segments as f64)?;
        write_optional(sheet, row, 3, language.accuracy, &number)?;
        if let Some(rating) = language.rating {
            sheet.write_string(row, 4, rating.as_str())?;
        }
        sheet.write_number(row, 5, language.mismatches as f64)?;
        write_optional(sheet, row, 6, language.average_offset, &number)?;
    }
    sheet.autofit();

    Ok(workbook)
}

/// Write the workbook to a file.
pub fn write_workbook(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut workbook = build_workbook(report)?;
    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    #[test]
    fn test_workbook_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        write_workbook(&sample_report(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.len() > 100);
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_workbook_in_memory() {
        let mut workbook = build_workbook(&sample_report()).unwrap();
        let buffer = workbook.save_to_buffer().unwrap();
        assert!(!buffer.is_empty());
    }
}
