//! WebVTT, SRT and HLS caption playlist parsing.

use crate::alignment::{Segment, TranscriptSet};
use crate::error::{CapcheckError, Result};
use regex::Regex;
use tracing::{debug, warn};

/// Kind of caption body returned by a platform or read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    WebVtt,
    Srt,
    /// An HLS playlist whose entries point at WebVTT fragments.
    Playlist,
}

/// Guess the format of a caption body.
pub fn detect_format(body: &str) -> Option<BodyFormat> {
    let trimmed = body.trim_start_matches('\u{feff}').trim_start();

    if trimmed.starts_with("WEBVTT") {
        Some(BodyFormat::WebVtt)
    } else if trimmed.starts_with("#EXTM3U") || !playlist_urls(trimmed).is_empty() {
        Some(BodyFormat::Playlist)
    } else if trimmed.contains("-->") {
        Some(BodyFormat::Srt)
    } else {
        None
    }
}

/// Fragment references listed in an HLS caption playlist.
///
/// Entries may be absolute or relative; the caller resolves relative ones.
pub fn playlist_urls(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| !line.contains("-->") && line.contains(".vtt"))
        .map(str::to_string)
        .collect()
}

/// Parse a WebVTT or SRT body into a transcript set.
///
/// Cues are sorted by start time and consecutive repeats (rolling automatic
/// captions) are collapsed. An empty body yields an empty set.
pub fn parse_captions(body: &str, language: &str) -> Result<TranscriptSet> {
    match detect_format(body) {
        Some(BodyFormat::WebVtt) | Some(BodyFormat::Srt) => {
            let segments = parse_cues(body, language);
            debug!("Parsed {} caption cues for {}", segments.len(), language);
            TranscriptSet::from_unsorted(language, segments)
        }
        Some(BodyFormat::Playlist) => Err(CapcheckError::CaptionParse(
            "caption playlist must be resolved into its fragments before parsing".to_string(),
        )),
        None if body.trim().is_empty() => Ok(TranscriptSet::empty(language)),
        None => Err(CapcheckError::CaptionParse(
            "unrecognized caption format (expected WebVTT or SRT)".to_string(),
        )),
    }
}

/// Parse `hh:mm:ss.ttt`, `mm:ss.ttt` or the SRT `hh:mm:ss,ttt` form into seconds.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };

    let seconds: f64 = seconds.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Some(whole as f64 + seconds)
}

struct Cue {
    start: f64,
    end: f64,
    lines: Vec<String>,
}

fn parse_cues(body: &str, language: &str) -> Vec<Segment> {
    let tags = Regex::new(r"<[^>]*>").expect("Invalid regex");
    let text = body
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut cues = Vec::new();
    for block in blocks(&text) {
        let first = block[0].trim();
        if first.starts_with("WEBVTT")
            || first == "NOTE"
            || first.starts_with("NOTE ")
            || first == "STYLE"
            || first == "REGION"
        {
            continue;
        }

        let Some(timing_idx) = block.iter().position(|l| l.contains("-->")) else {
            continue;
        };

        let Some((start, end)) = parse_timing(block[timing_idx]) else {
            warn!("Skipping cue with unreadable timing: {}", block[timing_idx].trim());
            continue;
        };

        let lines: Vec<String> = block[timing_idx + 1..]
            .iter()
            .map(|l| decode_entities(&tags.replace_all(l, "")).trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        if !lines.is_empty() {
            cues.push(Cue { start, end, lines });
        }
    }

    collapse_repeats(cues)
        .into_iter()
        .map(|cue| Segment::new(cue.start, cue.end, language, cue.lines.join(" ")))
        .collect()
}

/// Split text into groups of non-blank lines.
fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let (left, right) = line.split_once("-->")?;
    let start = parse_timestamp(left)?;
    // Cue settings follow the end time.
    let end = parse_timestamp(right.split_whitespace().next()?)?;
    Some((start, end))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lrm;", "")
        .replace("&rlm;", "")
        .replace("&amp;", "&")
}

/// Collapse rolling captions.
///
/// Leading lines already shown by the previous cue are dropped; a cue with
/// nothing new extends the previous cue instead of starting a new one.
fn collapse_repeats(cues: Vec<Cue>) -> Vec<Cue> {
    let mut out: Vec<Cue> = Vec::with_capacity(cues.len());

    for mut cue in cues {
        if let Some(prev) = out.last_mut() {
            let repeated = cue
                .lines
                .iter()
                .take_while(|line| prev.lines.contains(*line))
                .count();
            cue.lines.drain(..repeated);

            if cue.lines.is_empty() {
                if cue.end > prev.end {
                    prev.end = cue.end;
                }
                continue;
            }
        }
        out.push(cue);
    }

    out
}
