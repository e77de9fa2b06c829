//! Subtitle-style cue text: the wire format for the translation provider and
//! one of the transcript export formats.
//!
//! A cue block is a 1-based sequence number, a `start --> end` timestamp
//! line, the (optionally speaker-prefixed) text, and a blank-line separator.
//! Timestamps are `HH:MM:SS,mmm`, truncated (not rounded) below a
//! millisecond; serializing and re-parsing must agree on that truncation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Longest prefix before `": "` that is still treated as a speaker label
const MAX_SPEAKER_LABEL_LEN: usize = 48;

/// One timed span of text, detached from any stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
    pub speaker: Option<String>,
}

/// Format fractional seconds as `HH:MM:SS,mmm`, truncating sub-millisecond
/// precision.
pub fn format_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0) as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Parse a `HH:MM:SS,mmm` timestamp back into fractional seconds.
pub fn parse_timestamp(input: &str) -> Result<f64> {
    let bad = || Error::InvalidInput(format!("malformed cue timestamp: {input:?}"));

    let (clock, ms_part) = input.trim().split_once(',').ok_or_else(bad)?;
    let mut clock_parts = clock.split(':');
    let h: u64 = clock_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let m: u64 = clock_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let s: u64 = clock_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    if clock_parts.next().is_some() || m >= 60 || s >= 60 {
        return Err(bad());
    }
    let ms: u64 = ms_part.parse().map_err(|_| bad())?;
    if ms >= 1000 {
        return Err(bad());
    }

    Ok((h * 3600 + m * 60 + s) as f64 + ms as f64 / 1000.0)
}

/// Serialize cues to subtitle text. Speaker names, when present, prefix the
/// text as `Name: text`.
pub fn to_subtitle_text(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start_secs),
            format_timestamp(cue.end_secs)
        ));
        match &cue.speaker {
            Some(name) => out.push_str(&format!("{}: {}\n", name, cue.text)),
            None => out.push_str(&format!("{}\n", cue.text)),
        }
        out.push('\n');
    }
    out
}

/// Parse subtitle text back into cues: the inverse of [`to_subtitle_text`],
/// used on what the translation provider returns.
pub fn parse_subtitle_text(input: &str) -> Result<Vec<Cue>> {
    let mut cues = Vec::new();

    for block in input.replace("\r\n", "\n").split("\n\n") {
        let lines: Vec<&str> = block.lines().map(str::trim_end).collect();
        if lines.iter().all(|l| l.trim().is_empty()) {
            continue;
        }
        if lines.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "malformed cue block: {block:?}"
            )));
        }

        // First line is the sequence number; its value is not trusted, cue
        // order is positional.
        let timestamp_line = lines[1];
        let (start_raw, end_raw) = timestamp_line.split_once("-->").ok_or_else(|| {
            Error::InvalidInput(format!("missing timestamp line in cue block: {block:?}"))
        })?;
        let start_secs = parse_timestamp(start_raw)?;
        let end_secs = parse_timestamp(end_raw)?;

        let body = lines[2..].join("\n");
        let (speaker, text) = split_speaker_prefix(&body);

        cues.push(Cue {
            start_secs,
            end_secs,
            text,
            speaker,
        });
    }

    Ok(cues)
}

/// Plain-text export: `Speaker: text` blocks separated by blank lines.
pub fn to_plain_text(cues: &[Cue]) -> String {
    let mut out = String::new();
    for cue in cues {
        match &cue.speaker {
            Some(name) => out.push_str(&format!("{}: {}\n\n", name, cue.text)),
            None => out.push_str(&format!("{}\n\n", cue.text)),
        }
    }
    out
}

/// Split a `Name: text` body into speaker and text. A colon counts as a
/// speaker delimiter only when the prefix is short enough to be a label.
fn split_speaker_prefix(body: &str) -> (Option<String>, String) {
    if let Some((prefix, rest)) = body.split_once(": ") {
        if !prefix.is_empty() && prefix.len() <= MAX_SPEAKER_LABEL_LEN && !prefix.contains('\n') {
            return (Some(prefix.to_string()), rest.to_string());
        }
    }
    (None, body.to_string())
}
