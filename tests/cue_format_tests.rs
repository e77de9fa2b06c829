// Tests for the subtitle cue codec: timestamp truncation, serialization,
// and the parse inverse used after translation returns.

use anyhow::Result;
use audioscribe::cue::{
    format_timestamp, parse_subtitle_text, parse_timestamp, to_plain_text, to_subtitle_text, Cue,
};

#[test]
fn test_timestamp_formatting_is_zero_padded() {
    assert_eq!(format_timestamp(0.0), "00:00:00,000");
    assert_eq!(format_timestamp(1.5), "00:00:01,500");
    assert_eq!(format_timestamp(61.25), "00:01:01,250");
    assert_eq!(format_timestamp(3661.007), "01:01:01,007");
}

#[test]
fn test_timestamp_truncates_below_a_millisecond() {
    // 1.9999 s is 1999.9 ms; truncation keeps 999, never rounds to 2000
    assert_eq!(format_timestamp(1.9999), "00:00:01,999");
    assert_eq!(format_timestamp(0.0004), "00:00:00,000");
}

#[test]
fn test_timestamp_parse_is_the_inverse_of_format() -> Result<()> {
    for secs in [0.0, 0.001, 1.5, 59.999, 60.0, 3599.25, 3600.0, 86399.999] {
        let formatted = format_timestamp(secs);
        let parsed = parse_timestamp(&formatted)?;
        assert!(
            (parsed - secs).abs() < 0.001,
            "{secs} -> {formatted} -> {parsed}"
        );
    }
    Ok(())
}

#[test]
fn test_timestamp_parse_rejects_garbage() {
    assert!(parse_timestamp("not a timestamp").is_err());
    assert!(parse_timestamp("00:00:00").is_err()); // missing millis
    assert!(parse_timestamp("00:99:00,000").is_err()); // minutes out of range
    assert!(parse_timestamp("00:00:00,5000").is_err()); // millis out of range
}

#[test]
fn test_subtitle_serialization_layout() {
    let cues = vec![
        Cue {
            start_secs: 0.0,
            end_secs: 1.5,
            text: "Hello there.".to_string(),
            speaker: Some("Speaker 1".to_string()),
        },
        Cue {
            start_secs: 1.5,
            end_secs: 2.25,
            text: "Hi.".to_string(),
            speaker: None,
        },
    ];

    let text = to_subtitle_text(&cues);
    let expected = "1\n\
                    00:00:00,000 --> 00:00:01,500\n\
                    Speaker 1: Hello there.\n\
                    \n\
                    2\n\
                    00:00:01,500 --> 00:00:02,250\n\
                    Hi.\n\
                    \n";
    assert_eq!(text, expected);
}

#[test]
fn test_round_trip_preserves_timing_and_text() -> Result<()> {
    let cues = vec![
        Cue {
            start_secs: 0.0,
            end_secs: 1.9999, // exercises truncation
            text: "First cue.".to_string(),
            speaker: Some("Speaker 1".to_string()),
        },
        Cue {
            start_secs: 2.0,
            end_secs: 3.5,
            text: "Second cue with more words.".to_string(),
            speaker: Some("Speaker 2".to_string()),
        },
        Cue {
            start_secs: 4.0,
            end_secs: 5.125,
            text: "A cue with no speaker at all".to_string(),
            speaker: None,
        },
    ];

    let parsed = parse_subtitle_text(&to_subtitle_text(&cues))?;
    assert_eq!(parsed.len(), cues.len());

    for (original, parsed) in cues.iter().zip(parsed.iter()) {
        // Equal up to millisecond truncation
        assert!((parsed.start_secs - original.start_secs).abs() < 0.001);
        assert!((parsed.end_secs - original.end_secs).abs() <= 0.001);
        assert_eq!(parsed.text, original.text);
        assert_eq!(parsed.speaker, original.speaker);
    }
    Ok(())
}

#[test]
fn test_parse_tolerates_crlf_and_trailing_blank_lines() -> Result<()> {
    let input = "1\r\n00:00:00,000 --> 00:00:01,000\r\nSpeaker 1: Hello.\r\n\r\n\r\n";
    let cues = parse_subtitle_text(input)?;
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "Hello.");
    assert_eq!(cues[0].speaker.as_deref(), Some("Speaker 1"));
    Ok(())
}

#[test]
fn test_parse_rejects_block_without_timestamps() {
    let input = "1\njust text, no timestamp line\n\n";
    assert!(parse_subtitle_text(input).is_err());
}

#[test]
fn test_plain_text_export() {
    let cues = vec![
        Cue {
            start_secs: 0.0,
            end_secs: 1.0,
            text: "Hello.".to_string(),
            speaker: Some("Alice".to_string()),
        },
        Cue {
            start_secs: 1.0,
            end_secs: 2.0,
            text: "Unattributed line".to_string(),
            speaker: None,
        },
    ];

    assert_eq!(to_plain_text(&cues), "Alice: Hello.\n\nUnattributed line\n\n");
}
