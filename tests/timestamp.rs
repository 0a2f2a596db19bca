//! Timestamp parsing and formatting tests.

use std::time::Duration;

use clipmark::{ClipmarkError, filename_timestamp, format_timestamp, parse_timestamp};

#[test]
fn parse_bare_seconds() {
    assert_eq!(parse_timestamp("90").unwrap(), Duration::from_secs(90));
    assert_eq!(parse_timestamp("0").unwrap(), Duration::ZERO);
    assert_eq!(
        parse_timestamp("4119.6").unwrap(),
        Duration::from_millis(4_119_600)
    );
}

#[test]
fn parse_minutes_and_seconds() {
    assert_eq!(parse_timestamp("1:30").unwrap(), Duration::from_secs(90));
    assert_eq!(parse_timestamp("00:05").unwrap(), Duration::from_secs(5));
    assert_eq!(
        parse_timestamp("1:30.25").unwrap(),
        Duration::from_millis(90_250)
    );
}

#[test]
fn minutes_are_unbounded_without_hours() {
    assert_eq!(parse_timestamp("90:00").unwrap(), Duration::from_secs(5400));
}

#[test]
fn parse_hours_minutes_seconds() {
    assert_eq!(parse_timestamp("1:30:00").unwrap(), Duration::from_secs(5400));
    assert_eq!(
        parse_timestamp("01:02:03.5").unwrap(),
        Duration::from_millis(3_723_500)
    );
}

#[test]
fn surrounding_whitespace_is_ignored() {
    assert_eq!(parse_timestamp("  12 ").unwrap(), Duration::from_secs(12));
}

#[test]
fn fraction_is_exact() {
    assert_eq!(parse_timestamp("0.1").unwrap(), Duration::from_millis(100));
    assert_eq!(
        parse_timestamp("0.000000001").unwrap(),
        Duration::from_nanos(1)
    );
}

#[test]
fn rejects_malformed_input() {
    for input in [
        "", "   ", "-5", "+5", "abc", "1:2:3:4", "1:60", "1:60:00", "0:00:60", "1.", ".5", "1:",
        ":30", "1.0000000001", "5s",
    ] {
        let result = parse_timestamp(input);
        assert!(
            matches!(result, Err(ClipmarkError::InvalidTimestamp { .. })),
            "expected {input:?} to be rejected, got {result:?}"
        );
    }
}

#[test]
fn rejects_overflow() {
    let result = parse_timestamp("99999999999999999999");
    assert!(matches!(result, Err(ClipmarkError::InvalidTimestamp { .. })));

    let result = parse_timestamp(&format!("{}:00:00", u64::MAX));
    assert!(matches!(result, Err(ClipmarkError::InvalidTimestamp { .. })));
}

#[test]
fn error_names_the_input() {
    let error = parse_timestamp("1:75").unwrap_err();
    let message = error.to_string();
    assert!(message.contains("1:75"), "unexpected message: {message}");
    assert!(message.contains("below 60"), "unexpected message: {message}");
}

#[test]
fn format_below_one_hour() {
    assert_eq!(format_timestamp(Duration::ZERO), "00:00");
    assert_eq!(format_timestamp(Duration::from_secs(90)), "01:30");
    assert_eq!(format_timestamp(Duration::from_millis(5_250)), "00:05.25");
}

#[test]
fn format_above_one_hour() {
    assert_eq!(format_timestamp(Duration::from_secs(3600)), "1:00:00");
    assert_eq!(format_timestamp(Duration::from_secs(3723)), "1:02:03");
}

#[test]
fn minutes_seconds_round_trip() {
    for minutes in (0..200).step_by(7) {
        for seconds in 0..60 {
            for fraction in ["", ".5", ".125", ".000001"] {
                let text = format!("{minutes}:{seconds:02}{fraction}");
                let parsed = parse_timestamp(&text).unwrap();
                let reparsed = parse_timestamp(&format_timestamp(parsed)).unwrap();
                assert_eq!(reparsed, parsed, "round trip failed for {text}");
            }
        }
    }
}

#[test]
fn filename_tokens() {
    assert_eq!(filename_timestamp(Duration::ZERO), "0-00-00");
    assert_eq!(filename_timestamp(Duration::from_secs(65)), "0-01-05");
    assert_eq!(filename_timestamp(Duration::from_secs(5400)), "1-30-00");
    assert_eq!(filename_timestamp(Duration::from_millis(90_250)), "0-01-30-250");
}
