//! Timestamp parsing and formatting.
//!
//! Markers express positions as bare seconds (`"90"`, `"4119.6"`),
//! `MM:SS` (`"1:30"`) or `HH:MM:SS` (`"01:02:03.5"`). [`parse_timestamp`]
//! turns any of these into a [`Duration`] without going through floating
//! point, so `"0.1"` is exactly 100 ms.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use clipmark::{format_timestamp, parse_timestamp};
//!
//! let position = parse_timestamp("1:30.25")?;
//! assert_eq!(position, Duration::from_millis(90_250));
//! assert_eq!(format_timestamp(position), "01:30.25");
//! # Ok::<(), clipmark::ClipmarkError>(())
//! ```

use std::time::Duration;

use crate::error::ClipmarkError;

const MAX_FRACTION_DIGITS: usize = 9;

/// Parse a marker timestamp into a [`Duration`].
///
/// Accepted shapes, each optionally followed by `.fraction` on the seconds
/// component:
///
/// - `SS`: any number of seconds;
/// - `MM:SS`: seconds below 60, minutes unbounded;
/// - `HH:MM:SS`: minutes and seconds below 60.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`ClipmarkError::InvalidTimestamp`] for empty input, signs or
/// other non-digit characters, too many components, out-of-range minutes or
/// seconds, or values that overflow.
pub fn parse_timestamp(input: &str) -> Result<Duration, ClipmarkError> {
    let trimmed = input.trim();
    let invalid = |reason: &str| ClipmarkError::InvalidTimestamp {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("timestamp is empty"));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds_part) = match parts.as_slice() {
        [seconds] => (0, 0, *seconds),
        [minutes, seconds] => {
            let minutes = parse_whole(minutes).ok_or_else(|| invalid("minutes must be digits"))?;
            (0, minutes, *seconds)
        }
        [hours, minutes, seconds] => {
            let hours = parse_whole(hours).ok_or_else(|| invalid("hours must be digits"))?;
            let minutes = parse_whole(minutes).ok_or_else(|| invalid("minutes must be digits"))?;
            if minutes >= 60 {
                return Err(invalid("minutes must be below 60"));
            }
            (hours, minutes, *seconds)
        }
        _ => return Err(invalid("expected SS, MM:SS or HH:MM:SS")),
    };

    let (whole_seconds, nanos) = parse_seconds(seconds_part).map_err(invalid)?;
    if parts.len() > 1 && whole_seconds >= 60 {
        return Err(invalid("seconds must be below 60"));
    }

    let total = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(whole_seconds))
        .ok_or_else(|| invalid("timestamp is too large"))?;

    Ok(Duration::new(total, nanos))
}

/// Parse an unsigned decimal integer made of ASCII digits only.
fn parse_whole(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse the seconds component, returning whole seconds and nanoseconds.
fn parse_seconds(text: &str) -> Result<(u64, u32), &'static str> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };

    let whole = parse_whole(whole).ok_or("seconds must be digits")?;

    let nanos = match fraction {
        None => 0,
        Some(digits) => {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err("fractional seconds must be digits");
            }
            if digits.len() > MAX_FRACTION_DIGITS {
                return Err("fractional seconds beyond nanosecond precision");
            }
            let padded = format!("{digits:0<width$}", width = MAX_FRACTION_DIGITS);
            padded.parse::<u32>().map_err(|_| "fractional seconds must be digits")?
        }
    };

    Ok((whole, nanos))
}

/// Format a [`Duration`] in the textual shape accepted by
/// [`parse_timestamp`].
///
/// Positions below one hour render as `MM:SS`, longer ones as `H:MM:SS`.
/// A fractional part is appended without trailing zeros.
pub fn format_timestamp(timestamp: Duration) -> String {
    let total_secs = timestamp.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut text = if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    };
    text.push_str(&fraction_suffix(timestamp.subsec_nanos()));
    text
}

/// Format a [`Duration`] as a filename-safe token (`H-MM-SS`).
///
/// Sub-second positions get a `-mmm` millisecond suffix, e.g.
/// `0-01-30-250`.
pub fn filename_timestamp(timestamp: Duration) -> String {
    let total_secs = timestamp.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = timestamp.subsec_millis();

    if millis == 0 {
        format!("{hours}-{minutes:02}-{seconds:02}")
    } else {
        format!("{hours}-{minutes:02}-{seconds:02}-{millis:03}")
    }
}

fn fraction_suffix(nanos: u32) -> String {
    if nanos == 0 {
        return String::new();
    }
    let digits = format!("{nanos:09}");
    format!(".{}", digits.trim_end_matches('0'))
}
