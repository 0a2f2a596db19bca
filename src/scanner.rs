//! Marker scanning.
//!
//! [`MarkerScanner`] walks a blog document and yields one
//! `Result<Marker, ClipmarkError>` per `[CLIP ...]` or `[SCREENSHOT ...]`
//! tag, in document order. Scanning is lazy: nothing past the current tag
//! is examined until the next item is requested.
//!
//! # Marker syntax
//!
//! ```text
//! [SCREENSHOT timestamp="1:05" align="left"]The login screen[/SCREENSHOT]
//! [CLIP timestamp="00:02:10" duration="15" caption="Deploying"][/CLIP]
//! ```
//!
//! The closing tag is optional. When present (and not preceded by another
//! opening tag) the text between the tags becomes the caption.
//!
//! # Example
//!
//! ```
//! use clipmark::{MarkerKind, MarkerScanner, ScanOptions};
//!
//! let text = r#"Intro [SCREENSHOT timestamp="5"]First frame[/SCREENSHOT] outro"#;
//! let markers: Vec<_> = MarkerScanner::new(text, ScanOptions::default())
//!     .collect::<Result<_, _>>()?;
//!
//! assert_eq!(markers.len(), 1);
//! assert_eq!(markers[0].kind, MarkerKind::Screenshot);
//! assert_eq!(markers[0].caption.as_deref(), Some("First frame"));
//! # Ok::<(), clipmark::ClipmarkError>(())
//! ```

use std::collections::HashMap;
use std::iter::FusedIterator;
use std::ops::Range;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::configuration::{DuplicatePolicy, ScanOptions};
use crate::error::ClipmarkError;
use crate::marker::{Alignment, Marker, MarkerKind};
use crate::timestamp::{format_timestamp, parse_timestamp};

/// Opening tag: kind, then attributes. Quoted values may contain `]`.
static OPENING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[(CLIP|SCREENSHOT)(\s(?:[^\]"]|"[^"]*")*)?\]"#).unwrap()
});

/// Start of a tag, whether or not its attributes are well formed.
static TAG_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(CLIP|SCREENSHOT)[\s\]]").unwrap());

/// `name="value"`, tolerating unquoted single-word values.
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|([^\s"\]]+))"#).unwrap()
});

/// Lazy iterator over the markers of one document.
///
/// The scanner is finite and cannot be restarted; create a new one to scan
/// again. Problems that do not invalidate a marker (duplicate timestamps
/// under [`DuplicatePolicy::Warn`], a `duration` on a screenshot) are
/// logged and collected in [`warnings`](MarkerScanner::warnings).
pub struct MarkerScanner<'a> {
    text: &'a str,
    position: usize,
    options: ScanOptions,
    seen: HashMap<(MarkerKind, Duration), usize>,
    warnings: Vec<String>,
}

impl<'a> MarkerScanner<'a> {
    /// Create a scanner over `text`.
    pub fn new(text: &'a str, options: ScanOptions) -> Self {
        Self {
            text,
            position: 0,
            options,
            seen: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Consume the scanner and return its warnings.
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    /// Advance to the next tag, returning its byte span alongside the
    /// parse result.
    pub(crate) fn next_with_span(
        &mut self,
    ) -> Option<(Range<usize>, Result<Marker, ClipmarkError>)> {
        let head = TAG_HEAD.captures_at(self.text, self.position)?;
        let start = head.get(0)?.start();
        let kind = MarkerKind::from_tag(&head[1])?;

        let captures = match OPENING_TAG.captures_at(self.text, start) {
            Some(captures) if captures.get(0).is_some_and(|m| m.start() == start) => captures,
            // An unclosed quote or a missing `]`. Report the tag up to the
            // next `]` or line break and resume after it.
            _ => {
                let end = self.text[start + 1..]
                    .find([']', '\n'])
                    .map_or(self.text.len(), |index| {
                        let at = start + 1 + index;
                        if self.text.as_bytes()[at] == b']' { at + 1 } else { at }
                    });
                self.position = end;
                let reason = if self.text[start..end].matches('"').count() % 2 == 1 {
                    "unterminated attribute quote"
                } else {
                    "missing closing ']'"
                };
                let error = ClipmarkError::MalformedMarker {
                    tag: kind.tag().to_string(),
                    offset: start,
                    reason: reason.to_string(),
                };
                return Some((start..end, Err(error)));
            }
        };
        let attributes = captures.get(2).map_or("", |m| m.as_str());
        let open_end = captures.get(0)?.end();

        // Only look for the closing tag up to the next opening tag.
        let search_end = TAG_HEAD
            .find_at(self.text, open_end)
            .map_or(self.text.len(), |m| m.start());
        let closing_tag = format!("[/{}]", kind.tag());
        let (body, end) = match self.text[open_end..search_end].find(&closing_tag) {
            Some(index) => (
                Some(&self.text[open_end..open_end + index]),
                open_end + index + closing_tag.len(),
            ),
            None => (None, open_end),
        };

        self.position = end;
        let result = self.build_marker(kind, start, end, attributes, body);
        Some((start..end, result))
    }

    fn build_marker(
        &mut self,
        kind: MarkerKind,
        offset: usize,
        end: usize,
        attribute_text: &str,
        body: Option<&str>,
    ) -> Result<Marker, ClipmarkError> {
        let malformed = |reason: String| ClipmarkError::MalformedMarker {
            tag: kind.tag().to_string(),
            offset,
            reason,
        };

        let attributes = parse_attributes(attribute_text);

        let timestamp_text = attributes
            .get("timestamp")
            .ok_or_else(|| malformed("missing required attribute \"timestamp\"".to_string()))?;
        let timestamp = parse_timestamp(timestamp_text)
            .map_err(|error| malformed(format!("bad timestamp: {error}")))?;

        let duration = match (kind, attributes.get("duration")) {
            (MarkerKind::Clip, Some(text)) => Some(
                parse_timestamp(text).map_err(|error| malformed(format!("bad duration: {error}")))?,
            ),
            (MarkerKind::Clip, None) => {
                return Err(malformed("missing required attribute \"duration\"".to_string()));
            }
            (MarkerKind::Screenshot, Some(_)) => {
                self.warn(format!(
                    "Ignoring \"duration\" on [SCREENSHOT] marker at offset {offset}"
                ));
                None
            }
            (MarkerKind::Screenshot, None) => None,
        };

        let alignment = match attributes.get("align").or_else(|| attributes.get("alignment")) {
            Some(value) => value.parse::<Alignment>().map_err(malformed)?,
            None => Alignment::default(),
        };

        let caption = body
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .or_else(|| {
                attributes
                    .get("caption")
                    .map(|text| text.trim())
                    .filter(|text| !text.is_empty())
            })
            .map(str::to_string);

        self.check_duplicate(kind, timestamp, offset)?;

        let marker = Marker {
            kind,
            timestamp,
            duration,
            alignment,
            caption,
            source_offset: offset,
            source_end: end,
        };
        log::debug!("Found marker: {marker}");
        Ok(marker)
    }

    fn check_duplicate(
        &mut self,
        kind: MarkerKind,
        timestamp: Duration,
        offset: usize,
    ) -> Result<(), ClipmarkError> {
        let Some(&first_offset) = self.seen.get(&(kind, timestamp)) else {
            self.seen.insert((kind, timestamp), offset);
            return Ok(());
        };

        match self.options.duplicate_policy {
            DuplicatePolicy::Allow => Ok(()),
            DuplicatePolicy::Warn => {
                self.warn(format!(
                    "Duplicate timestamp {} for [{}] markers at offsets {first_offset} and {offset}",
                    format_timestamp(timestamp),
                    kind.tag(),
                ));
                Ok(())
            }
            DuplicatePolicy::Error => Err(ClipmarkError::DuplicateTimestamp {
                tag: kind.tag().to_string(),
                offset,
                timestamp,
            }),
        }
    }

    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.warnings.push(message);
    }
}

impl Iterator for MarkerScanner<'_> {
    type Item = Result<Marker, ClipmarkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with_span().map(|(_, result)| result)
    }
}

impl FusedIterator for MarkerScanner<'_> {}

/// Collect `name="value"` pairs. Names are lower-cased; the first
/// occurrence of a name wins.
fn parse_attributes(text: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for captures in ATTRIBUTE.captures_iter(text) {
        let name = captures[1].to_ascii_lowercase();
        let value = captures
            .get(2)
            .or_else(|| captures.get(3))
            .map_or("", |m| m.as_str());
        attributes.entry(name).or_insert_with(|| value.to_string());
    }
    attributes
}
