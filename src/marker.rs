//! Marker types.
//!
//! A [`Marker`] is one `[CLIP ...]` or `[SCREENSHOT ...]` directive found in
//! a blog document. Markers are produced by the
//! [`MarkerScanner`](crate::MarkerScanner) and never change afterwards.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use crate::timestamp::format_timestamp;

/// What kind of media a marker asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// A re-encoded video sub-range.
    Clip,
    /// A single still frame.
    Screenshot,
}

impl MarkerKind {
    /// The tag name used in documents (`CLIP` or `SCREENSHOT`).
    pub fn tag(self) -> &'static str {
        match self {
            MarkerKind::Clip => "CLIP",
            MarkerKind::Screenshot => "SCREENSHOT",
        }
    }

    /// Map a case-sensitive tag name back to a kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CLIP" => Some(MarkerKind::Clip),
            "SCREENSHOT" => Some(MarkerKind::Screenshot),
            _ => None,
        }
    }
}

impl Display for MarkerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MarkerKind::Clip => write!(f, "clip"),
            MarkerKind::Screenshot => write!(f, "screenshot"),
        }
    }
}

/// Horizontal placement of a figure in the generated post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    /// Float to the left edge.
    Left,
    /// Centered (the default).
    #[default]
    Center,
    /// Float to the right edge.
    Right,
}

impl Alignment {
    /// CSS class suffix (`left`, `center`, `right`).
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "center" | "centre" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            other => Err(format!("unknown alignment {other:?} (expected left, center or right)")),
        }
    }
}

impl Display for Alignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A parsed media directive.
///
/// `source_offset` is the byte offset of the opening `[` and is unique per
/// document; markers from one scan are strictly ordered by it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Marker {
    /// Clip or screenshot.
    pub kind: MarkerKind,
    /// Position in the source video.
    pub timestamp: Duration,
    /// Clip length. Always `Some` for clips, always `None` for screenshots.
    pub duration: Option<Duration>,
    /// Figure placement.
    pub alignment: Alignment,
    /// Caption text, already trimmed. `None` when empty.
    pub caption: Option<String>,
    /// Byte offset of the opening `[` in the document.
    pub source_offset: usize,
    /// Byte offset one past the end of the marker's source text.
    pub source_end: usize,
}

impl Marker {
    /// End of the requested range (`timestamp + duration` for clips).
    pub fn end(&self) -> Duration {
        self.timestamp
            .saturating_add(self.duration.unwrap_or(Duration::ZERO))
    }

    /// The marker's original text within `document`.
    ///
    /// Returns `None` if `document` is not the text the marker came from.
    pub fn source_text<'a>(&self, document: &'a str) -> Option<&'a str> {
        document.get(self.source_offset..self.source_end)
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} at {}", self.kind, format_timestamp(self.timestamp))?;
        if let Some(duration) = self.duration {
            write!(f, " for {}", format_timestamp(duration))?;
        }
        write!(f, " (offset {})", self.source_offset)
    }
}
