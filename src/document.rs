//! Blog documents.
//!
//! A [`Document`] is the blog text split into an ordered list of
//! [`Segment`]s: plain text, successfully parsed markers, and tags that
//! looked like markers but could not be parsed. Concatenating the raw text
//! of all segments gives back the original document.

use std::fs;
use std::path::Path;

use crate::configuration::ScanOptions;
use crate::error::ClipmarkError;
use crate::marker::Marker;
use crate::scanner::MarkerScanner;

/// One piece of a [`Document`], in original order.
#[derive(Debug)]
pub enum Segment {
    /// Text between markers, verbatim.
    Text(String),
    /// A parsed marker and the source text it replaced.
    Marker {
        /// The parsed marker.
        marker: Marker,
        /// Original tag text, closing tag included.
        raw: String,
    },
    /// A tag that could not be parsed.
    Malformed {
        /// Byte offset of the opening `[`.
        offset: usize,
        /// Original tag text.
        raw: String,
        /// Why parsing failed.
        error: ClipmarkError,
    },
}

impl Segment {
    /// The source text this segment covers.
    pub fn raw(&self) -> &str {
        match self {
            Segment::Text(text) => text,
            Segment::Marker { raw, .. } | Segment::Malformed { raw, .. } => raw,
        }
    }
}

/// A scanned blog document.
///
/// # Example
///
/// ```
/// use clipmark::{Document, ScanOptions};
///
/// let text = "Before [CLIP timestamp=\"10\" duration=\"5\"]Demo[/CLIP] after";
/// let document = Document::parse(text, ScanOptions::default());
///
/// assert_eq!(document.markers().count(), 1);
/// assert_eq!(document.to_source(), text);
/// ```
#[derive(Debug, Default)]
pub struct Document {
    segments: Vec<Segment>,
    warnings: Vec<String>,
}

impl Document {
    /// Split `text` into segments by scanning it for markers.
    pub fn parse(text: &str, options: ScanOptions) -> Self {
        let mut scanner = MarkerScanner::new(text, options);
        let mut segments = Vec::new();
        let mut cursor = 0;

        while let Some((span, result)) = scanner.next_with_span() {
            if span.start > cursor {
                segments.push(Segment::Text(text[cursor..span.start].to_string()));
            }
            let raw = text[span.clone()].to_string();
            segments.push(match result {
                Ok(marker) => Segment::Marker { marker, raw },
                Err(error) => {
                    log::error!("{error}");
                    Segment::Malformed {
                        offset: span.start,
                        raw,
                        error,
                    }
                }
            });
            cursor = span.end;
        }

        if cursor < text.len() {
            segments.push(Segment::Text(text[cursor..].to_string()));
        }

        let warnings = scanner.into_warnings();
        log::debug!(
            "Scanned document: {} segments, {} warnings",
            segments.len(),
            warnings.len()
        );

        Self { segments, warnings }
    }

    /// Read a UTF-8 document from disk and parse it.
    ///
    /// # Errors
    ///
    /// Returns [`ClipmarkError::FileAccess`] if the file is missing,
    /// unreadable, or not valid UTF-8.
    pub fn read<P: AsRef<Path>>(path: P, options: ScanOptions) -> Result<Self, ClipmarkError> {
        let text = read_document_text(path)?;
        Ok(Self::parse(&text, options))
    }

    /// All segments in document order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parsed markers in document order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Marker { marker, .. } => Some(marker),
            _ => None,
        })
    }

    /// Tags that failed to parse, with their errors.
    pub fn malformed(&self) -> impl Iterator<Item = &ClipmarkError> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Malformed { error, .. } => Some(error),
            _ => None,
        })
    }

    /// Non-fatal scan warnings (duplicate timestamps and the like).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Rebuild the original text from the segments.
    pub fn to_source(&self) -> String {
        self.segments.iter().map(Segment::raw).collect()
    }

    /// Consume the document, keeping only the parse errors of malformed
    /// tags.
    pub fn into_malformed(self) -> Vec<ClipmarkError> {
        self.segments
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Malformed { error, .. } => Some(error),
                _ => None,
            })
            .collect()
    }
}

/// Read a document file as UTF-8 text.
///
/// # Errors
///
/// Returns [`ClipmarkError::FileAccess`] naming the path on any failure.
pub fn read_document_text<P: AsRef<Path>>(path: P) -> Result<String, ClipmarkError> {
    let path = path.as_ref();
    log::debug!("Reading document: {}", path.display());
    fs::read_to_string(path).map_err(|error| ClipmarkError::FileAccess {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}
