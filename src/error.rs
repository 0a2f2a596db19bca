//! Error types for the `clipmark` crate.
//!
//! This module defines [`ClipmarkError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry enough context (tag
//! name, byte offset, requested timestamp, file path) to locate the
//! offending marker in the source document or the failing input on disk.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `clipmark` operations.
///
/// Marker-level variants ([`MalformedMarker`](ClipmarkError::MalformedMarker),
/// [`SeekOutOfRange`](ClipmarkError::SeekOutOfRange), ...) only abort the
/// marker they belong to. [`FileAccess`](ClipmarkError::FileAccess) on the
/// primary inputs aborts a whole run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClipmarkError {
    /// A timestamp string matched none of the accepted shapes.
    #[error("Invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp {
        /// The text that failed to parse.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A marker tag was found but could not be turned into a marker.
    #[error("Malformed [{tag}] marker at offset {offset}: {reason}")]
    MalformedMarker {
        /// Tag name (`CLIP` or `SCREENSHOT`).
        tag: String,
        /// Byte offset of the opening `[` in the document.
        offset: usize,
        /// What was wrong with the tag.
        reason: String,
    },

    /// A marker repeats the timestamp of an earlier marker of the same kind
    /// and the duplicate policy forbids it.
    #[error("Duplicate timestamp {timestamp:?} for [{tag}] marker at offset {offset}")]
    DuplicateTimestamp {
        /// Tag name (`CLIP` or `SCREENSHOT`).
        tag: String,
        /// Byte offset of the later marker.
        offset: usize,
        /// The repeated timestamp.
        timestamp: Duration,
    },

    /// The requested position lies beyond the end of the video.
    #[error("Seek to {requested:?} is out of range (video lasts {duration:?})")]
    SeekOutOfRange {
        /// End of the requested range (the timestamp for screenshots).
        requested: Duration,
        /// Duration reported by the video metadata.
        duration: Duration,
    },

    /// A video frame could not be decoded.
    #[error("Failed to decode video: {0}")]
    DecodeError(String),

    /// A clip could not be encoded or written.
    #[error("Failed to encode clip: {0}")]
    EncodeError(String),

    /// A clip was requested with a zero duration.
    #[error("Invalid clip duration: {0:?} (must be greater than zero)")]
    InvalidDuration(Duration),

    /// A primary input (document or video) is missing or unreadable.
    #[error("Cannot access {path}: {reason}")]
    FileAccess {
        /// Path that could not be accessed.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The video file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken)
    /// before this marker was processed.
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while writing a screenshot.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for ClipmarkError {
    fn from(error: FfmpegError) -> Self {
        ClipmarkError::FfmpegError(error.to_string())
    }
}
