//! Metadata probing without keeping the video open.

use std::path::Path;

use crate::{error::ClipmarkError, metadata::MediaMetadata, source::VideoSource};

/// Reads a video's metadata and closes the demuxer again.
///
/// # Example
///
/// ```no_run
/// use clipmark::MediaProbe;
///
/// let metadata = MediaProbe::probe("talk.mp4")?;
/// println!("Duration: {:?}, format: {}", metadata.duration, metadata.format);
/// # Ok::<(), clipmark::ClipmarkError>(())
/// ```
pub struct MediaProbe;

impl MediaProbe {
    /// Probe one file.
    ///
    /// # Errors
    ///
    /// Returns [`ClipmarkError::FileAccess`] if the file cannot be opened as
    /// media.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaMetadata, ClipmarkError> {
        let source = VideoSource::open(path)?;
        Ok(source.metadata().clone())
    }

    /// Probe several files. Failures are returned per file.
    pub fn probe_many<P: AsRef<Path>>(paths: &[P]) -> Vec<Result<MediaMetadata, ClipmarkError>> {
        paths.iter().map(Self::probe).collect()
    }
}
