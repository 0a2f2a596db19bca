//! Marker media extraction.
//!
//! [`MediaExtractor`] is the seam between the [`Pipeline`](crate::Pipeline)
//! and whatever produces media files. [`FfmpegExtractor`] is the real
//! implementation; tests and embedders can supply their own.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    clip::ClipWriter,
    configuration::{ClipOptions, ImageFormat},
    error::ClipmarkError,
    marker::{Marker, MarkerKind},
    source::VideoSource,
    timestamp::filename_timestamp,
};

/// Produces screenshot and clip files from one source video.
///
/// Implementations must bounds-check against [`video_duration`] and fail
/// with [`ClipmarkError::SeekOutOfRange`] rather than clamping. Re-running
/// a request overwrites the same output path.
///
/// [`video_duration`]: MediaExtractor::video_duration
pub trait MediaExtractor {
    /// Duration of the source video.
    fn video_duration(&self) -> Duration;

    /// Write the frame shown at `timestamp` to `output`.
    ///
    /// # Errors
    ///
    /// [`ClipmarkError::SeekOutOfRange`] past the end of the video,
    /// [`ClipmarkError::DecodeError`] if no frame can be decoded.
    fn extract_screenshot(
        &mut self,
        timestamp: Duration,
        output: &Path,
    ) -> Result<(), ClipmarkError>;

    /// Write the range `[timestamp, timestamp + duration)` to `output` as a
    /// standalone video.
    ///
    /// # Errors
    ///
    /// [`ClipmarkError::InvalidDuration`] for a zero duration,
    /// [`ClipmarkError::SeekOutOfRange`] if the range ends after the video.
    fn extract_clip(
        &mut self,
        timestamp: Duration,
        duration: Duration,
        output: &Path,
    ) -> Result<(), ClipmarkError>;
}

/// [`MediaExtractor`] backed by FFmpeg.
///
/// Owns the opened [`VideoSource`]; the demuxer is closed when the
/// extractor is dropped.
///
/// # Example
///
/// ```no_run
/// use std::{path::Path, time::Duration};
///
/// use clipmark::{ClipOptions, FfmpegExtractor, MediaExtractor};
///
/// let mut extractor = FfmpegExtractor::open("talk.mp4", ClipOptions::default())?;
/// extractor.extract_screenshot(Duration::from_secs(3), Path::new("still.jpg"))?;
/// # Ok::<(), clipmark::ClipmarkError>(())
/// ```
#[derive(Debug)]
pub struct FfmpegExtractor {
    source: VideoSource,
    clip_options: ClipOptions,
}

impl FfmpegExtractor {
    /// Open `path` and prepare to extract from it.
    ///
    /// # Errors
    ///
    /// Returns [`ClipmarkError::FileAccess`] if the video cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, clip_options: ClipOptions) -> Result<Self, ClipmarkError> {
        Ok(Self::new(VideoSource::open(path)?, clip_options))
    }

    /// Wrap an already opened source.
    pub fn new(source: VideoSource, clip_options: ClipOptions) -> Self {
        Self {
            source,
            clip_options,
        }
    }

    /// The underlying source.
    pub fn source(&self) -> &VideoSource {
        &self.source
    }
}

impl MediaExtractor for FfmpegExtractor {
    fn video_duration(&self) -> Duration {
        self.source.metadata().duration
    }

    fn extract_screenshot(
        &mut self,
        timestamp: Duration,
        output: &Path,
    ) -> Result<(), ClipmarkError> {
        self.source.screenshot().save_at(timestamp, output)
    }

    fn extract_clip(
        &mut self,
        timestamp: Duration,
        duration: Duration,
        output: &Path,
    ) -> Result<(), ClipmarkError> {
        ClipWriter::new(&mut self.source, self.clip_options.clone()).write(
            timestamp, duration, output,
        )
    }
}

/// Outcome of extracting one marker.
#[derive(Debug)]
pub struct ExtractionResult {
    /// The marker that was processed.
    pub marker: Marker,
    /// 1-based position among the document's markers.
    pub ordinal: usize,
    /// Where the media file was (or would have been) written.
    pub output_path: PathBuf,
    /// Why extraction failed, if it did.
    pub error: Option<ClipmarkError>,
}

impl ExtractionResult {
    /// Returns `true` if the media file was written.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The failure with its marker context, if extraction failed.
    pub fn failure(&self) -> Option<MarkerFailure<'_>> {
        self.error.as_ref().map(|error| MarkerFailure {
            marker: &self.marker,
            error,
        })
    }
}

/// A marker error together with the marker it belongs to.
///
/// Displays as `clip at 01:30 for 00:30 (offset 120): <error>`.
#[derive(Debug, Clone, Copy)]
pub struct MarkerFailure<'a> {
    /// The failing marker.
    pub marker: &'a Marker,
    /// What went wrong.
    pub error: &'a ClipmarkError,
}

impl Display for MarkerFailure<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.marker, self.error)
    }
}

/// File name for the media produced by `marker`.
///
/// Names include the ordinal, so two markers at the same timestamp never
/// share a file.
///
/// ```
/// use std::time::Duration;
///
/// use clipmark::{output_file_name, Alignment, ImageFormat, Marker, MarkerKind};
///
/// let marker = Marker {
///     kind: MarkerKind::Screenshot,
///     timestamp: Duration::from_secs(65),
///     duration: None,
///     alignment: Alignment::Center,
///     caption: None,
///     source_offset: 0,
///     source_end: 10,
/// };
/// assert_eq!(
///     output_file_name(&marker, 2, ImageFormat::Jpeg),
///     "screenshot_002_at_0-01-05.jpg"
/// );
/// ```
pub fn output_file_name(marker: &Marker, ordinal: usize, image_format: ImageFormat) -> String {
    let at = filename_timestamp(marker.timestamp);
    match marker.kind {
        MarkerKind::Screenshot => {
            format!("screenshot_{ordinal:03}_at_{at}.{}", image_format.extension())
        }
        MarkerKind::Clip => {
            let length = filename_timestamp(marker.duration.unwrap_or(Duration::ZERO));
            format!("clip_{ordinal:03}_from_{at}_for_{length}.mp4")
        }
    }
}
