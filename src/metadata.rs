//! Video metadata types.
//!
//! Metadata is read once when a [`VideoSource`](crate::VideoSource) is
//! opened and is used to bounds-check marker timestamps before any seeking
//! or decoding happens.

use std::time::Duration;

/// Container-level metadata for a source video.
///
/// # Example
///
/// ```no_run
/// use clipmark::MediaProbe;
///
/// let metadata = MediaProbe::probe("talk.mp4")?;
/// println!("Duration: {:?}", metadata.duration);
/// if let Some(video) = &metadata.video {
///     println!("{}x{} @ {:.2} fps", video.width, video.height, video.frames_per_second);
/// }
/// # Ok::<(), clipmark::ClipmarkError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// Total duration of the file.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
    /// The best video stream, if any.
    pub video: Option<VideoMetadata>,
    /// The best audio stream, if any.
    pub audio: Option<AudioMetadata>,
}

impl MediaMetadata {
    /// Length of one frame, when the frame rate is known.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.video
            .as_ref()
            .filter(|video| video.frames_per_second > 0.0)
            .map(|video| Duration::from_secs_f64(1.0 / video.frames_per_second))
    }
}

/// Metadata for the video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second (approximate for variable frame rate).
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
    /// Index of the stream inside the container.
    pub stream_index: usize,
}

/// Metadata for the audio stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct AudioMetadata {
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Codec name (e.g. `"aac"`, `"opus"`).
    pub codec: String,
    /// Index of the stream inside the container.
    pub stream_index: usize,
}
