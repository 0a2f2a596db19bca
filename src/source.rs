//! Opened source videos.
//!
//! [`VideoSource`] owns the FFmpeg demuxer for the whole of a run. The
//! handle is released when the value is dropped, whether the run succeeded
//! or not.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::{
    error::ClipmarkError,
    metadata::{AudioMetadata, MediaMetadata, VideoMetadata},
};

/// An opened video file with cached metadata.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use clipmark::VideoSource;
///
/// let mut source = VideoSource::open("talk.mp4")?;
/// println!("Duration: {:?}", source.metadata().duration);
/// source.screenshot().save_at(Duration::from_secs(5), "frame.jpg")?;
/// # Ok::<(), clipmark::ClipmarkError>(())
/// ```
pub struct VideoSource {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input_context: Input,
    /// Cached metadata extracted at open time.
    pub(crate) metadata: MediaMetadata,
    /// Path the source was opened from.
    pub(crate) file_path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("metadata", &self.metadata)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the container, and reads
    /// duration plus the best video and audio stream parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ClipmarkError::FileAccess`] if the path does not exist or
    /// FFmpeg cannot open it as media.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ClipmarkError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();
        let access_error = |reason: String| ClipmarkError::FileAccess {
            path: file_path.clone(),
            reason,
        };

        log::debug!("Opening video: {}", file_path.display());

        if !path.exists() {
            return Err(access_error("file does not exist".to_string()));
        }

        ffmpeg_next::init()
            .map_err(|error| access_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context = ffmpeg_next::format::input(&path)
            .map_err(|error| access_error(error.to_string()))?;

        let container_duration = input_context.duration();
        let mut duration = if container_duration > 0 {
            Duration::from_micros(container_duration as u64)
        } else {
            Duration::ZERO
        };

        let format = input_context.format().name().to_string();

        let video = match input_context.streams().best(Type::Video) {
            Some(stream) => {
                let index = stream.index();
                let decoder = CodecContext::from_parameters(stream.parameters())
                    .and_then(|context| context.decoder().video())
                    .map_err(|error| {
                        access_error(format!("cannot read video stream {index}: {error}"))
                    })?;

                let rate = stream.avg_frame_rate();
                let fallback = stream.rate();
                let frames_per_second = if rate.denominator() != 0 && rate.numerator() != 0 {
                    rate.numerator() as f64 / rate.denominator() as f64
                } else if fallback.denominator() != 0 {
                    fallback.numerator() as f64 / fallback.denominator() as f64
                } else {
                    0.0
                };

                // Some containers only carry a per-stream duration.
                if duration.is_zero() && stream.duration() > 0 {
                    let seconds =
                        crate::conversion::pts_to_seconds(stream.duration(), stream.time_base());
                    duration = Duration::from_secs_f64(seconds.max(0.0));
                }

                Some(VideoMetadata {
                    width: decoder.width(),
                    height: decoder.height(),
                    frames_per_second,
                    codec: decoder
                        .codec()
                        .map(|codec| codec.name().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    stream_index: index,
                })
            }
            None => None,
        };

        let audio = input_context
            .streams()
            .best(Type::Audio)
            .and_then(|stream| {
                let index = stream.index();
                let decoder = CodecContext::from_parameters(stream.parameters())
                    .and_then(|context| context.decoder().audio())
                    .ok()?;
                Some(AudioMetadata {
                    sample_rate: decoder.rate(),
                    channels: decoder.channels(),
                    codec: decoder
                        .codec()
                        .map(|codec| codec.name().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    stream_index: index,
                })
            });

        let metadata = MediaMetadata {
            duration,
            format,
            video,
            audio,
        };

        log::info!(
            "Opened video: {} (format={}, duration={:.2}s, video={}, audio={})",
            file_path.display(),
            metadata.format,
            metadata.duration.as_secs_f64(),
            metadata.video.is_some(),
            metadata.audio.is_some(),
        );

        if let Some(video) = &metadata.video {
            log::debug!(
                "Video stream: index={}, {}x{}, {:.2} fps, codec={}",
                video.stream_index,
                video.width,
                video.height,
                video.frames_per_second,
                video.codec,
            );
        }

        Ok(Self {
            input_context,
            metadata,
            file_path,
        })
    }

    /// Cached metadata.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// File stem of the source, used to name the media directory.
    pub fn stem(&self) -> String {
        self.file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string())
    }

    /// Obtain a [`ScreenshotHandle`](crate::ScreenshotHandle) for still
    /// frame extraction.
    pub fn screenshot(&mut self) -> crate::screenshot::ScreenshotHandle<'_> {
        crate::screenshot::ScreenshotHandle { source: self }
    }

    /// Index of the video stream, or [`ClipmarkError::NoVideoStream`].
    pub(crate) fn video_stream_index(&self) -> Result<usize, ClipmarkError> {
        self.metadata
            .video
            .as_ref()
            .map(|video| video.stream_index)
            .ok_or(ClipmarkError::NoVideoStream)
    }
}
