//! Still frame extraction.
//!
//! [`ScreenshotHandle`] decodes the first frame at or after a requested
//! timestamp and converts it to an [`image::DynamicImage`]. Obtain one via
//! [`VideoSource::screenshot`](crate::VideoSource::screenshot).

use std::{path::Path, time::Duration};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{error::ClipmarkError, source::VideoSource};

/// Screenshot extractor bound to an opened [`VideoSource`].
///
/// Each call creates a fresh decoder, seeks to the nearest keyframe before
/// the target and decodes forward, so calls are independent of each other
/// and may target timestamps in any order.
pub struct ScreenshotHandle<'a> {
    pub(crate) source: &'a mut VideoSource,
}

impl<'a> ScreenshotHandle<'a> {
    /// Decode the frame shown at `timestamp`.
    ///
    /// Returns the first frame whose presentation time is at or after the
    /// target, which is exact for constant frame rate sources.
    ///
    /// # Errors
    ///
    /// - [`ClipmarkError::SeekOutOfRange`] if `timestamp` is past the end of
    ///   the video.
    /// - [`ClipmarkError::NoVideoStream`] if the file has no video.
    /// - [`ClipmarkError::DecodeError`] if no frame could be decoded.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use clipmark::VideoSource;
    ///
    /// let mut source = VideoSource::open("talk.mp4")?;
    /// let image = source.screenshot().frame_at(Duration::from_secs(42))?;
    /// println!("{}x{}", image.width(), image.height());
    /// # Ok::<(), clipmark::ClipmarkError>(())
    /// ```
    pub fn frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, ClipmarkError> {
        let duration = self.source.metadata.duration;
        if timestamp > duration {
            return Err(ClipmarkError::SeekOutOfRange {
                requested: timestamp,
                duration,
            });
        }

        let video_stream_index = self.source.video_stream_index()?;

        let stream = self
            .source
            .input_context
            .stream(video_stream_index)
            .ok_or(ClipmarkError::NoVideoStream)?;
        let time_base = stream.time_base();
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| ClipmarkError::DecodeError(error.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let target_pts = crate::conversion::duration_to_stream_timestamp(timestamp, time_base);
        let seek_target = crate::conversion::duration_to_seek_timestamp(timestamp);
        self.source
            .input_context
            .seek(seek_target, ..seek_target)?;

        log::debug!(
            "Seeking for screenshot at {:?} (stream pts {target_pts})",
            timestamp
        );

        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();
        let mut fallback: Option<VideoFrame> = None;

        for (stream, packet) in self.source.input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }

            decoder
                .send_packet(&packet)
                .map_err(|error| ClipmarkError::DecodeError(error.to_string()))?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.timestamp().unwrap_or(0);
                if pts >= target_pts {
                    scaler.run(&decoded_frame, &mut rgb_frame)?;
                    return frame_to_image(&rgb_frame, width, height);
                }
                fallback = Some(decoded_frame.clone());
            }
        }

        decoder
            .send_eof()
            .map_err(|error| ClipmarkError::DecodeError(error.to_string()))?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let pts = decoded_frame.timestamp().unwrap_or(0);
            if pts >= target_pts {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                return frame_to_image(&rgb_frame, width, height);
            }
            fallback = Some(decoded_frame.clone());
        }

        // A timestamp equal to the duration lies after the last frame's pts.
        if let Some(last_frame) = fallback {
            scaler.run(&last_frame, &mut rgb_frame)?;
            return frame_to_image(&rgb_frame, width, height);
        }

        Err(ClipmarkError::DecodeError(format!(
            "no frame could be decoded at {timestamp:?}"
        )))
    }

    /// Decode the frame at `timestamp` and write it to `path`.
    ///
    /// The image format is inferred from the file extension.
    ///
    /// # Errors
    ///
    /// Returns errors from [`frame_at`](ScreenshotHandle::frame_at), or
    /// [`ClipmarkError::ImageError`] if the image cannot be written.
    pub fn save_at<P: AsRef<Path>>(
        &mut self,
        timestamp: Duration,
        path: P,
    ) -> Result<(), ClipmarkError> {
        let image = self.frame_at(timestamp)?;
        image.save(path.as_ref())?;
        log::debug!("Wrote screenshot {}", path.as_ref().display());
        Ok(())
    }
}

/// Convert a scaled RGB24 frame to a [`DynamicImage`].
fn frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, ClipmarkError> {
    let buffer = crate::conversion::frame_to_rgb_buffer(rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        ClipmarkError::DecodeError(
            "failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
