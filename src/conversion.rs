//! Internal conversion helpers.
//!
//! Timestamp rescaling between [`Duration`], FFmpeg stream time bases and
//! `AV_TIME_BASE`, plus pixel-plane copying for decoded frames.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of a packed RGB24 frame into a tightly-packed
/// buffer, dropping per-row padding.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_len = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_len {
        data[..row_len * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_len * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_len]);
        }
        buffer
    }
}

/// Rescale a PTS value from a stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Convert a [`Duration`] to a PTS in the given stream time base.
pub(crate) fn duration_to_stream_timestamp(duration: Duration, time_base: Rational) -> i64 {
    if time_base.numerator() == 0 {
        return 0;
    }
    let seconds = duration.as_secs_f64();
    (seconds * time_base.denominator() as f64 / time_base.numerator() as f64).round() as i64
}

/// Convert a [`Duration`] to a container seek target in `AV_TIME_BASE`
/// (microseconds), as expected by `Input::seek`.
pub(crate) fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    duration.as_micros() as i64
}
