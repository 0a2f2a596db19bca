//! Video clip extraction.
//!
//! [`ClipWriter`] cuts a time range out of a [`VideoSource`] and writes it
//! as a standalone MP4. Video is decoded and re-encoded to H.264 so the clip
//! starts on a keyframe at the requested time; the audio range is stream
//! copied with shifted timestamps.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use clipmark::{ClipOptions, ClipWriter, VideoSource};
//!
//! let mut source = VideoSource::open("talk.mp4")?;
//! ClipWriter::new(&mut source, ClipOptions::default().crf(28)).write(
//!     Duration::from_secs(90),
//!     Duration::from_secs(15),
//!     "demo.mp4",
//! )?;
//! # Ok::<(), clipmark::ClipmarkError>(())
//! ```

use std::{fs, path::Path, time::Duration};

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    encoder::video::Encoder as OpenedVideoEncoder,
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{
    configuration::ClipOptions,
    conversion::{duration_to_seek_timestamp, duration_to_stream_timestamp},
    error::ClipmarkError,
    source::VideoSource,
};

/// Writes clips from an opened [`VideoSource`].
pub struct ClipWriter<'a> {
    source: &'a mut VideoSource,
    options: ClipOptions,
}

/// The encoded video track of an output clip.
struct VideoTrack {
    encoder: OpenedVideoEncoder,
    stream_index: usize,
    /// Time base of the source stream, shared by the encoder.
    time_base: Rational,
    /// Time base the muxer settled on after writing the header.
    output_time_base: Rational,
    /// Length of one frame in `time_base` units, zero when unknown.
    frame_duration: i64,
    frames_written: u64,
}

impl VideoTrack {
    fn encode(&mut self, frame: &VideoFrame, output: &mut Output) -> Result<(), ClipmarkError> {
        self.encoder
            .send_frame(frame)
            .map_err(|error| ClipmarkError::EncodeError(format!("send_frame failed: {error}")))?;
        self.frames_written += 1;
        self.drain(output)
    }

    fn finish(&mut self, output: &mut Output) -> Result<(), ClipmarkError> {
        self.encoder
            .send_eof()
            .map_err(|error| ClipmarkError::EncodeError(format!("send_eof failed: {error}")))?;
        self.drain(output)
    }

    fn drain(&mut self, output: &mut Output) -> Result<(), ClipmarkError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            if packet.duration() == 0 && self.frame_duration > 0 {
                packet.set_duration(self.frame_duration);
            }
            packet.rescale_ts(self.time_base, self.output_time_base);
            packet.write_interleaved(output).map_err(|error| {
                ClipmarkError::EncodeError(format!("write packet failed: {error}"))
            })?;
        }
        Ok(())
    }
}

/// The stream-copied audio track of an output clip.
struct AudioTrack {
    input_index: usize,
    stream_index: usize,
    time_base: Rational,
    output_time_base: Rational,
    start_pts: i64,
    end_pts: i64,
    done: bool,
}

impl AudioTrack {
    fn copy(&mut self, mut packet: Packet, output: &mut Output) -> Result<(), ClipmarkError> {
        let Some(pts) = packet.pts() else {
            return Ok(());
        };
        if pts >= self.end_pts {
            self.done = true;
            return Ok(());
        }
        if pts < self.start_pts {
            return Ok(());
        }

        packet.set_pts(Some(pts - self.start_pts));
        packet.set_dts(packet.dts().map(|dts| (dts - self.start_pts).max(0)));
        packet.set_stream(self.stream_index);
        packet.rescale_ts(self.time_base, self.output_time_base);
        packet.set_position(-1);
        packet.write_interleaved(output).map_err(|error| {
            ClipmarkError::EncodeError(format!("write audio packet failed: {error}"))
        })
    }
}

impl<'a> ClipWriter<'a> {
    /// Create a writer over `source` with the given encoding settings.
    pub fn new(source: &'a mut VideoSource, options: ClipOptions) -> Self {
        Self { source, options }
    }

    /// Write the range `[start, start + duration)` to `path`.
    ///
    /// # Errors
    ///
    /// - [`ClipmarkError::InvalidDuration`] if `duration` is zero.
    /// - [`ClipmarkError::SeekOutOfRange`] if the range ends after the video.
    /// - [`ClipmarkError::NoVideoStream`] if the source has no video.
    /// - [`ClipmarkError::EncodeError`] if the encoder or muxer fails, or
    ///   the range contained no decodable frames.
    pub fn write<P: AsRef<Path>>(
        &mut self,
        start: Duration,
        duration: Duration,
        path: P,
    ) -> Result<(), ClipmarkError> {
        let path = path.as_ref();

        if duration.is_zero() {
            return Err(ClipmarkError::InvalidDuration(duration));
        }

        let video_duration = self.source.metadata.duration;
        let end = start.saturating_add(duration);
        if end > video_duration {
            return Err(ClipmarkError::SeekOutOfRange {
                requested: end,
                duration: video_duration,
            });
        }

        log::info!(
            "Writing clip {:?}..{:?} to {} (crf={}, preset={})",
            start,
            end,
            path.display(),
            self.options.crf,
            self.options.preset,
        );

        // Fail before anything is created on disk.
        self.source.video_stream_index()?;

        let mut output = ffmpeg_next::format::output(path)
            .map_err(|error| ClipmarkError::EncodeError(format!("cannot open output: {error}")))?;

        match self.encode_range(&mut output, start, end) {
            Ok(frames_written) => {
                log::debug!("Wrote clip {} ({frames_written} frames)", path.display());
                Ok(())
            }
            Err(error) => {
                drop(output);
                if let Err(remove_error) = fs::remove_file(path) {
                    log::warn!(
                        "Could not remove partial clip {}: {remove_error}",
                        path.display()
                    );
                }
                Err(error)
            }
        }
    }

    /// Decode `[start, end)` and mux it into `output`, trailer included.
    /// Returns the number of video frames written.
    fn encode_range(
        &mut self,
        output: &mut Output,
        start: Duration,
        end: Duration,
    ) -> Result<u64, ClipmarkError> {
        let video_index = self.source.video_stream_index()?;
        let (time_base, frame_rate, mut decoder) = {
            let stream = self
                .source
                .input_context
                .stream(video_index)
                .ok_or(ClipmarkError::NoVideoStream)?;
            let decoder = CodecContext::from_parameters(stream.parameters())?
                .decoder()
                .video()
                .map_err(|error| ClipmarkError::DecodeError(error.to_string()))?;
            (stream.time_base(), stream.avg_frame_rate(), decoder)
        };

        let audio_input = if self.options.include_audio {
            self.source
                .metadata
                .audio
                .as_ref()
                .and_then(|audio| self.source.input_context.stream(audio.stream_index))
                .map(|stream| (stream.index(), stream.time_base(), stream.parameters()))
        } else {
            None
        };

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(Id::H264)
            .ok_or_else(|| ClipmarkError::EncodeError("H.264 encoder not available".to_string()))?;

        let (video_out_index, encoder) = {
            let mut stream = output.add_stream(codec).map_err(|error| {
                ClipmarkError::EncodeError(format!("cannot add video stream: {error}"))
            })?;

            let mut encoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.encoder().video())
                .map_err(|error| {
                    ClipmarkError::EncodeError(format!("cannot create video encoder: {error}"))
                })?;

            encoder.set_width(decoder.width());
            encoder.set_height(decoder.height());
            encoder.set_format(Pixel::YUV420P);
            encoder.set_time_base(time_base);
            if frame_rate.numerator() > 0 && frame_rate.denominator() > 0 {
                encoder.set_frame_rate(Some(frame_rate));
            }

            if needs_global_header {
                unsafe {
                    (*encoder.as_mut_ptr()).flags |=
                        ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
                }
            }

            let mut encoder_options = Dictionary::new();
            encoder_options.set("crf", &self.options.crf.to_string());
            encoder_options.set("preset", &self.options.preset);

            let encoder = encoder
                .open_as_with(codec, encoder_options)
                .map_err(|error| {
                    ClipmarkError::EncodeError(format!("cannot open encoder: {error}"))
                })?;

            stream.set_parameters(&encoder);
            stream.set_time_base(time_base);
            (stream.index(), encoder)
        };

        let audio_out_index = match &audio_input {
            Some((_, audio_time_base, parameters)) => {
                let mut stream = output
                    .add_stream(ffmpeg_next::encoder::find(Id::None))
                    .map_err(|error| {
                        ClipmarkError::EncodeError(format!("cannot add audio stream: {error}"))
                    })?;
                stream.set_parameters(parameters.clone());
                stream.set_time_base(*audio_time_base);
                // Let the muxer pick a tag valid for MP4.
                unsafe {
                    (*stream.parameters().as_mut_ptr()).codec_tag = 0;
                }
                Some(stream.index())
            }
            None => None,
        };

        output
            .write_header()
            .map_err(|error| ClipmarkError::EncodeError(format!("cannot write header: {error}")))?;

        let output_time_base = |output: &Output, index: usize| {
            output
                .stream(index)
                .map(|stream| stream.time_base())
                .ok_or_else(|| ClipmarkError::EncodeError(format!("output stream {index} missing")))
        };

        let mut video_track = VideoTrack {
            encoder,
            stream_index: video_out_index,
            time_base,
            output_time_base: output_time_base(&*output, video_out_index)?,
            frame_duration: frame_duration(frame_rate, time_base),
            frames_written: 0,
        };

        let mut audio_track = match (audio_input, audio_out_index) {
            (Some((input_index, audio_time_base, _)), Some(stream_index)) => Some(AudioTrack {
                input_index,
                stream_index,
                time_base: audio_time_base,
                output_time_base: output_time_base(&*output, stream_index)?,
                start_pts: duration_to_stream_timestamp(start, audio_time_base),
                end_pts: duration_to_stream_timestamp(end, audio_time_base),
                done: false,
            }),
            _ => None,
        };

        let mut scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::YUV420P,
            decoder.width(),
            decoder.height(),
            ScalingFlags::BILINEAR,
        )?;

        let start_pts = duration_to_stream_timestamp(start, time_base);
        let end_pts = duration_to_stream_timestamp(end, time_base);
        let seek_target = duration_to_seek_timestamp(start);
        self.source
            .input_context
            .seek(seek_target, ..seek_target)?;

        let mut decoded_frame = VideoFrame::empty();
        let mut video_done = false;

        // Scales and encodes decoded frames inside the range. Returns true
        // once a frame at or past the end has been seen.
        let mut encode_pending = |decoder: &mut ffmpeg_next::decoder::Video,
                                  track: &mut VideoTrack,
                                  output: &mut Output|
         -> Result<bool, ClipmarkError> {
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.timestamp().unwrap_or(0);
                if pts >= end_pts {
                    return Ok(true);
                }
                if pts < start_pts {
                    continue;
                }
                let mut scaled_frame = VideoFrame::empty();
                scaler.run(&decoded_frame, &mut scaled_frame)?;
                scaled_frame.set_pts(Some(pts - start_pts));
                track.encode(&scaled_frame, output)?;
            }
            Ok(false)
        };

        for (stream, packet) in self.source.input_context.packets() {
            let index = stream.index();

            if index == video_index && !video_done {
                decoder
                    .send_packet(&packet)
                    .map_err(|error| ClipmarkError::DecodeError(error.to_string()))?;
                video_done = encode_pending(&mut decoder, &mut video_track, &mut *output)?;
            } else if let Some(track) = audio_track.as_mut() {
                if index == track.input_index && !track.done {
                    track.copy(packet, output)?;
                }
            }

            let audio_done = audio_track.as_ref().is_none_or(|track| track.done);
            if video_done && audio_done {
                break;
            }
        }

        if !video_done {
            decoder
                .send_eof()
                .map_err(|error| ClipmarkError::DecodeError(error.to_string()))?;
            encode_pending(&mut decoder, &mut video_track, &mut *output)?;
        }

        video_track.finish(output)?;

        if video_track.frames_written == 0 {
            return Err(ClipmarkError::EncodeError(format!(
                "no frames decoded between {start:?} and {end:?}"
            )));
        }

        output
            .write_trailer()
            .map_err(|error| ClipmarkError::EncodeError(format!("cannot write trailer: {error}")))?;

        Ok(video_track.frames_written)
    }
}

/// One frame at `frame_rate`, expressed in `time_base` units.
fn frame_duration(frame_rate: Rational, time_base: Rational) -> i64 {
    let denominator = i64::from(frame_rate.numerator()) * i64::from(time_base.numerator());
    if denominator <= 0 {
        return 0;
    }
    i64::from(frame_rate.denominator()) * i64::from(time_base.denominator()) / denominator
}
