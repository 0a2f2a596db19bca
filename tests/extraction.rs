//! FFmpeg-backed extraction tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`
//! and return early when they are missing.

use std::{fs, path::Path, time::Duration};

use clipmark::{
    ClipOptions, ClipWriter, ClipmarkError, FfmpegExtractor, MediaExtractor, MediaProbe,
    Pipeline, PipelineOptions, VideoSource,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

/// Skip when the H.264 encoder is not built into the local FFmpeg.
fn encoder_unavailable(result: &Result<(), ClipmarkError>) -> bool {
    match result {
        Err(ClipmarkError::EncodeError(message))
            if message.contains("not available") || message.contains("cannot open encoder") =>
        {
            eprintln!("Skipping: H264 encoder not available ({message})");
            true
        }
        _ => false,
    }
}

#[test]
fn probe_reports_video_and_audio() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let metadata = MediaProbe::probe(path).expect("Failed to probe test video");
    let video = metadata.video.as_ref().expect("fixture has video");
    assert_eq!(video.width, 320);
    assert_eq!(video.height, 240);
    assert!((video.frames_per_second - 30.0).abs() < 0.01);
    assert!(metadata.audio.is_some());
    assert!(metadata.duration >= Duration::from_secs(150));
}

#[test]
fn metadata_for_many_files_is_per_file() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let results = MediaProbe::probe_many(&[path, "tests/fixtures/missing.mp4"]);
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(ClipmarkError::FileAccess { .. })));
}

#[test]
fn open_invalid_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    fs::write(&invalid_file_path, b"this is not a media file").expect("Failed to write file");

    let result = VideoSource::open(&invalid_file_path);
    assert!(matches!(result, Err(ClipmarkError::FileAccess { .. })));
}

#[test]
fn screenshot_at_zero_is_first_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = VideoSource::open(path).expect("Failed to open test video");
    let image = source
        .screenshot()
        .frame_at(Duration::ZERO)
        .expect("Failed to extract first frame");
    assert_eq!(image.width(), 320);
    assert_eq!(image.height(), 240);
}

#[test]
fn screenshot_saved_as_jpeg_and_png() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor =
        FfmpegExtractor::open(path, ClipOptions::default()).expect("Failed to open test video");

    for name in ["still.jpg", "still.png"] {
        let output = temporary_directory.path().join(name);
        extractor
            .extract_screenshot(Duration::from_secs(42), &output)
            .expect("Failed to save screenshot");
        let decoded = image::open(&output).expect("Failed to read screenshot back");
        assert_eq!(decoded.width(), 320);
    }
}

#[test]
fn screenshot_past_end_is_out_of_range() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = VideoSource::open(path).expect("Failed to open test video");
    let result = source.screenshot().frame_at(Duration::from_secs(5400));
    assert!(matches!(result, Err(ClipmarkError::SeekOutOfRange { .. })));
}

#[test]
fn screenshot_at_video_end() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = VideoSource::open(path).expect("Failed to open test video");
    let duration = source.metadata().duration;
    let image = source
        .screenshot()
        .frame_at(duration)
        .expect("last frame should be returned");
    assert_eq!(image.height(), 240);
}

#[test]
fn clip_duration_within_one_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("clip.mp4");

    let mut source = VideoSource::open(path).expect("Failed to open test video");
    let frame_interval = source
        .metadata()
        .frame_interval()
        .expect("fixture has a frame rate");
    let result = ClipWriter::new(&mut source, ClipOptions::default().without_audio()).write(
        Duration::from_secs(90),
        Duration::from_secs(30),
        &output,
    );
    if encoder_unavailable(&result) {
        return;
    }
    result.expect("Failed to write clip");

    let clip = MediaProbe::probe(&output).expect("Failed to probe clip");
    let difference = (clip.duration.as_secs_f64() - 30.0).abs();
    assert!(
        difference <= frame_interval.as_secs_f64() + 1e-3,
        "clip lasts {:?}, expected 30s within {frame_interval:?}",
        clip.duration
    );
    assert_eq!(clip.video.as_ref().map(|video| video.codec.as_str()), Some("h264"));
    assert!(clip.audio.is_none());
}

#[test]
fn clip_keeps_audio_by_default() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("clip_audio.mp4");

    let mut extractor =
        FfmpegExtractor::open(path, ClipOptions::default()).expect("Failed to open test video");
    let result = extractor.extract_clip(Duration::from_secs(10), Duration::from_secs(5), &output);
    if encoder_unavailable(&result) {
        return;
    }
    result.expect("Failed to write clip");

    let clip = MediaProbe::probe(&output).expect("Failed to probe clip");
    assert!(clip.audio.is_some());
    assert!(clip.duration >= Duration::from_millis(4900));
    assert!(clip.duration <= Duration::from_millis(5200));
}

#[test]
fn clip_validation_errors() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("never.mp4");
    let mut source = VideoSource::open(path).expect("Failed to open test video");
    let duration = source.metadata().duration;

    let mut writer = ClipWriter::new(&mut source, ClipOptions::default());
    assert!(matches!(
        writer.write(Duration::from_secs(1), Duration::ZERO, &output),
        Err(ClipmarkError::InvalidDuration(_))
    ));
    assert!(matches!(
        writer.write(duration, Duration::from_secs(1), &output),
        Err(ClipmarkError::SeekOutOfRange { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn failed_clip_leaves_no_file() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("broken.mp4");
    let mut source = VideoSource::open(path).expect("Failed to open test video");

    let result = ClipWriter::new(&mut source, ClipOptions::default().preset("no-such-preset"))
        .write(Duration::from_secs(10), Duration::from_secs(2), &output);
    if result.is_ok() {
        eprintln!("Skipping: local H264 encoder ignores presets");
        return;
    }

    assert!(
        matches!(result, Err(ClipmarkError::EncodeError(_))),
        "expected EncodeError, got {result:?}"
    );
    assert!(!output.exists());
}

#[test]
fn pipeline_end_to_end() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let document = temporary_directory.path().join("post.md");
    fs::write(
        &document,
        "# Demo\n\n[SCREENSHOT timestamp=\"0:03\"]Opening[/SCREENSHOT]\n\n\
         [SCREENSHOT timestamp=\"1:30:00\"]Too late[/SCREENSHOT]\n",
    )
    .expect("Failed to write document");
    let output_dir = temporary_directory.path().join("site");

    let report = Pipeline::new(PipelineOptions::default())
        .run(&document, path, &output_dir)
        .expect("Pipeline run failed");

    assert_eq!(report.media_dir, output_dir.join("sample_video"));
    assert!(report.results[0].is_success());
    assert!(report.results[0].output_path.exists());
    assert!(matches!(
        report.results[1].error,
        Some(ClipmarkError::SeekOutOfRange { .. })
    ));

    let html = fs::read_to_string(output_dir.join("blog_post.html")).expect("HTML written");
    assert!(html.contains("sample_video/screenshot_001_at_0-00-03.jpg"));
    assert!(html.contains("media-error"));
}
