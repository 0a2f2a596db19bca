//! Pipeline tests against an in-memory extractor.
//!
//! These run without FFmpeg fixtures: the fake extractor writes a small
//! placeholder file for every request and records what it was asked for.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use clipmark::{
    CancellationToken, ClipmarkError, DuplicatePolicy, ImageFormat, MarkerKind, MediaExtractor,
    OutputLayout, Pipeline, PipelineOptions, PipelineStage, ProgressCallback, ProgressInfo,
};

#[derive(Debug, PartialEq)]
enum Request {
    Screenshot(Duration, PathBuf),
    Clip(Duration, Duration, PathBuf),
}

struct FakeExtractor {
    duration: Duration,
    requests: Vec<Request>,
    fail_at: Option<Duration>,
}

impl FakeExtractor {
    fn new(duration: Duration) -> Self {
        Self {
            duration,
            requests: Vec::new(),
            fail_at: None,
        }
    }
}

impl MediaExtractor for FakeExtractor {
    fn video_duration(&self) -> Duration {
        self.duration
    }

    fn extract_screenshot(
        &mut self,
        timestamp: Duration,
        output: &Path,
    ) -> Result<(), ClipmarkError> {
        self.requests
            .push(Request::Screenshot(timestamp, output.to_path_buf()));
        if self.fail_at == Some(timestamp) {
            return Err(ClipmarkError::DecodeError("corrupt frame".to_string()));
        }
        fs::write(output, b"jpeg")?;
        Ok(())
    }

    fn extract_clip(
        &mut self,
        timestamp: Duration,
        duration: Duration,
        output: &Path,
    ) -> Result<(), ClipmarkError> {
        self.requests
            .push(Request::Clip(timestamp, duration, output.to_path_buf()));
        fs::write(output, b"mp4")?;
        Ok(())
    }
}

fn layout(root: &Path) -> OutputLayout {
    OutputLayout::new(root, "talk", "blog_post.html")
}

const TEN_SECONDS: Duration = Duration::from_secs(10);

#[test]
fn writes_html_and_media() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let layout = layout(temporary_directory.path());
    let mut extractor = FakeExtractor::new(Duration::from_secs(300));
    let text = "Intro\n[SCREENSHOT timestamp=\"0:05\"]First[/SCREENSHOT]\n\
                [CLIP timestamp=\"1:30\" duration=\"30\"]Demo[/CLIP]\nOutro\n";

    let report = Pipeline::default()
        .run_with(text, &mut extractor, &layout)
        .unwrap();

    assert!(report.is_complete_success());
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.html_path, temporary_directory.path().join("blog_post.html"));
    assert_eq!(report.media_dir, temporary_directory.path().join("talk"));

    let screenshot = layout.media_dir.join("screenshot_001_at_0-00-05.jpg");
    let clip = layout.media_dir.join("clip_002_from_0-01-30_for_0-00-30.mp4");
    assert_eq!(
        extractor.requests,
        vec![
            Request::Screenshot(Duration::from_secs(5), screenshot.clone()),
            Request::Clip(Duration::from_secs(90), Duration::from_secs(30), clip.clone()),
        ]
    );
    assert!(screenshot.exists());
    assert!(clip.exists());

    let html = fs::read_to_string(&report.html_path).unwrap();
    assert!(html.contains("<img src=\"talk/screenshot_001_at_0-00-05.jpg\""));
    assert!(html.contains("<source src=\"talk/clip_002_from_0-01-30_for_0-00-30.mp4\""));
    assert!(html.contains("<article>\nIntro\n<figure"));
}

#[test]
fn out_of_range_marker_becomes_placeholder() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let layout = layout(temporary_directory.path());
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let text = "[SCREENSHOT timestamp=\"1:30:00\"]Late[/SCREENSHOT] [SCREENSHOT timestamp=\"2\"]";

    let report = Pipeline::default()
        .run_with(text, &mut extractor, &layout)
        .unwrap();

    assert!(matches!(
        report.results[0].error,
        Some(ClipmarkError::SeekOutOfRange { requested, duration })
            if requested == Duration::from_secs(5400) && duration == TEN_SECONDS
    ));
    assert!(report.results[1].is_success());
    assert!(!report.is_complete_success());
    assert_eq!(extractor.requests.len(), 1);

    let failures: Vec<String> = report.failed().map(|failure| failure.to_string()).collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("screenshot at 1:30:00 (offset 0): "));

    let html = fs::read_to_string(&report.html_path).unwrap();
    assert!(html.contains("media-error"));
    assert!(html.contains("<img src=\"talk/screenshot_002_at_0-00-02.jpg\""));
}

#[test]
fn clip_ending_past_video_is_rejected() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let text = "[CLIP timestamp=\"8\" duration=\"5\"] [CLIP timestamp=\"5\" duration=\"5\"]";

    let report = Pipeline::default()
        .run_with(text, &mut extractor, &layout(temporary_directory.path()))
        .unwrap();

    assert!(matches!(
        report.results[0].error,
        Some(ClipmarkError::SeekOutOfRange { requested, .. }) if requested == Duration::from_secs(13)
    ));
    // Ending exactly at the video end is fine.
    assert!(report.results[1].is_success());
}

#[test]
fn zero_length_clip_is_invalid() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);

    let report = Pipeline::default()
        .run_with(
            "[CLIP timestamp=\"1\" duration=\"0\"]",
            &mut extractor,
            &layout(temporary_directory.path()),
        )
        .unwrap();

    assert!(matches!(
        report.results[0].error,
        Some(ClipmarkError::InvalidDuration(duration)) if duration.is_zero()
    ));
    assert!(extractor.requests.is_empty());
}

#[test]
fn duplicate_screenshots_get_distinct_files() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let layout = layout(temporary_directory.path());
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let text = "[SCREENSHOT timestamp=\"5\"] and again [SCREENSHOT timestamp=\"5\"]";

    let report = Pipeline::default()
        .run_with(text, &mut extractor, &layout)
        .unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.succeeded().count(), 2);

    let first = &report.results[0].output_path;
    let second = &report.results[1].output_path;
    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());
}

#[test]
fn duplicate_error_policy_fails_second_marker() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let options = PipelineOptions::new().with_duplicate_policy(DuplicatePolicy::Error);

    let report = Pipeline::new(options)
        .run_with(
            "[SCREENSHOT timestamp=\"5\"] [SCREENSHOT timestamp=\"5\"]",
            &mut extractor,
            &layout(temporary_directory.path()),
        )
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(matches!(
        report.malformed[0],
        ClipmarkError::DuplicateTimestamp { .. }
    ));
    assert!(!report.is_complete_success());
}

#[test]
fn malformed_markers_are_reported() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);

    let report = Pipeline::default()
        .run_with(
            "ok [SCREENSHOT timestamp=\"1\"] bad [CLIP timestamp=\"2\"]",
            &mut extractor,
            &layout(temporary_directory.path()),
        )
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.malformed.len(), 1);
    let html = fs::read_to_string(&report.html_path).unwrap();
    assert!(html.contains("Invalid marker"));
}

#[test]
fn extractor_failure_does_not_stop_run() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    extractor.fail_at = Some(Duration::from_secs(1));

    let report = Pipeline::default()
        .run_with(
            "[SCREENSHOT timestamp=\"1\"] [SCREENSHOT timestamp=\"2\"]",
            &mut extractor,
            &layout(temporary_directory.path()),
        )
        .unwrap();

    assert!(matches!(
        report.results[0].error,
        Some(ClipmarkError::DecodeError(_))
    ));
    assert!(report.results[1].is_success());
    assert_eq!(extractor.requests.len(), 2);
}

#[test]
fn zero_markers_copy_text_into_shell() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let text = "Nothing to extract here.\n";

    let report = Pipeline::default()
        .run_with(text, &mut extractor, &layout(temporary_directory.path()))
        .unwrap();

    assert!(report.results.is_empty());
    assert!(report.is_complete_success());
    let html = fs::read_to_string(&report.html_path).unwrap();
    assert!(html.contains(&format!("<article>\n{text}\n</article>")));
}

#[test]
fn png_screenshots_and_custom_names() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let layout = OutputLayout::new(temporary_directory.path(), "media", "index.html");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let options = PipelineOptions::new().with_image_format(ImageFormat::Png);

    let report = Pipeline::new(options)
        .run_with("[SCREENSHOT timestamp=\"3.5\"]", &mut extractor, &layout)
        .unwrap();

    assert_eq!(
        report.results[0].output_path,
        temporary_directory
            .path()
            .join("media")
            .join("screenshot_001_at_0-00-03-500.png")
    );
    assert!(temporary_directory.path().join("index.html").exists());
}

#[test]
fn cancelled_before_start_skips_every_marker() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let token = CancellationToken::new();
    token.cancel();

    let report = Pipeline::new(PipelineOptions::new().with_cancellation(token))
        .run_with(
            "[SCREENSHOT timestamp=\"1\"] [CLIP timestamp=\"2\" duration=\"1\"]",
            &mut extractor,
            &layout(temporary_directory.path()),
        )
        .unwrap();

    assert!(report.cancelled);
    assert!(extractor.requests.is_empty());
    assert!(
        report
            .results
            .iter()
            .all(|result| matches!(result.error, Some(ClipmarkError::Cancelled)))
    );
    assert!(report.html_path.exists());
}

/// Cancels the run once the first marker has been processed.
struct CancelAfterFirst {
    token: CancellationToken,
}

impl ProgressCallback for CancelAfterFirst {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.current >= 1 {
            self.token.cancel();
        }
    }
}

#[test]
fn cancellation_between_markers() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let token = CancellationToken::new();
    let options = PipelineOptions::new()
        .with_cancellation(token.clone())
        .with_progress(Arc::new(CancelAfterFirst { token }));

    let report = Pipeline::new(options)
        .run_with(
            "[SCREENSHOT timestamp=\"1\"] [SCREENSHOT timestamp=\"2\"] [SCREENSHOT timestamp=\"3\"]",
            &mut extractor,
            &layout(temporary_directory.path()),
        )
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(extractor.requests.len(), 1);
    assert!(report.results[0].is_success());
    assert!(matches!(report.results[1].error, Some(ClipmarkError::Cancelled)));
    assert!(matches!(report.results[2].error, Some(ClipmarkError::Cancelled)));

    let html = fs::read_to_string(&report.html_path).unwrap();
    assert_eq!(html.matches("media-error").count(), 2);
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<(PipelineStage, u64, u64)>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.events
            .lock()
            .unwrap()
            .push((info.stage, info.current, info.total));
    }
}

#[test]
fn progress_fires_once_per_marker() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);
    let progress = Arc::new(RecordingProgress::default());
    let options = PipelineOptions::new().with_progress(progress.clone());

    Pipeline::new(options)
        .run_with(
            "[SCREENSHOT timestamp=\"1\"] [CLIP timestamp=\"2\" duration=\"1\"]",
            &mut extractor,
            &layout(temporary_directory.path()),
        )
        .unwrap();

    let events = progress.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            (PipelineStage::Scanning, 0, 2),
            (PipelineStage::Screenshot, 1, 2),
            (PipelineStage::Clip, 2, 2),
            (PipelineStage::Assembly, 2, 2),
        ]
    );
}

#[test]
fn missing_document_is_fatal() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let result = Pipeline::default().run(
        temporary_directory.path().join("missing.md"),
        temporary_directory.path().join("missing.mp4"),
        temporary_directory.path().join("out"),
    );

    match result {
        Err(ClipmarkError::FileAccess { path, .. }) => assert!(path.ends_with("missing.md")),
        other => panic!("expected FileAccess, got {other:?}"),
    }
    assert!(!temporary_directory.path().join("out").exists());
}

#[test]
fn missing_video_is_fatal() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let document = temporary_directory.path().join("post.md");
    fs::write(&document, "[SCREENSHOT timestamp=\"1\"]").unwrap();

    let result = Pipeline::default().run(
        &document,
        temporary_directory.path().join("missing.mp4"),
        temporary_directory.path().join("out"),
    );

    match result {
        Err(ClipmarkError::FileAccess { path, .. }) => assert!(path.ends_with("missing.mp4")),
        other => panic!("expected FileAccess, got {other:?}"),
    }
    assert!(!temporary_directory.path().join("out").exists());
}

#[test]
fn marker_kinds_in_results() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut extractor = FakeExtractor::new(TEN_SECONDS);

    let report = Pipeline::default()
        .run_with(
            "[CLIP timestamp=\"1\" duration=\"1\"] [SCREENSHOT timestamp=\"1\"]",
            &mut extractor,
            &layout(temporary_directory.path()),
        )
        .unwrap();

    let kinds: Vec<MarkerKind> = report.results.iter().map(|r| r.marker.kind).collect();
    assert_eq!(kinds, [MarkerKind::Clip, MarkerKind::Screenshot]);
    let ordinals: Vec<usize> = report.results.iter().map(|r| r.ordinal).collect();
    assert_eq!(ordinals, [1, 2]);
}
